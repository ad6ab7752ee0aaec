//! Service-level metrics and summary charts for ticket tracker exports.
//!
//! A report run is a single synchronous pass: load and clean the two input
//! tables, aggregate, print the textual report, render charts to disk.

pub mod charts;
pub mod commands;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod report;
