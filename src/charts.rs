use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};
use tracing::{info, warn};

use crate::metrics::{self, CategoryMetrics, ResolutionTimes};
use crate::models::CleanIssue;

const CHART_SIZE: (u32, u32) = (1280, 720);

/// Day buckets for the resolution-time histogram; `None` is open-ended.
const DISTRIBUTION_BUCKETS: [(f64, Option<f64>); 7] = [
    (0.0, Some(1.0)),
    (1.0, Some(3.0)),
    (3.0, Some(7.0)),
    (7.0, Some(14.0)),
    (14.0, Some(30.0)),
    (30.0, Some(90.0)),
    (90.0, None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

struct BarChart {
    caption: String,
    y_desc: String,
    labels: Vec<String>,
    values: Vec<f64>,
    annotations: Vec<String>,
    color: RGBColor,
    y_max: Option<f64>,
}

/// Renders every chart the report needs into `out_dir`, once per requested
/// format, and returns the written paths. Charts that need the resolved
/// subset are skipped with a warning when it is empty.
pub fn render_all(
    issues: &[CleanIssue],
    out_dir: &Path,
    formats: &[ChartFormat],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let metrics = metrics::calculate_metrics(issues);
    let categories = metrics::metrics_by_category(issues);
    let days = metrics::resolved_days(issues);

    let mut written = Vec::new();
    for &format in formats {
        match &metrics.times {
            Some(times) => {
                written.push(render_sla_chart(times, out_dir, format, "sla_chart")?);
                written.push(render_resolution_distribution(&days, out_dir, format)?);
            }
            None => warn!("no resolved issues; skipping SLA and distribution charts"),
        }
        if categories.is_empty() {
            warn!("no issues loaded; skipping category chart");
        } else {
            written.push(render_category_chart(&categories, out_dir, format)?);
        }
    }

    for path in &written {
        info!(path = %path.display(), "chart written");
    }
    Ok(written)
}

/// SLA compliance bars at the five deadlines. `stem` lets the per-category
/// flow write `sla_chart_bug` and so on next to the main chart.
pub fn render_sla_chart(
    times: &ResolutionTimes,
    out_dir: &Path,
    format: ChartFormat,
    stem: &str,
) -> Result<PathBuf> {
    let labels = times
        .sla
        .iter()
        .map(|b| {
            if b.threshold_days == 1 {
                "1 day".to_string()
            } else {
                format!("{} days", b.threshold_days)
            }
        })
        .collect();
    let values = times.sla.iter().map(|b| b.met_pct).collect();
    let annotations = times
        .sla
        .iter()
        .map(|b| format!("{:.1}% ({})", b.met_pct, b.met_count))
        .collect();

    let spec = BarChart {
        caption: "SLA compliance by resolution deadline".to_string(),
        y_desc: "% of resolved issues".to_string(),
        labels,
        values,
        annotations,
        color: RGBColor(46, 139, 87),
        y_max: Some(110.0),
    };

    let path = out_dir.join(format!("{stem}.{}", format.extension()));
    draw_to(&path, format, &spec)?;
    Ok(path)
}

/// Issue counts per category, annotated with each category's resolution rate.
pub fn render_category_chart(
    categories: &[CategoryMetrics],
    out_dir: &Path,
    format: ChartFormat,
) -> Result<PathBuf> {
    let spec = BarChart {
        caption: "Issues per category".to_string(),
        y_desc: "Issues".to_string(),
        labels: categories.iter().map(|c| c.category.clone()).collect(),
        values: categories.iter().map(|c| c.total as f64).collect(),
        annotations: categories
            .iter()
            .map(|c| format!("{:.1}% resolved", c.resolution_rate))
            .collect(),
        color: RGBColor(70, 130, 180),
        y_max: None,
    };

    let path = out_dir.join(format!("category_distribution.{}", format.extension()));
    draw_to(&path, format, &spec)?;
    Ok(path)
}

/// Histogram of elapsed days over fixed buckets.
pub fn render_resolution_distribution(
    days: &[f64],
    out_dir: &Path,
    format: ChartFormat,
) -> Result<PathBuf> {
    let buckets = distribution_buckets(days);
    let spec = BarChart {
        caption: "Resolution time distribution".to_string(),
        y_desc: "Resolved issues".to_string(),
        labels: buckets.iter().map(|(label, _)| label.clone()).collect(),
        values: buckets.iter().map(|&(_, count)| count as f64).collect(),
        annotations: buckets.iter().map(|&(_, count)| count.to_string()).collect(),
        color: RGBColor(205, 92, 92),
        y_max: None,
    };

    let path = out_dir.join(format!("resolution_distribution.{}", format.extension()));
    draw_to(&path, format, &spec)?;
    Ok(path)
}

fn distribution_buckets(days: &[f64]) -> Vec<(String, usize)> {
    DISTRIBUTION_BUCKETS
        .iter()
        .map(|&(lo, hi)| {
            let label = match hi {
                Some(hi) => format!("{:.0}-{:.0}", lo, hi),
                None => format!("{:.0}+", lo),
            };
            let count = days
                .iter()
                .filter(|&&d| match hi {
                    // Edges belong to the lower bucket; the first bucket is
                    // closed on both sides since elapsed days are >= 0 here.
                    Some(hi) => (if lo == 0.0 { d >= lo } else { d > lo }) && d <= hi,
                    None => d > lo,
                })
                .count();
            (label, count)
        })
        .collect()
}

fn draw_to(path: &Path, format: ChartFormat, spec: &BarChart) -> Result<()> {
    match format {
        ChartFormat::Png => {
            let backend = FontSafeBackend::new(BitMapBackend::new(path, CHART_SIZE));
            draw_bars(backend.into_drawing_area(), spec)
        }
        ChartFormat::Svg => {
            let backend = FontSafeBackend::new(SVGBackend::new(path, CHART_SIZE));
            draw_bars(backend.into_drawing_area(), spec)
        }
    }
}

fn draw_bars<DB>(root: DrawingArea<DB, Shift>, spec: &BarChart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let peak = spec.values.iter().copied().fold(0.0f64, f64::max);
    let y_max = spec.y_max.unwrap_or_else(|| (peak * 1.15).max(1.0));

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..spec.labels.len()).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(spec.labels.len() + 1)
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(i) => spec.labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc(spec.y_desc.as_str())
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(spec.color.mix(0.85).filled())
            .margin(12)
            .data(spec.values.iter().enumerate().map(|(i, &v)| (i, v))),
    )?;

    chart.draw_series(spec.annotations.iter().enumerate().map(|(i, text)| {
        Text::new(
            text.clone(),
            (SegmentValue::CenterOf(i), spec.values[i] + y_max * 0.02),
            ("sans-serif", 14).into_font(),
        )
    }))?;

    root.present()?;
    Ok(())
}

/// Wraps a drawing backend so that missing system fonts degrade charts
/// instead of failing the run: text that cannot be rendered is skipped and
/// text measurement falls back to a rough estimate.
struct FontSafeBackend<DB> {
    inner: DB,
}

impl<DB> FontSafeBackend<DB> {
    fn new(inner: DB) -> Self {
        Self { inner }
    }
}

impl<DB: DrawingBackend> DrawingBackend for FontSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.draw_text(text, style, pos)
        })) {
            Ok(Ok(())) => Ok(()),
            // A label we cannot draw is not worth failing the chart for.
            Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => Ok(()),
            Ok(Err(other)) => Err(other),
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.estimate_text_size(text, style)
        })) {
            Ok(Ok(size)) => Ok(size),
            Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => {
                let width = (text.chars().count() as f64 * style.size() * 0.6) as u32;
                Ok((width, style.size() as u32))
            }
            Ok(Err(other)) => Err(other),
        }
    }
}
