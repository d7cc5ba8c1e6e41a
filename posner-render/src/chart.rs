use crate::text::render_text_pixmap;
use ab_glyph::FontVec;
use anyhow::{Context, Result, bail};
use posner_core::{ExperimentError, Reporter};
use std::path::{Path, PathBuf};
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform};
use tracing::info;

const MARGIN_LEFT: f32 = 90.0;
const MARGIN_RIGHT: f32 = 40.0;
const MARGIN_TOP: f32 = 50.0;
const MARGIN_BOTTOM: f32 = 80.0;
const TICKS: usize = 5;
const LABEL_PX: f32 = 18.0;

/// Bar colour at half opacity over white.
const BAR: [u8; 4] = [31, 119, 180, 128];

/// Draws one vertical bar per label on a white background with labelled axes.
/// Text is only drawn when a font is available.
pub fn render_bar_chart(
    labels: &[&str],
    values: &[f64],
    font: Option<&FontVec>,
    width: u32,
    height: u32,
) -> Result<Pixmap> {
    if labels.len() != values.len() {
        bail!("{} labels for {} values", labels.len(), values.len());
    }
    if values.is_empty() {
        bail!("nothing to plot");
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        bail!("cannot plot value {v}");
    }

    let mut pm = Pixmap::new(width, height)
        .with_context(|| format!("chart of {width}x{height} pixels"))?;
    pm.fill(Color::WHITE);

    let (w, h) = (width as f32, height as f32);
    let (x0, x1) = (MARGIN_LEFT, w - MARGIN_RIGHT);
    let (y_top, y_axis) = (MARGIN_TOP, h - MARGIN_BOTTOM);
    if x1 <= x0 || y_axis <= y_top {
        bail!("chart of {width}x{height} pixels leaves no room to plot");
    }

    let peak = values.iter().copied().fold(0.0f64, f64::max);
    let y_max = if peak > 0.0 { peak * 1.15 } else { 1.0 };
    let to_y = |v: f64| y_axis - (v / y_max) as f32 * (y_axis - y_top);

    let mut bar = Paint::default();
    bar.set_color_rgba8(BAR[0], BAR[1], BAR[2], BAR[3]);
    let slot = (x1 - x0) / values.len() as f32;
    for (i, &v) in values.iter().enumerate() {
        let cx = x0 + slot * (i as f32 + 0.5);
        let top = to_y(v);
        if let Some(rect) = Rect::from_ltrb(cx - slot * 0.25, top, cx + slot * 0.25, y_axis) {
            pm.fill_rect(rect, &bar, Transform::identity(), None);
        }
    }

    let mut ink = Paint::default();
    ink.set_color(Color::BLACK);
    let stroke = Stroke {
        width: 1.5,
        ..Default::default()
    };
    let mut axes = PathBuilder::new();
    axes.move_to(x0, y_top);
    axes.line_to(x0, y_axis);
    axes.line_to(x1, y_axis);
    for t in 0..=TICKS {
        let y = to_y(y_max * t as f64 / TICKS as f64);
        axes.move_to(x0 - 6.0, y);
        axes.line_to(x0, y);
    }
    let axes = axes.finish().context("axis path")?;
    pm.stroke_path(&axes, &ink, &stroke, Transform::identity(), None);

    if let Some(font) = font {
        let mut put = |text: &str, cx: f32, cy: f32| {
            if let Some(label) = render_text_pixmap(text, LABEL_PX, font, Color::BLACK) {
                let x = (cx - label.width() as f32 * 0.5) as i32;
                let y = (cy - label.height() as f32 * 0.5) as i32;
                pm.draw_pixmap(
                    x,
                    y,
                    label.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
        };
        for (i, label) in labels.iter().enumerate() {
            put(label, x0 + slot * (i as f32 + 0.5), y_axis + 20.0);
        }
        for t in 0..=TICKS {
            let v = y_max * t as f64 / TICKS as f64;
            put(&format!("{v:.0}"), x0 - 35.0, to_y(v));
        }
        put("Trial type", (x0 + x1) * 0.5, h - 25.0);
        put("RT (ms)", x0, y_top * 0.5);
    }

    Ok(pm)
}

/// Saves the condition means as a PNG bar chart.
pub struct ChartReporter {
    path: PathBuf,
    font: Option<FontVec>,
    size: (u32, u32),
}

impl ChartReporter {
    pub fn new(path: impl Into<PathBuf>, font: Option<FontVec>) -> Self {
        Self {
            path: path.into(),
            font,
            size: (640, 480),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for ChartReporter {
    fn report_means(&mut self, labels: &[&str], values: &[f64]) -> posner_core::Result<()> {
        let fail = |e: &dyn std::fmt::Display| {
            ExperimentError::Report(format!("{}: {e}", self.path.display()))
        };
        let (width, height) = self.size;
        let chart = render_bar_chart(labels, values, self.font.as_ref(), width, height)
            .map_err(|e| fail(&e))?;
        chart.save_png(&self.path).map_err(|e| fail(&e))?;
        info!(path = %self.path.display(), "saved means chart");
        Ok(())
    }
}
