use crate::text::render_text_pixmap;
use ab_glyph::FontVec;
use anyhow::{Context, Result, bail};
use bytemuck::{cast_slice, cast_slice_mut};
use posner_core::{Drawable, Layout, Side, Tone};
use posner_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{Color, LineCap, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::trace;

const FIXATION_ARM: f32 = 10.0;
const FIXATION_WIDTH: f32 = 3.0;
const BOX_WIDTH: f32 = 3.0;
const HIGHLIGHT_WIDTH: f32 = 9.0;
const TARGET_WIDTH: f32 = 4.0;
const MESSAGE_PX: f32 = 28.0;

#[repr(usize)]
#[derive(Debug, Clone, Copy)]
enum CacheIndex {
    FixationCross = 0,
    Box = 1,
    HighlightedBox = 2,
    Target = 3,
}

impl CacheIndex {
    const COUNT: usize = 4;
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Color,
    /// Fixation mark, boxes and target.
    pub foreground: Color,
    pub text: Color,
    pub positive: Color,
    pub negative: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::from_rgba8(0, 0, 0, 255),
            foreground: Color::from_rgba8(128, 128, 128, 255),
            text: Color::from_rgba8(255, 255, 255, 255),
            positive: Color::from_rgba8(0, 200, 0, 255),
            negative: Color::from_rgba8(220, 40, 40, 255),
        }
    }
}

impl Palette {
    pub fn tone(&self, tone: Tone) -> Color {
        match tone {
            Tone::Neutral => self.text,
            Tone::Positive => self.positive,
            Tone::Negative => self.negative,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub drawn: usize,
}

/// Rasterized messages keyed by text and tone. `None` records text that has
/// nothing visible (or no font to draw it with) so it is not retried.
struct TextCache {
    font: Option<FontVec>,
    map: HashMap<(String, Tone), Option<Pixmap>>,
}

impl TextCache {
    fn get_or_render(&mut self, text: &str, tone: Tone, palette: &Palette) -> Option<&Pixmap> {
        let key = (text.to_string(), tone);
        if !self.map.contains_key(&key) {
            let pm = self
                .font
                .as_ref()
                .and_then(|font| render_text_pixmap(text, MESSAGE_PX, font, palette.tone(tone)));
            if pm.is_none() {
                trace!(text, "message not drawable");
            }
            self.map.insert(key.clone(), pm);
        }
        self.map.get(&key).and_then(Option::as_ref)
    }
}

/// Software renderer that turns a list of drawables into an RGBA8 frame.
/// Shapes are rasterized once at construction and blitted every frame.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    layout: Layout,
    palette: Palette,

    static_cache: Vec<Pixmap>,
    text_cache: TextCache,

    canvas: Pixmap,
    clear_buffer: Vec<u8>,

    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, layout: Layout, font: Option<FontVec>) -> Result<Self> {
        Self::with_palette(width, height, layout, font, Palette::default())
    }

    pub fn with_palette(
        width: u32,
        height: u32,
        layout: Layout,
        font: Option<FontVec>,
        palette: Palette,
    ) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .with_context(|| format!("canvas of {width}x{height} pixels"))?;
        let mut renderer = SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            static_cache: Vec::with_capacity(CacheIndex::COUNT),
            text_cache: TextCache {
                font,
                map: HashMap::new(),
            },
            clear_buffer: solid_buffer(width, height, palette.background),
            canvas,
            layout,
            palette,
            component_timers: ["clear", "draw", "copy"]
                .iter()
                .map(|&k| (k, HighPrecisionTimer::new()))
                .collect(),
        };
        renderer.init_cache()?;
        Ok(renderer)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.canvas = Pixmap::new(new_width, new_height)
            .with_context(|| format!("canvas of {new_width}x{new_height} pixels"))?;
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.clear_buffer = solid_buffer(new_width, new_height, self.palette.background);
        Ok(())
    }

    fn init_cache(&mut self) -> Result<()> {
        let fg = self.palette.foreground;
        let size = self.layout.box_size;
        self.static_cache = vec![
            fixation_pixmap(fg).context("fixation mark")?,
            box_pixmap(size, BOX_WIDTH, fg).context("placeholder box")?,
            box_pixmap(size, HIGHLIGHT_WIDTH, fg).context("highlighted box")?,
            target_pixmap(size * 0.15, fg).context("target marker")?,
        ];
        debug_assert_eq!(self.static_cache.len(), CacheIndex::COUNT);
        Ok(())
    }

    /// Screen position of a layout offset; offsets grow rightwards and upwards.
    fn position(&self, side: Side) -> (f32, f32) {
        let (dx, dy) = self.layout.box_offset(side);
        (self.center.0 + dx, self.center.1 - dy)
    }

    fn draw(&mut self, item: &Drawable) {
        let (index, pos) = match item {
            Drawable::FixationMark => (CacheIndex::FixationCross, self.center),
            Drawable::Box {
                side,
                highlighted: false,
            } => (CacheIndex::Box, self.position(*side)),
            Drawable::Box {
                side,
                highlighted: true,
            } => (CacheIndex::HighlightedBox, self.position(*side)),
            Drawable::TargetMarker(side) => (CacheIndex::Target, self.position(*side)),
            Drawable::TextMessage { text, tone } => {
                let center = self.center;
                if let Some(pm) = self.text_cache.get_or_render(text, *tone, &self.palette) {
                    blit(&mut self.canvas, pm, center);
                }
                return;
            }
        };
        blit(&mut self.canvas, &self.static_cache[index as usize], pos);
    }

    /// Draws `frame` on a cleared canvas and copies it into `frame_buffer`,
    /// which must hold exactly `width * height` RGBA8 pixels.
    pub fn render_frame<T: Timer>(
        &mut self,
        frame: &[Drawable],
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        if frame_buffer.len() != self.clear_buffer.len() {
            bail!(
                "frame buffer holds {} bytes, canvas needs {}",
                frame_buffer.len(),
                self.clear_buffer.len()
            );
        }

        let t_clear = {
            let t = timer.now();
            self.canvas.data_mut().copy_from_slice(&self.clear_buffer);
            timer.elapsed(t)
        };

        let t_draw = {
            let t = timer.now();
            for item in frame {
                self.draw(item);
            }
            timer.elapsed(t)
        };

        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_clear + t_draw + t_copy;
        for (name, d) in [("clear", t_clear), ("draw", t_draw), ("copy", t_copy)] {
            if let Some(component) = self.component_timers.get_mut(name) {
                component.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            drawn: frame.len(),
        })
    }

    /// Per-stage timing over the recent frames.
    pub fn component_stats(&self) -> Vec<(&'static str, CalibrationStats)> {
        let mut stats: Vec<_> = self
            .component_timers
            .iter()
            .map(|(name, t)| (*name, t.calibration_stats()))
            .collect();
        stats.sort_by_key(|(name, _)| *name);
        stats
    }
}

fn solid_buffer(width: u32, height: u32, color: Color) -> Vec<u8> {
    let c = color.premultiply().to_color_u8();
    [c.red(), c.green(), c.blue(), c.alpha()]
        .into_iter()
        .cycle()
        .take((width * height * 4) as usize)
        .collect()
}

fn solid_paint(color: Color, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.anti_alias = anti_alias;
    paint.set_color(color);
    paint
}

fn fixation_pixmap(color: Color) -> Option<Pixmap> {
    let size = (FIXATION_ARM * 2.0 + 1.0) as u32;
    let mut pm = Pixmap::new(size, size)?;
    let paint = solid_paint(color, false);
    let extent = size as f32;
    let offset = (extent - FIXATION_WIDTH) * 0.5;
    let h = Rect::from_xywh(0.0, offset, extent, FIXATION_WIDTH)?;
    pm.fill_rect(h, &paint, Transform::identity(), None);
    let v = Rect::from_xywh(offset, 0.0, FIXATION_WIDTH, extent)?;
    pm.fill_rect(v, &paint, Transform::identity(), None);
    Some(pm)
}

/// Square outline of side `size`, padded so the widest stroke fits.
fn box_pixmap(size: f32, line_width: f32, color: Color) -> Option<Pixmap> {
    let extent = (size + HIGHLIGHT_WIDTH + 2.0).ceil();
    let mut pm = Pixmap::new(extent as u32, extent as u32)?;
    let inset = (extent - size) * 0.5;
    let path = PathBuilder::from_rect(Rect::from_xywh(inset, inset, size, size)?);
    let stroke = Stroke {
        width: line_width,
        ..Default::default()
    };
    pm.stroke_path(
        &path,
        &solid_paint(color, false),
        &stroke,
        Transform::identity(),
        None,
    );
    Some(pm)
}

/// Six-armed asterisk with arms of length `arm`.
fn target_pixmap(arm: f32, color: Color) -> Option<Pixmap> {
    let extent = (arm * 2.0 + TARGET_WIDTH * 2.0).ceil();
    let mut pm = Pixmap::new(extent as u32, extent as u32)?;
    let c = extent * 0.5;
    let mut pb = PathBuilder::new();
    for degrees in [90.0f32, 30.0, 150.0] {
        let (sin, cos) = degrees.to_radians().sin_cos();
        pb.move_to(c - arm * cos, c - arm * sin);
        pb.line_to(c + arm * cos, c + arm * sin);
    }
    let stroke = Stroke {
        width: TARGET_WIDTH,
        line_cap: LineCap::Round,
        ..Default::default()
    };
    pm.stroke_path(
        &pb.finish()?,
        &solid_paint(color, true),
        &stroke,
        Transform::identity(),
        None,
    );
    Some(pm)
}

/// Premultiplied source-over of `src` centred on `pos`, clipped to `canvas`.
fn blit(canvas: &mut Pixmap, src: &Pixmap, pos: (f32, f32)) {
    let (w, h) = (src.width() as i32, src.height() as i32);
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);

    let x = (pos.0 - w as f32 * 0.5).floor() as i32;
    let y = (pos.1 - h as f32 * 0.5).floor() as i32;

    let dst_x = x.max(0);
    let dst_y = y.max(0);
    let copy_w = (x + w).min(cw) - dst_x;
    let copy_h = (y + h).min(ch) - dst_y;
    if copy_w <= 0 || copy_h <= 0 {
        return;
    }
    let (src_x, src_y) = ((dst_x - x) as usize, (dst_y - y) as usize);
    let (dst_x, dst_y) = (dst_x as usize, dst_y as usize);
    let (copy_w, copy_h) = (copy_w as usize, copy_h as usize);
    let (src_stride, dst_stride) = (w as usize, cw as usize);

    let src_u32: &[u32] = cast_slice(src.data());
    let dst_u32: &mut [u32] = cast_slice_mut(canvas.data_mut());

    for row in 0..copy_h {
        let s_start = (src_y + row) * src_stride + src_x;
        let d_start = (dst_y + row) * dst_stride + dst_x;
        let s_row = &src_u32[s_start..s_start + copy_w];
        let d_row = &mut dst_u32[d_start..d_start + copy_w];

        for (d, &s) in d_row.iter_mut().zip(s_row) {
            // Native byte order keeps the in-memory RGBA layout.
            let [sr, sg, sb, sa] = s.to_ne_bytes().map(u32::from);
            match sa {
                0 => continue,
                255 => *d = s,
                _ => {
                    let [dr, dg, db, da] = d.to_ne_bytes().map(u32::from);
                    let inv = 255 - sa;
                    let over = |s: u32, d: u32| (s + (d * inv + 127) / 255).min(255) as u8;
                    *d = u32::from_ne_bytes([over(sr, dr), over(sg, dg), over(sb, db), over(sa, da)]);
                }
            }
        }
    }
}
