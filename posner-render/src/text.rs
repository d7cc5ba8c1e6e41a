use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};
use tracing::{info, warn};

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads `explicit` if given, else the first usable well-known system font.
/// Running without any font is allowed; text items are then skipped.
pub fn load_font(explicit: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = explicit {
        return read_font(path).map(Some);
    }
    for candidate in SYSTEM_FONTS.iter().map(Path::new) {
        if !candidate.exists() {
            continue;
        }
        match read_font(candidate) {
            Ok(font) => {
                info!(path = %candidate.display(), "font loaded");
                return Ok(Some(font));
            }
            Err(e) => warn!(path = %candidate.display(), error = %e, "unusable font"),
        }
    }
    warn!("no font found; text messages will not be drawn");
    Ok(None)
}

fn read_font(path: &Path) -> Result<FontVec> {
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontVec::try_from_vec(bytes).map_err(|e| anyhow!("parsing font {}: {e}", path.display()))
}

/// Rasterizes `text` into a tight, transparent, premultiplied pixmap. Lines
/// split on `\n` and are centred on each other. `None` if nothing is visible.
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);
    let line_height = sf.height() + sf.line_gap();

    // 1) Layout each line with its baseline at ascent, then centre the lines
    let mut lines: Vec<(Vec<Glyph>, f32)> = Vec::new();
    for (row, line) in text.lines().enumerate() {
        let baseline = sf.ascent() + row as f32 * line_height;
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::<Glyph>::new();
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = glyphs.last() {
                pen_x += sf.kern(prev.id, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            });
            pen_x += sf.h_advance(id);
        }
        lines.push((glyphs, pen_x));
    }
    let widest = lines.iter().map(|(_, w)| *w).fold(0.0f32, f32::max);
    let glyphs: Vec<Glyph> = lines
        .into_iter()
        .flat_map(|(glyphs, width)| {
            let shift = (widest - width) * 0.5;
            glyphs.into_iter().map(move |mut g| {
                g.position.x += shift;
                g
            })
        })
        .collect();

    // 2) Union pixel bounds from outlined glyphs
    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;

    // 3) Transparent pixmap; a fresh one is already zeroed
    let mut pm = Pixmap::new(w, h)?;
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();

    let cu = [
        (color.red() * 255.0) as u8,
        (color.green() * 255.0) as u8,
        (color.blue() * 255.0) as u8,
        (color.alpha() * 255.0) as u8,
    ];

    // 4) Rasterize with premultiplied alpha blending
    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a_lin = (cov * cu[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let bg = dst[i];

            // Porter-Duff over: out = src + bg * (1 - src.a)
            let inv = 1.0 - (sa as f32 / 255.0);
            let over = |s: u8, d: u8| ((s as f32 * a_lin) as u8).saturating_add((d as f32 * inv) as u8);
            let r = over(cu[0], bg.red());
            let g = over(cu[1], bg.green());
            let bl = over(cu[2], bg.blue());
            let a = sa.saturating_add((bg.alpha() as f32 * inv) as u8);

            if let Some(px) = PremultipliedColorU8::from_rgba(r.min(a), g.min(a), bl.min(a), a) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}
