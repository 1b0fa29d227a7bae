use crate::sprite::pixmap;
use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use colorpref_cache::{PromptId, intern_prompt};
use colorpref_core::Color;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::{Pixmap, PremultipliedColorU8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextKey {
    prompt: PromptId,
    height_px: u32,
    wrap_px: u32,
    color: Color,
}

/// Rasterized prompts keyed by interned text, size and color.
pub struct TextCache {
    font: FontVec,
    map: HashMap<TextKey, Arc<Pixmap>>,
}

impl TextCache {
    pub fn new(font: FontVec) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {e}", path.display()))?;
        Ok(Self::new(font))
    }

    pub fn get_or_render(
        &mut self,
        text: &str,
        height_px: f32,
        wrap_px: f32,
        color: Color,
    ) -> Result<Arc<Pixmap>> {
        let key = TextKey {
            prompt: intern_prompt(text),
            height_px: height_px.round().max(1.0) as u32,
            wrap_px: wrap_px.round().max(1.0) as u32,
            color,
        };
        if let Some(pm) = self.map.get(&key) {
            return Ok(Arc::clone(pm));
        }
        let pm = Arc::new(render_text_pixmap(
            text,
            key.height_px as f32,
            key.wrap_px as f32,
            &self.font,
            color,
        )?);
        self.map.insert(key, Arc::clone(&pm));
        Ok(pm)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Greedy word wrap. Explicit newlines always break.
pub fn wrap_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}

fn line_width(font: &impl Font, scale: PxScale, line: &str) -> f32 {
    let sf = font.as_scaled(scale);
    let mut width = 0.0;
    let mut prev = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = prev {
            width += sf.kern(prev, id);
        }
        width += sf.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Renders centered, wrapped lines onto a transparent pixmap.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    wrap_px: f32,
    font: &impl Font,
    color: Color,
) -> Result<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);
    let lines = wrap_lines(text, wrap_px, |l| line_width(font, scale, l));
    let widths: Vec<f32> = lines.iter().map(|l| line_width(font, scale, l)).collect();
    let line_height = sf.height() + sf.line_gap();

    let w = widths.iter().copied().fold(1.0f32, f32::max).ceil() as u32;
    let h = (line_height * lines.len() as f32).ceil().max(1.0) as u32;

    let mut glyphs = Vec::<Glyph>::new();
    for (row, (line, width)) in lines.iter().zip(&widths).enumerate() {
        let mut pen_x = (w as f32 - width) / 2.0;
        let baseline = sf.ascent() + row as f32 * line_height;
        let mut prev = None;
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                pen_x += sf.kern(prev, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            });
            pen_x += sf.h_advance(id);
            prev = Some(id);
        }
    }

    let mut pm = pixmap(w, h)?;
    let stride = pm.width() as usize;
    let (pw, ph) = (pm.width() as i32, pm.height() as i32);
    let dst = pm.pixels_mut();

    for g in glyphs {
        let Some(out) = font.outline_glyph(g) else {
            continue;
        };
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x).floor() as i32;
            let iy = (y as f32 + b.min.y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= pw || iy >= ph {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // source premultiplied by coverage, then Porter-Duff over
            let a = cov.clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            let inv = 1.0 - a;
            let bg = dst[i];
            let blend =
                |s: u8, d: u8| ((s as f32 * a) as u8).saturating_add((d as f32 * inv) as u8);
            let r = blend(color.r, bg.red());
            let gr = blend(color.g, bg.green());
            let bl = blend(color.b, bg.blue());
            let al = sa.saturating_add((bg.alpha() as f32 * inv) as u8);
            let px = PremultipliedColorU8::from_rgba(r.min(al), gr.min(al), bl.min(al), al);
            if let Some(px) = px {
                dst[i] = px;
            }
        });
    }

    Ok(pm)
}
