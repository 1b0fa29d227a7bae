use crate::mondrian::MaskBank;
use crate::sprite::{self, paint};
use crate::text::TextCache;
use anyhow::{Result, anyhow};
use colorpref_core::{Color, DrawItem, Frame, Shape};
use colorpref_timing::{FrameStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::time::Duration;
use tiny_skia::{
    FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, StrokeDash,
    Transform,
};
use tracing::{debug, warn};

const LINE_WIDTH_PX: f32 = 2.0;
const LATTICE_DASHES: f32 = 12.0;

pub struct RenderStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub items: usize,
}

/// Draws one descriptor at a time onto an offscreen canvas.
pub trait Renderer {
    fn clear(&mut self, background: Color);
    fn draw_item(&mut self, item: &DrawItem) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SpriteKey {
    CrossDisc { w: u32, h: u32, color: Color },
    Gabor {
        w: u32,
        h: u32,
        milli_deg: i32,
        milli_cycles: i32,
    },
    Patch { w: u32, h: u32, color: Color },
}

impl SpriteKey {
    fn rasterize(self) -> Result<Pixmap> {
        match self {
            SpriteKey::CrossDisc { w, h, color } => sprite::cross_disc(w, h, color),
            SpriteKey::Gabor {
                w,
                h,
                milli_deg,
                milli_cycles,
            } => {
                let tilt = milli_deg as f32 / 1000.0;
                sprite::gabor(w, h, tilt, milli_cycles as f32 / 1000.0)
            }
            SpriteKey::Patch { w, h, color } => sprite::patch(w, h, color),
        }
    }
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    canvas: Pixmap,
    masks: MaskBank,
    text: Option<TextCache>,
    sprites: HashMap<SpriteKey, Pixmap>,
    text_warned: bool,
    component_timers: HashMap<&'static str, HighPrecisionTimer>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, masks: MaskBank, text: Option<TextCache>) -> Result<Self> {
        Ok(Self {
            width,
            height,
            canvas: sprite::pixmap(width, height)?,
            masks,
            text,
            sprites: HashMap::new(),
            text_warned: false,
            component_timers: ["clear", "draw", "copy"]
                .into_iter()
                .map(|k| (k, HighPrecisionTimer::new()))
                .collect(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.canvas = sprite::pixmap(width, height)?;
        self.sprites.clear();
        debug!(width, height, "renderer resized");
        Ok(())
    }

    /// Statistics for one stage of the pipeline: `clear`, `draw` or `copy`.
    pub fn component_stats(&self, stage: &str) -> Option<FrameStats> {
        self.component_timers.get(stage).map(|t| t.frame_stats())
    }

    /// Normalized window position, y up, to canvas pixels.
    fn to_px(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            (x + 1.0) * 0.5 * self.width as f32,
            (1.0 - y) * 0.5 * self.height as f32,
        )
    }

    fn size_px(&self, (w, h): (f32, f32)) -> (f32, f32) {
        (w * 0.5 * self.width as f32, h * 0.5 * self.height as f32)
    }

    fn rect_px(&self, item: &DrawItem, size: (f32, f32)) -> Option<Rect> {
        let (cx, cy) = self.to_px(item.pos);
        let (w, h) = self.size_px(size);
        Rect::from_xywh(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    fn sprite_dims(&self, size: (f32, f32)) -> (u32, u32) {
        let (w, h) = self.size_px(size);
        (w.round().max(1.0) as u32, h.round().max(1.0) as u32)
    }

    fn blit(canvas: &mut Pixmap, pm: &Pixmap, center: (f32, f32), opacity: f32) {
        let x = (center.0 - pm.width() as f32 / 2.0).round() as i32;
        let y = (center.1 - pm.height() as f32 / 2.0).round() as i32;
        let paint = PixmapPaint {
            opacity,
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        canvas.draw_pixmap(x, y, pm.as_ref(), &paint, Transform::identity(), None);
    }

    fn draw_sprite(&mut self, key: SpriteKey, item: &DrawItem) -> Result<()> {
        let center = self.to_px(item.pos);
        if !self.sprites.contains_key(&key) {
            self.sprites.insert(key, key.rasterize()?);
        }
        if let Some(pm) = self.sprites.get(&key) {
            Self::blit(&mut self.canvas, pm, center, item.opacity);
        }
        Ok(())
    }

    fn fill(&mut self, rect: Rect, color: Color, opacity: f32) {
        self.canvas
            .fill_rect(rect, &paint(color, opacity), Transform::identity(), None);
    }

    fn stroke(&mut self, path: &tiny_skia::Path, paint: &Paint, stroke: &Stroke) {
        self.canvas
            .stroke_path(path, paint, stroke, Transform::identity(), None);
    }

    /// Half-period bars across the grating, starting `offset_quarters` quarter
    /// periods in, clipped to the grating rectangle.
    fn draw_bars(
        &mut self,
        rect: Rect,
        color: Color,
        periods: u8,
        offset_quarters: u8,
        opacity: f32,
    ) {
        let period = rect.width() / periods.max(1) as f32;
        let shift = offset_quarters as f32 * period / 4.0;
        for k in -1..=periods as i32 {
            let start = (rect.left() + k as f32 * period + shift).max(rect.left());
            let end = (rect.left() + k as f32 * period + shift + period / 2.0).min(rect.right());
            if let Some(bar) = Rect::from_ltrb(start, rect.top(), end, rect.bottom()) {
                self.fill(bar, color, opacity);
            }
        }
    }

    fn draw_text(
        &mut self,
        item: &DrawItem,
        content: &str,
        height: f32,
        wrap: f32,
        color: Color,
    ) -> Result<()> {
        let center = self.to_px(item.pos);
        let height_px = height * 0.5 * self.height as f32;
        let wrap_px = wrap * 0.5 * self.width as f32;
        let Some(cache) = self.text.as_mut() else {
            if !self.text_warned {
                warn!("no font loaded, text prompts are not drawn");
                self.text_warned = true;
            }
            return Ok(());
        };
        let pm = cache.get_or_render(content, height_px, wrap_px, color)?;
        Self::blit(&mut self.canvas, &pm, center, item.opacity);
        Ok(())
    }

    /// Draws `frame` from scratch and copies it into `frame_buffer` (RGBA8,
    /// row-major, same size as the canvas).
    pub fn render_frame<T: Timer>(
        &mut self,
        frame: &Frame,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<RenderStats> {
        let expected = self.canvas.data().len();
        if frame_buffer.len() != expected {
            return Err(anyhow!(
                "frame buffer holds {} bytes, canvas needs {expected}",
                frame_buffer.len()
            ));
        }

        let t = timer.now();
        self.clear(frame.background);
        let clear = timer.elapsed(t);

        let t = timer.now();
        for item in &frame.items {
            self.draw_item(item)?;
        }
        let draw = timer.elapsed(t);

        let t = timer.now();
        frame_buffer.copy_from_slice(self.canvas.data());
        let copy = timer.elapsed(t);

        let total = clear + draw + copy;
        for (stage, d) in [("clear", clear), ("draw", draw), ("copy", copy)] {
            if let Some(t) = self.component_timers.get_mut(stage) {
                t.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(RenderStats {
            clear,
            draw,
            copy,
            total,
            items: frame.items.len(),
        })
    }
}

impl Renderer for SkiaRenderer {
    fn clear(&mut self, background: Color) {
        self.canvas.fill(tiny_skia::Color::from_rgba8(
            background.r,
            background.g,
            background.b,
            255,
        ));
    }

    fn draw_item(&mut self, item: &DrawItem) -> Result<()> {
        let opacity = item.opacity;
        match &item.shape {
            Shape::Rect {
                size,
                fill,
                outline,
            } => {
                let Some(rect) = self.rect_px(item, *size) else {
                    return Ok(());
                };
                self.fill(rect, *fill, opacity);
                if let Some(outline) = outline {
                    let path = PathBuilder::from_rect(rect);
                    let stroke = Stroke {
                        width: LINE_WIDTH_PX,
                        ..Stroke::default()
                    };
                    self.stroke(&path, &paint(*outline, opacity), &stroke);
                }
            }
            Shape::Disc { size, fill } => {
                if let Some(oval) = self.rect_px(item, *size).and_then(PathBuilder::from_oval) {
                    self.canvas.fill_path(
                        &oval,
                        &paint(*fill, opacity),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            Shape::CrossDisc { size, color } => {
                let (w, h) = self.sprite_dims(*size);
                self.draw_sprite(SpriteKey::CrossDisc { w, h, color: *color }, item)?;
            }
            Shape::Patch { size, color } => {
                let (w, h) = self.sprite_dims(*size);
                self.draw_sprite(SpriteKey::Patch { w, h, color: *color }, item)?;
            }
            Shape::Gabor {
                size,
                tilt_deg,
                cycles,
            } => {
                let (w, h) = self.sprite_dims(*size);
                let key = SpriteKey::Gabor {
                    w,
                    h,
                    milli_deg: (tilt_deg * 1000.0).round() as i32,
                    milli_cycles: (cycles * 1000.0).round() as i32,
                };
                self.draw_sprite(key, item)?;
            }
            Shape::Lattice { size, color } => {
                let Some(rect) = self.rect_px(item, *size) else {
                    return Ok(());
                };
                let dash = rect.width() / LATTICE_DASHES;
                let stroke = Stroke {
                    width: LINE_WIDTH_PX,
                    dash: StrokeDash::new(vec![dash, dash], 0.0),
                    ..Stroke::default()
                };
                let path = PathBuilder::from_rect(rect);
                self.stroke(&path, &paint(*color, opacity), &stroke);
            }
            Shape::Mondrian { index, size } => {
                let center = self.to_px(item.pos);
                let (w, h) = self.sprite_dims(*size);
                let mask = self.masks.get(*index, w, h)?;
                Self::blit(&mut self.canvas, mask, center, opacity);
            }
            Shape::Bars {
                size,
                color,
                periods,
                offset_quarters,
            } => {
                if let Some(rect) = self.rect_px(item, *size) {
                    self.draw_bars(rect, *color, *periods, *offset_quarters, opacity);
                }
            }
            Shape::Line { to, color } => {
                let (x0, y0) = self.to_px(item.pos);
                let (x1, y1) = self.to_px(*to);
                let mut pb = PathBuilder::new();
                pb.move_to(x0, y0);
                pb.line_to(x1, y1);
                if let Some(path) = pb.finish() {
                    let stroke = Stroke {
                        width: LINE_WIDTH_PX,
                        ..Stroke::default()
                    };
                    self.stroke(&path, &paint(*color, opacity), &stroke);
                }
            }
            Shape::Text {
                content,
                height,
                wrap,
                color,
            } => self.draw_text(item, content, *height, *wrap, *color)?,
        }
        Ok(())
    }
}
