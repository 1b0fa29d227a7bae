//! The bank of circular mondrian masks.

use crate::sprite::pixmap;
use anyhow::{Context, Result, anyhow};
use bytemuck::cast_slice_mut;
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use tiny_skia::{
    BlendMode, ColorU8, FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap,
    PixmapPaint, Rect, Transform,
};
use tracing::{debug, info};

const PROCEDURAL_SIZE: u32 = 256;
const PATCHES: usize = 80;

/// Source images plus per-size rescaled copies.
pub struct MaskBank {
    images: Vec<Pixmap>,
    scaled: HashMap<(usize, u32, u32), Pixmap>,
}

impl MaskBank {
    pub fn new(images: Vec<Pixmap>) -> Result<Self> {
        if images.is_empty() {
            return Err(anyhow!("mask bank needs at least one image"));
        }
        Ok(Self {
            images,
            scaled: HashMap::new(),
        })
    }

    /// Loads `circ00.jpg` .. `circ0{count-1}.jpg` from `dir`.
    pub fn load(dir: &Path, count: usize) -> Result<Self> {
        let images = (0..count)
            .map(|i| load_image(&dir.join(format!("circ0{i}.jpg"))))
            .collect::<Result<Vec<_>>>()?;
        info!(dir = %dir.display(), count, "loaded mondrian masks");
        Self::new(images)
    }

    /// Random overlapping rectangles inside a circle.
    pub fn procedural(count: usize, rng: &mut impl Rng) -> Result<Self> {
        let images = (0..count)
            .map(|_| procedural_mondrian(PROCEDURAL_SIZE, rng))
            .collect::<Result<Vec<_>>>()?;
        debug!(count, "generated procedural mondrian masks");
        Self::new(images)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Mask `index` (wrapping) resampled to `width` x `height` pixels.
    pub fn get(&mut self, index: usize, width: u32, height: u32) -> Result<&Pixmap> {
        let index = index % self.images.len();
        let key = (index, width.max(1), height.max(1));
        if !self.scaled.contains_key(&key) {
            let source = &self.images[index];
            let mut scaled = pixmap(key.1, key.2)?;
            let transform = Transform::from_scale(
                key.1 as f32 / source.width() as f32,
                key.2 as f32 / source.height() as f32,
            );
            let paint = PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            };
            scaled.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
            self.scaled.insert(key, scaled);
        }
        self.scaled
            .get(&key)
            .ok_or_else(|| anyhow!("mask {index} missing from cache"))
    }
}

fn load_image(path: &Path) -> Result<Pixmap> {
    let image = image::open(path)
        .with_context(|| format!("failed to open mask {}", path.display()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    let mut raw = image.into_raw();
    for px in cast_slice_mut::<u8, [u8; 4]>(&mut raw) {
        let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        *px = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| anyhow!("empty mask image {}", path.display()))?;
    Pixmap::from_vec(raw, size).ok_or_else(|| anyhow!("bad mask image {}", path.display()))
}

fn procedural_mondrian(size: u32, rng: &mut impl Rng) -> Result<Pixmap> {
    let mut pm = pixmap(size, size)?;
    pm.fill(tiny_skia::Color::from_rgba8(
        rng.random(),
        rng.random(),
        rng.random(),
        255,
    ));
    let s = size as f32;
    for _ in 0..PATCHES {
        let w = rng.random_range(0.1..0.4) * s;
        let h = rng.random_range(0.1..0.4) * s;
        let x = rng.random_range(-0.2..1.0) * s;
        let y = rng.random_range(-0.2..1.0) * s;
        let mut paint = Paint::default();
        paint.set_color_rgba8(rng.random(), rng.random(), rng.random(), 255);
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            pm.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    // keep only the inscribed disc
    let disc = PathBuilder::from_circle(s / 2.0, s / 2.0, s / 2.0)
        .ok_or_else(|| anyhow!("degenerate mask size {size}"))?;
    let mut clip = pixmap(size, size)?;
    clip.fill_path(
        &disc,
        &Paint::default(),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    let keep = PixmapPaint {
        blend_mode: BlendMode::DestinationIn,
        ..PixmapPaint::default()
    };
    pm.draw_pixmap(0, 0, clip.as_ref(), &keep, Transform::identity(), None);
    Ok(pm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn procedural_masks_are_circular() {
        let mut bank = MaskBank::procedural(10, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(bank.len(), 10);
        let mask = bank.get(4, 64, 64).unwrap();
        assert_eq!((mask.width(), mask.height()), (64, 64));
        assert_eq!(mask.pixel(0, 0).unwrap().alpha(), 0);
        assert_eq!(mask.pixel(32, 32).unwrap().alpha(), 255);
    }

    #[test]
    fn index_wraps_around_the_bank() {
        let mut bank = MaskBank::procedural(2, &mut StdRng::seed_from_u64(3)).unwrap();
        let a = bank.get(1, 16, 16).unwrap().data().to_vec();
        let b = bank.get(3, 16, 16).unwrap().data().to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = MaskBank::load(Path::new("/nonexistent/masks"), 10)
            .err()
            .unwrap();
        assert!(err.to_string().contains("circ00.jpg"));
    }

    #[test]
    fn empty_bank_is_rejected() {
        assert!(MaskBank::new(Vec::new()).is_err());
    }
}
