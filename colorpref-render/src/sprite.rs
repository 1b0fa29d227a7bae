//! Procedural stimulus sprites. Each is rasterized once per pixel size and
//! color and then blitted with the item's opacity.

use anyhow::{Result, anyhow};
use colorpref_core::Color;
use std::f32::consts::PI;
use tiny_skia::{BlendMode, ColorU8, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

/// Width of each cross arm as a fraction of the disc diameter.
const CROSS_WIDTH: f32 = 0.2;
/// Gaussian sd relative to the sprite half-size.
const ENVELOPE_SD: f32 = 1.0 / 3.0;

pub(crate) fn pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width.max(1), height.max(1))
        .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} pixmap"))
}

pub(crate) fn paint(color: Color, opacity: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    paint.set_color_rgba8(color.r, color.g, color.b, alpha);
    paint
}

/// Filled disc with a transparent plus cut through its center.
pub fn cross_disc(width: u32, height: u32, color: Color) -> Result<Pixmap> {
    let mut pm = pixmap(width, height)?;
    let (w, h) = (pm.width() as f32, pm.height() as f32);
    let oval = Rect::from_xywh(0.0, 0.0, w, h)
        .and_then(PathBuilder::from_oval)
        .ok_or_else(|| anyhow!("degenerate disc {width}x{height}"))?;
    pm.fill_path(
        &oval,
        &paint(color, 1.0),
        FillRule::Winding,
        Transform::identity(),
        None,
    );

    let mut cut = Paint::default();
    cut.blend_mode = BlendMode::Clear;
    let (arm_w, arm_h) = (w * CROSS_WIDTH, h * CROSS_WIDTH);
    let arms = [
        Rect::from_xywh((w - arm_w) / 2.0, 0.0, arm_w, h),
        Rect::from_xywh(0.0, (h - arm_h) / 2.0, w, arm_h),
    ];
    for arm in arms.into_iter().flatten() {
        pm.fill_rect(arm, &cut, Transform::identity(), None);
    }
    Ok(pm)
}

fn envelope(x: f32, y: f32) -> f32 {
    (-(x * x + y * y) / (2.0 * ENVELOPE_SD * ENVELOPE_SD)).exp()
}

/// Fills `pm` from a function of the pixel center in `-1.0..=1.0` sprite
/// coordinates, y down.
fn shade(pm: &mut Pixmap, f: impl Fn(f32, f32) -> ColorU8) {
    let (w, h) = (pm.width() as usize, pm.height() as usize);
    for (i, px) in pm.pixels_mut().iter_mut().enumerate() {
        let x = ((i % w) as f32 + 0.5) / w as f32 * 2.0 - 1.0;
        let y = ((i / w) as f32 + 0.5) / h as f32 * 2.0 - 1.0;
        *px = f(x, y).premultiply();
    }
}

/// Black-to-white sine grating under a gaussian window. `cycles` periods span
/// the sprite width; positive tilts lean the stripes clockwise.
pub fn gabor(width: u32, height: u32, tilt_deg: f32, cycles: f32) -> Result<Pixmap> {
    let mut pm = pixmap(width, height)?;
    let (sin, cos) = tilt_deg.to_radians().sin_cos();
    shade(&mut pm, |x, y| {
        let u = x * cos + y * sin;
        let level = 0.5 + 0.5 * (PI * cycles * u).sin();
        let v = (level * 255.0).round() as u8;
        ColorU8::from_rgba(v, v, v, (envelope(x, y) * 255.0).round() as u8)
    });
    Ok(pm)
}

/// Solid color fading out with a gaussian window.
pub fn patch(width: u32, height: u32, color: Color) -> Result<Pixmap> {
    let mut pm = pixmap(width, height)?;
    shade(&mut pm, |x, y| {
        let alpha = (envelope(x, y) * 255.0).round() as u8;
        ColorU8::from_rgba(color.r, color.g, color.b, alpha)
    });
    Ok(pm)
}
