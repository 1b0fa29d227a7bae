//! Subject-paced luminance matching of the two ranked extremes.
//!
//! The first color is the reference. The second is scaled until the two
//! look equally bright, judged either by flicker or by apparent motion.

use crate::error::Result;
use crate::log::TrialLog;
use crate::presenter::Presenter;
use crate::rig::{Keyboard, Screen};
use colorpref_core::{Color, EQUILUMINANCE_PREFIX, Key};
use colorpref_timing::Timer;
use rand::Rng;
use std::io::Write;
use tracing::{debug, info};

const EPSILON: f64 = 1e-9;
const ADJUST_KEYS: [Key; 3] = [Key::Left, Key::Right, Key::Space];

/// Bounded scale factor moved in fixed steps by Left/Right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleAdjuster {
    origin: f64,
    scale: f64,
    step: f64,
    min: f64,
    max: f64,
}

impl ScaleAdjuster {
    pub fn new(origin: f64, step: f64, min: f64, max: f64) -> Self {
        Self {
            origin,
            scale: origin,
            step,
            min,
            max,
        }
    }

    /// Starts at the color's own brightest channel.
    pub fn flicker(base: Color) -> Self {
        let origin = (base.max_channel().max(1)) as f64 / 255.0;
        Self::new(origin, 0.01, 0.01, 0.99)
    }

    pub fn minimum_motion() -> Self {
        Self::new(0.5, 0.1, 0.1, 0.9)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Left lowers and Right raises the scale; a step at a bound is ignored.
    pub fn nudge(&mut self, key: Key) -> bool {
        match key {
            Key::Left if self.scale > self.min + EPSILON => {
                self.scale = (self.scale - self.step).max(self.min);
                true
            }
            Key::Right if self.scale < self.max - EPSILON => {
                self.scale = (self.scale + self.step).min(self.max);
                true
            }
            _ => false,
        }
    }

    /// `base` scaled relative to where the adjustment started.
    pub fn apply(&self, base: Color) -> Color {
        base.scaled(self.scale / self.origin)
    }
}

/// Colors and quarter-period offsets of the two gratings on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStep {
    /// Test colors on the first quarter of each half cycle, dark reference
    /// gratings on the second.
    pub luminant: bool,
    pub first_offset: u8,
    pub second_offset: u8,
}

/// Grating phase for `frame` within a cycle of `frames_per_cycle` frames.
///
/// Each quarter cycle moves the pattern a quarter period, alternating the
/// test pair with the dark pair; which direction the motion appears to take
/// depends on which test color looks brighter.
pub fn motion_step(frame: u64, frames_per_cycle: u64) -> MotionStep {
    let half = (frames_per_cycle / 2).max(1);
    let quarter = (frames_per_cycle / 4).max(1);
    let half_index = (frame / half).min(1) as u8;
    let luminant = frame % half < quarter;
    let step = 2 * half_index + u8::from(!luminant);
    let first_offset = (3 + step) % 4;
    MotionStep {
        luminant,
        first_offset,
        second_offset: (first_offset + 2) % 4,
    }
}

fn finish<W: Write>(
    log: &mut TrialLog<W>,
    reference: Color,
    matched: Color,
) -> Result<(Color, Color)> {
    log.record(&format!("{EQUILUMINANCE_PREFIX} {matched}"))?;
    info!(%reference, %matched, "equiluminant pair chosen");
    Ok((reference, matched))
}

/// Heterochromatic flicker photometry: the two colors alternate in one disc
/// until the subject stops seeing it flicker.
pub fn flicker<D, T, R, W>(
    p: &mut Presenter<D, T, R>,
    log: &mut TrialLog<W>,
    reference: Color,
    adjusted: Color,
) -> Result<(Color, Color)>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    let mut scale = ScaleAdjuster::flicker(adjusted);
    let hold = (p.clock.refresh_rate() as u64 / 60).max(1);
    loop {
        for shown in [reference, scale.apply(adjusted)] {
            let frame = p.scene.flicker(shown, scale.scale());
            p.hold(&frame, hold)?;
        }
        match p.display.poll(&ADJUST_KEYS)? {
            Some(Key::Space) => break,
            Some(key) => {
                if scale.nudge(key) {
                    debug!(scale = scale.scale(), "flicker scale");
                }
            }
            None => {}
        }
    }
    p.display.clear();
    finish(log, reference, scale.apply(adjusted))
}

/// Minimum-motion matching with two complementary square-wave gratings.
pub fn minimum_motion<D, T, R, W>(
    p: &mut Presenter<D, T, R>,
    log: &mut TrialLog<W>,
    reference: Color,
    adjusted: Color,
) -> Result<(Color, Color)>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    let mut scale = ScaleAdjuster::minimum_motion();
    let frames_per_cycle = (p.clock.refresh_rate() as u64 / 3).max(4);
    'adjust: loop {
        for frame_in_cycle in 0..frames_per_cycle {
            let step = motion_step(frame_in_cycle, frames_per_cycle);
            let (first, second) = if step.luminant {
                (reference, scale.apply(adjusted))
            } else {
                (Color::BLACK, Color::DIM)
            };
            let frame = p.scene.motion(
                (first, step.first_offset),
                (second, step.second_offset),
                scale.scale(),
            );
            p.present(&frame)?;
            match p.display.poll(&ADJUST_KEYS)? {
                Some(Key::Space) => break 'adjust,
                Some(key) => {
                    if scale.nudge(key) {
                        debug!(scale = scale.scale(), "motion scale");
                    }
                }
                None => {}
            }
        }
    }
    p.display.clear();
    finish(log, reference, scale.apply(adjusted))
}
