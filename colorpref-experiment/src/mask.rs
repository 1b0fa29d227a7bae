//! Masking sequence: which mondrian is current and when probes may show.

use colorpref_timing::FrameClock;

pub const MONDRIAN_COUNT: usize = 10;
const MASK_CHANGES_PER_SECOND: f64 = 10.0;

/// Cycles through the mondrian bank at a fixed wall-clock rate, whatever the
/// refresh rate. The index keeps advancing whether or not anything is drawn.
#[derive(Debug, Clone, Copy)]
pub struct MaskSequence {
    frames_per_mask: f64,
    count: usize,
}

impl MaskSequence {
    pub fn new(clock: &FrameClock) -> Self {
        Self {
            frames_per_mask: (clock.hz() / MASK_CHANGES_PER_SECOND).max(1.0),
            count: MONDRIAN_COUNT,
        }
    }

    /// Bank index shown on `frame`. Frame 0 shows mask 0; only the cycle
    /// rate matters, not which mask comes first.
    pub fn index(&self, frame: u64) -> usize {
        (frame as f64 / self.frames_per_mask).floor() as usize % self.count
    }
}

/// Periodic visibility window.
///
/// Within each period the mask shows for `window + 2 * lead` frames and the
/// probe for the `window` frames in its middle, so the mask is up `lead`
/// frames before the probe appears and after it goes.
#[derive(Debug, Clone, Copy)]
pub struct DutyCycle {
    period: u64,
    window: f64,
    lead: u64,
}

impl DutyCycle {
    pub fn new(period: u64, window: f64, lead: u64) -> Self {
        Self {
            period: period.max(1),
            window,
            lead,
        }
    }

    /// Blinking breaking-time probe: a third of a second per period.
    pub fn blink(clock: &FrameClock, period_s: f64) -> Self {
        Self::new(clock.frames(period_s), clock.hz() / 3.0, 2)
    }

    /// Priming ring: a fifth of a second per period.
    pub fn prime(clock: &FrameClock, period_s: f64) -> Self {
        Self::new(clock.frames(period_s), clock.hz() / 5.0, 3)
    }

    pub fn phase(&self, frame: u64) -> u64 {
        frame % self.period
    }

    pub fn mask_visible(&self, frame: u64) -> bool {
        (self.phase(frame) as f64) < self.window + 2.0 * self.lead as f64
    }

    pub fn probe_visible(&self, frame: u64) -> bool {
        let phase = self.phase(frame);
        phase >= self.lead && (phase as f64) < self.window + self.lead as f64
    }

    /// Opacity rising linearly across the probe window; zero outside it.
    pub fn ramp(&self, frame: u64) -> f32 {
        if !self.probe_visible(frame) {
            return 0.0;
        }
        let into = (self.phase(frame) - self.lead + 1) as f64;
        (into / (self.window + 0.01)).min(1.0) as f32
    }
}

/// Linear fade-in from transparent over `ramp_frames`.
pub fn ramp_in(frame: u64, ramp_frames: f64) -> f32 {
    if ramp_frames <= 0.0 {
        1.0
    } else {
        (frame as f64 / ramp_frames).min(1.0) as f32
    }
}
