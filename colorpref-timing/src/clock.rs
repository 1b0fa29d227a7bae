use std::time::Duration;

/// Converts protocol durations into frame counts at a nominal refresh rate.
///
/// Fractional frame counts truncate, so `frames(10.8)` at 60 Hz is 648.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    refresh_rate: u32,
}

impl FrameClock {
    pub fn new(refresh_rate: u32) -> Self {
        Self {
            refresh_rate: refresh_rate.max(1),
        }
    }

    pub fn refresh_rate(&self) -> u32 {
        self.refresh_rate
    }

    pub fn hz(&self) -> f64 {
        self.refresh_rate as f64
    }

    /// Whole frames covering `seconds`.
    pub fn frames(&self, seconds: f64) -> u64 {
        (seconds * self.hz()).max(0.0) as u64
    }

    /// Fractional frame count, for thresholds compared against frame indices.
    pub fn frames_f(&self, seconds: f64) -> f64 {
        seconds * self.hz()
    }

    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.refresh_rate as u64)
    }

    pub fn seconds(&self, frames: u64) -> f64 {
        frames as f64 / self.hz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_like_frame_loops() {
        let clock = FrameClock::new(60);
        assert_eq!(clock.frames(10.8), 648);
        assert_eq!(clock.frames(0.6), 36);
        assert_eq!(clock.frames(1.0 / 5.0), 12);
        assert_eq!(FrameClock::new(144).frames(0.1), 14);
        assert_eq!(clock.period(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn zero_rate_is_clamped() {
        assert_eq!(FrameClock::new(0).refresh_rate(), 1);
    }
}
