//! Breaking-time trials: how long a masked probe stays suppressed.

use crate::config::BreakingConfig;
use crate::error::Result;
use crate::log::TrialLog;
use crate::mask::{DutyCycle, ramp_in};
use crate::presenter::Presenter;
use crate::rig::{Keyboard, Screen};
use crate::scene::{LEFT_RIGHT, LOCATION_QUESTION};
use colorpref_core::{BreakingLayout, BreakingRecord, BreakingTime, Frame, Key};
use colorpref_timing::Timer;
use rand::Rng;
use std::io::Write;
use tracing::debug;

/// Frame-count thresholds for one trial, fixed at the session's refresh rate.
#[derive(Debug, Clone, Copy)]
struct Schedule {
    total: u64,
    mask_cutoff: f64,
    ramp_frames: f64,
    blink: Option<DutyCycle>,
}

impl Schedule {
    fn new<D, T, R>(p: &Presenter<D, T, R>, config: &BreakingConfig) -> Self
    where
        D: Screen + Keyboard,
        T: Timer,
        R: Rng,
    {
        Self {
            total: p.clock.frames(config.max_duration),
            mask_cutoff: p.clock.frames_f(config.mask_duration),
            ramp_frames: if config.ramp_in {
                p.clock.frames_f(config.ramp_duration)
            } else {
                0.0
            },
            blink: config
                .blinking
                .then(|| DutyCycle::blink(&p.clock, config.blink_period)),
        }
    }

    fn masks_visible(&self, n: u64) -> bool {
        (n as f64) < self.mask_cutoff && self.blink.is_none_or(|b| b.mask_visible(n))
    }

    fn probe_visible(&self, n: u64) -> bool {
        self.blink.is_none_or(|b| b.probe_visible(n))
    }
}

fn trial_frame<D, T, R>(
    p: &Presenter<D, T, R>,
    schedule: &Schedule,
    layout: &BreakingLayout,
    n: u64,
) -> Frame
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    let mut frame = p.scene.background();
    if schedule.masks_visible(n) {
        frame.extend(p.scene.mondrian_pair(p.masks.index(n)));
    }
    if schedule.probe_visible(n) {
        frame.push(
            p.scene
                .probe(layout.color, layout.offset)
                .with_opacity(ramp_in(n, schedule.ramp_frames)),
        );
    }
    frame
}

/// Runs one trial and appends its record to `log`.
///
/// The first Space during the masked interval stops the trial; its latency
/// from the first masked frame is the breaking time.
pub fn run<D, T, R, W>(
    p: &mut Presenter<D, T, R>,
    log: &mut TrialLog<W>,
    config: &BreakingConfig,
    layout: BreakingLayout,
) -> Result<BreakingRecord>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    p.wait_for_ready(false)?;
    let max_fixation = p.clock.frames(config.max_fixation);
    if max_fixation > 0 {
        let fixation = p.rng.random_range(0..max_fixation);
        p.blank(fixation)?;
    }

    let schedule = Schedule::new(p, config);
    let mut breaking_time = BreakingTime::TimedOut;
    let start = p.timer.now();
    for n in 0..schedule.total {
        let frame = trial_frame(p, &schedule, &layout, n);
        if p.display.poll(&[Key::Space])?.is_some() {
            breaking_time = BreakingTime::Broke(p.timer.elapsed(start).as_secs_f64());
            p.present(&frame)?;
            break;
        }
        p.present(&frame)?;
    }

    let passed = if config.ask_location {
        let frame = p.scene.question(LOCATION_QUESTION, LEFT_RIGHT);
        let answer = p.ask(&frame, &Key::DIRECTIONS)?;
        Some(
            (answer == Key::Left && layout.offset < 0.0)
                || (answer == Key::Right && layout.offset > 0.0),
        )
    } else {
        None
    };

    let record = BreakingRecord {
        layout,
        breaking_time,
        passed,
    };
    debug!(
        color = %layout.color,
        offset = layout.offset,
        breaking_time = %breaking_time,
        ?passed,
        "breaking trial"
    );
    log.record(&record)?;
    p.confirm()?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Geometry;
    use crate::scene::Scene;
    use crate::sim::SimulatedRig;
    use colorpref_core::{Color, Shape};
    use colorpref_timing::{FrameClock, ManualTimer};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const PROBE: Color = Color::new(3, 6, 24);

    fn presenter(rig: SimulatedRig) -> Presenter<SimulatedRig, ManualTimer, StdRng> {
        let clock = FrameClock::new(60);
        let timer = rig.timer();
        Presenter::new(
            rig,
            timer,
            StdRng::seed_from_u64(1),
            clock,
            Scene::new(Geometry::default(), 16.0 / 9.0),
        )
    }

    fn config() -> BreakingConfig {
        BreakingConfig {
            max_fixation: 0.0,
            ..BreakingConfig::default()
        }
    }

    fn layout(offset: f64) -> BreakingLayout {
        BreakingLayout {
            color: PROBE,
            offset,
        }
    }

    #[test]
    fn space_at_frame_k_gives_k_periods() {
        let rig = SimulatedRig::new(60)
            .answers([Key::Space, Key::Left])
            .key_after(90, Key::Space);
        let mut p = presenter(rig);
        let mut log = TrialLog::new(Vec::new());
        let record = run(&mut p, &mut log, &config(), layout(-0.0625)).unwrap();
        let seconds = record.breaking_time.seconds().unwrap();
        assert!((seconds - 1.5).abs() <= 1.0 / 60.0, "{seconds}");
        assert_eq!(record.passed, Some(true));
        let text = String::from_utf8(log.get_ref().clone()).unwrap();
        let logged: BreakingRecord = text.trim_end().parse().unwrap();
        assert_eq!(logged, record);
        assert!(text.trim_end().ends_with("True"));
    }

    #[test]
    fn silence_times_out_with_sentinel() {
        let rig = SimulatedRig::new(60).answers([Key::Space, Key::Left]);
        let mut p = presenter(rig);
        let mut log = TrialLog::new(Vec::new());
        let record = run(&mut p, &mut log, &config(), layout(0.0625)).unwrap();
        assert_eq!(record.breaking_time, BreakingTime::TimedOut);
        assert_eq!(record.passed, Some(false));
        let text = String::from_utf8(log.get_ref().clone()).unwrap();
        assert_eq!(text, "(3,6,24) 0.0625 99999 False\n");
        // ready + 648 masked frames + question + one second of confirmation
        assert_eq!(p.display.frames_presented(), 1 + 648 + 1 + 60);
    }

    #[test]
    fn skipped_follow_up_logs_none() {
        let rig = SimulatedRig::new(60)
            .answers([Key::Space])
            .key_after(10, Key::Space);
        let mut p = presenter(rig);
        let mut log = TrialLog::new(Vec::new());
        let cfg = BreakingConfig {
            ask_location: false,
            ..config()
        };
        let record = run(&mut p, &mut log, &cfg, layout(0.0625)).unwrap();
        assert_eq!(record.passed, None);
        let text = String::from_utf8(log.get_ref().clone()).unwrap();
        assert!(text.trim_end().ends_with("None"));
    }

    #[test]
    fn escape_during_masking_aborts_without_logging() {
        let rig = SimulatedRig::new(60)
            .answers([Key::Space])
            .key_after(30, Key::Escape);
        let mut p = presenter(rig);
        let mut log = TrialLog::new(Vec::new());
        let err = run(&mut p, &mut log, &config(), layout(0.0625)).unwrap_err();
        assert!(err.is_abort());
        assert_eq!(log.lines(), 0);
    }

    #[test]
    fn blinking_hides_probe_between_windows() {
        let p = presenter(SimulatedRig::new(60));
        let schedule = Schedule::new(&p, &config());
        let has_probe = |n| {
            trial_frame(&p, &schedule, &layout(0.0625), n)
                .count(|s| matches!(s, Shape::CrossDisc { .. }))
                == 1
        };
        assert!(!has_probe(1));
        assert!(has_probe(10));
        assert!(!has_probe(25));
        assert!(has_probe(36 + 10));
        let masks = |n| {
            trial_frame(&p, &schedule, &layout(0.0625), n)
                .count(|s| matches!(s, Shape::Mondrian { .. }))
        };
        assert_eq!(masks(0), 2);
        assert_eq!(masks(30), 0);
        assert_eq!(masks(600 + 12), 0);
    }
}
