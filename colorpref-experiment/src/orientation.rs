//! Cued orientation discrimination after a suppressed color prime.

use crate::config::OrientationConfig;
use crate::error::Result;
use crate::log::TrialLog;
use crate::mask::DutyCycle;
use crate::presenter::Presenter;
use crate::rig::{Keyboard, Screen};
use crate::scene::{LEFT_RIGHT, TILT_QUESTION};
use colorpref_core::{
    Color, ColorSeen, Discrimination, Frame, Key, LocationsSeen, OrientationLayout,
    OrientationOutcome, OrientationRecord, Popout,
};
use colorpref_timing::Timer;
use rand::Rng;
use std::io::Write;
use tracing::debug;

/// Main trials are logged; calibration trials only report correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialMode {
    Main,
    Calibration,
}

fn prime_frame<D, T, R>(
    p: &Presenter<D, T, R>,
    duty: &DutyCycle,
    colors: (Color, Color),
    layout: &OrientationLayout,
    n: u64,
) -> Frame
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    let (primary, secondary) = match layout.popout {
        Popout::First => colors,
        Popout::Second => (colors.1, colors.0),
    };
    let mut frame = p.scene.background();
    if duty.mask_visible(n) {
        frame.push(p.scene.prime_mask(p.masks.index(n)));
    }
    if duty.probe_visible(n) {
        frame.extend(
            p.scene
                .ring(primary, secondary, layout.popout_offset, duty.ramp(n)),
        );
    }
    frame.extend(p.scene.fixation_overlay());
    frame
}

/// Shows the priming ring. Returns `true` if the subject reported it.
fn prime<D, T, R>(
    p: &mut Presenter<D, T, R>,
    config: &OrientationConfig,
    colors: (Color, Color),
    layout: &OrientationLayout,
) -> Result<bool>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    let duty = DutyCycle::prime(&p.clock, config.prime_period);
    for n in 0..p.clock.frames(config.prime_duration) {
        let frame = prime_frame(p, &duty, colors, layout, n);
        p.present(&frame)?;
        if config.prime_report && p.display.poll(&[Key::Space])?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ask_visibility<D, T, R>(p: &mut Presenter<D, T, R>, config: &OrientationConfig) -> Result<u8>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    p.display.clear();
    let scale = &config.rating_scale;
    let last = scale.levels().saturating_sub(1);
    let mut cursor = 0;
    loop {
        let frame = p.scene.rating(scale, cursor);
        match p.ask(&frame, &Key::VERTICAL)? {
            Key::Up => cursor = cursor.saturating_sub(1),
            Key::Down => cursor = (cursor + 1).min(last),
            _ => return Ok(scale.rating(cursor)),
        }
    }
}

fn ask_locations<D, T, R>(p: &mut Presenter<D, T, R>) -> Result<LocationsSeen>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    p.display.clear();
    let mut seen = LocationsSeen::default();
    loop {
        let frame = p.scene.locations(seen.upper, seen.lower);
        match p.ask(&frame, &Key::VERTICAL)? {
            Key::Up => seen.upper = !seen.upper,
            Key::Down => seen.lower = !seen.lower,
            _ => return Ok(seen),
        }
    }
}

fn ask_color_seen<D, T, R>(
    p: &mut Presenter<D, T, R>,
    colors: (Color, Color),
) -> Result<ColorSeen>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    p.display.clear();
    let frame = p.scene.color_seen(colors.0, colors.1);
    Ok(match p.ask(&frame, &[Key::Left, Key::Right, Key::Space])? {
        Key::Left => ColorSeen::First,
        Key::Right => ColorSeen::Second,
        _ => ColorSeen::Both,
    })
}

/// Prime, target and tilt answer. `None` when the prime was reported.
fn tilt_response<D, T, R>(
    p: &mut Presenter<D, T, R>,
    config: &OrientationConfig,
    colors: (Color, Color),
    layout: &OrientationLayout,
) -> Result<Option<(f64, bool)>>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    if prime(p, config, colors, layout)? {
        return Ok(None);
    }
    let target = p
        .scene
        .background()
        .with(p.scene.gabor(layout.target_offset, layout.tilt));
    let question = p.scene.question(TILT_QUESTION, LEFT_RIGHT);
    let target_frames = p.clock.frames(config.target_duration);
    let start = p.timer.now();
    p.hold(&target, target_frames)?;
    let answer = p.ask(&question, &Key::DIRECTIONS)?;
    let response_time = p.timer.elapsed(start).as_secs_f64();
    let correct =
        (answer == Key::Left && layout.tilt < 0.0) || (answer == Key::Right && layout.tilt > 0.0);
    Ok(Some((response_time, correct)))
}

fn calibration_pause<D, T, R>(p: &mut Presenter<D, T, R>) -> Result<()>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    let refresh = p.clock.refresh_rate() as u64;
    let pause = p.rng.random_range(refresh / 2..=refresh);
    p.blank(pause)
}

/// Runs one trial. In [`TrialMode::Main`] the record is appended to `log`.
pub fn run<D, T, R, W>(
    p: &mut Presenter<D, T, R>,
    log: &mut TrialLog<W>,
    config: &OrientationConfig,
    colors: (Color, Color),
    layout: OrientationLayout,
    mode: TrialMode,
) -> Result<OrientationRecord>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    p.wait_for_ready(true)?;
    if mode == TrialMode::Calibration {
        calibration_pause(p)?;
    }

    let outcome = match tilt_response(p, config, colors, &layout)? {
        None => OrientationOutcome::PrimeReported,
        Some((response_time, correct)) => {
            let visibility = ask_visibility(p, config)?;
            let locations = if config.ask_locations {
                Some(ask_locations(p)?)
            } else {
                None
            };
            let color_seen = if config.ask_color_seen {
                Some(ask_color_seen(p, colors)?)
            } else {
                None
            };
            OrientationOutcome::Discriminated(Discrimination {
                response_time,
                correct,
                visibility,
                locations,
                color_seen,
            })
        }
    };

    let record = OrientationRecord { layout, outcome };
    debug!(%layout, ?mode, ?outcome, "orientation trial");
    if mode == TrialMode::Main {
        log.record(&record)?;
    }
    p.confirm()?;
    Ok(record)
}

/// Calibration trial that stops at the tilt answer, without the visibility,
/// location and color questions. Returns the correctness, or `None` when the
/// prime was reported.
pub fn run_tilt_only<D, T, R>(
    p: &mut Presenter<D, T, R>,
    config: &OrientationConfig,
    colors: (Color, Color),
    layout: OrientationLayout,
) -> Result<Option<bool>>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    p.wait_for_ready(true)?;
    calibration_pause(p)?;
    let correct = tilt_response(p, config, colors, &layout)?.map(|(_, correct)| correct);
    debug!(%layout, ?correct, "calibration trial");
    p.confirm()?;
    Ok(correct)
}
