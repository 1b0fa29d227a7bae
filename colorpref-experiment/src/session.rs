use crate::breaking;
use crate::config::{EquiluminanceMethod, SessionConfig};
use crate::equiluminance;
use crate::error::{ExperimentError, Result};
use crate::log::TrialLog;
use crate::orientation::{self, TrialMode};
use crate::preference;
use crate::presenter::Presenter;
use crate::rig::{Keyboard, Screen};
use crate::scene::Scene;
use crate::sequencer::{
    TrialOrder, breaking_layouts, orientation_layouts, random_orientation_layout,
};
use crate::staircase::{self, CalibrationResult, DiscriminationProbe};
use colorpref_core::{
    CALIBRATED_TILT_PREFIX, CalibrationStep, Color, Key, OrientationOutcome, Stage,
};
use colorpref_timing::{FrameClock, Timer};
use rand::Rng;
use std::io::Write;
use tracing::{debug, info};

/// What a finished session produced, besides the log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub breaking_trials: usize,
    /// Most and least favorite colors, when the ranking ran.
    pub extremes: Option<(Color, Color)>,
    /// Colors used for the priming ring.
    pub pair: (Color, Color),
    pub calibration: Option<CalibrationResult>,
    pub tilt: f64,
    pub orientation_trials: usize,
    pub prime_reports: usize,
}

/// One subject, one pass through the protocol.
pub struct Session<D, T, R, W>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    config: SessionConfig,
    presenter: Presenter<D, T, R>,
    log: TrialLog<W>,
    stage: Stage,
    pair: (Color, Color),
}

impl<D, T, R, W> Session<D, T, R, W>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    pub fn new(
        config: SessionConfig,
        display: D,
        timer: T,
        rng: R,
        log: TrialLog<W>,
    ) -> Result<Self> {
        config.validate()?;
        let clock = FrameClock::new(config.refresh_rate);
        let scene = Scene::new(config.geometry.clone(), display.aspect_ratio());
        let pair = (config.colors[0], config.colors[1]);
        Ok(Self {
            presenter: Presenter::new(display, timer, rng, clock, scene),
            log,
            stage: Stage::default(),
            pair,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn presenter(&self) -> &Presenter<D, T, R> {
        &self.presenter
    }

    pub fn log(&self) -> &TrialLog<W> {
        &self.log
    }

    pub fn into_parts(self) -> (Presenter<D, T, R>, TrialLog<W>) {
        (self.presenter, self.log)
    }

    /// Runs every enabled stage in order.
    pub fn run(&mut self) -> Result<SessionSummary> {
        let mut summary = SessionSummary {
            breaking_trials: 0,
            extremes: None,
            pair: self.pair,
            calibration: None,
            tilt: self.config.orientation.fixed_tilt,
            orientation_trials: 0,
            prime_reports: 0,
        };
        let mut next = Some(Stage::default());
        while let Some(stage) = next {
            self.stage = stage;
            match stage {
                Stage::BreakingTime if self.config.stages.breaking_time => {
                    summary.breaking_trials = self.breaking_stage()?;
                }
                Stage::Preference if self.config.stages.preference => {
                    let extremes = preference::collect(
                        &mut self.presenter,
                        &mut self.log,
                        &self.config.colors,
                    )?;
                    summary.extremes = Some(extremes);
                    self.pair = extremes;
                }
                Stage::Equiluminance => self.equiluminance_stage()?,
                Stage::Calibration if self.config.stages.calibrate_tilt => {
                    let result = self.calibration_stage()?;
                    summary.tilt = result.tilt();
                    summary.calibration = Some(result);
                }
                Stage::Orientation if self.config.stages.orientation => {
                    let (trials, reports) = self.orientation_stage(summary.tilt)?;
                    summary.orientation_trials = trials;
                    summary.prime_reports = reports;
                }
                Stage::Farewell => self.farewell()?,
                skipped => debug!(stage = ?skipped, "stage disabled"),
            }
            next = stage.next();
        }
        summary.pair = self.pair;
        self.log.flush()?;
        Ok(summary)
    }

    fn breaking_stage(&mut self) -> Result<usize> {
        let config = &self.config.breaking;
        let layouts = breaking_layouts(&self.config.colors, &config.offsets);
        let order =
            TrialOrder::shuffled(layouts.len(), config.repetitions, &mut self.presenter.rng);
        info!(
            colors = ?self.config.colors,
            trials = order.len(),
            "starting breaking-time stage"
        );
        self.log.begin_stage(self.stage)?;
        for (i, layout) in order.select(&layouts).enumerate() {
            debug!(trial = i + 1, of = order.len(), "breaking trial");
            breaking::run(&mut self.presenter, &mut self.log, config, *layout)?;
        }
        self.log.end_stage(self.stage)?;
        Ok(order.len())
    }

    fn equiluminance_stage(&mut self) -> Result<()> {
        let (reference, adjusted) = self.pair;
        self.pair = match self.config.stages.equiluminance {
            EquiluminanceMethod::Flicker => {
                equiluminance::flicker(&mut self.presenter, &mut self.log, reference, adjusted)?
            }
            EquiluminanceMethod::MinimumMotion => equiluminance::minimum_motion(
                &mut self.presenter,
                &mut self.log,
                reference,
                adjusted,
            )?,
            EquiluminanceMethod::Skip => {
                debug!("equiluminance skipped, colors used as ranked");
                self.pair
            }
        };
        Ok(())
    }

    fn calibration_stage(&mut self) -> Result<CalibrationResult> {
        info!("calibrating tilt");
        self.log.begin_stage(self.stage)?;
        let config = self.config.staircase.clone();
        let result = staircase::calibrate(self, &config)?;
        self.log
            .record(&format!("{CALIBRATED_TILT_PREFIX} {}", result.tilt()))?;
        self.log.end_stage(self.stage)?;
        Ok(result)
    }

    fn orientation_stage(&mut self, tilt: f64) -> Result<(usize, usize)> {
        let config = &self.config.orientation;
        let layouts = orientation_layouts(self.config.geometry.ring_radius, tilt);
        let order =
            TrialOrder::shuffled(layouts.len(), config.repetitions, &mut self.presenter.rng);
        info!(
            pair = ?self.pair,
            tilt,
            trials = order.len(),
            "starting orientation stage"
        );
        self.log.begin_stage(self.stage)?;
        let mut reports = 0;
        for (i, layout) in order.select(&layouts).enumerate() {
            debug!(trial = i + 1, of = order.len(), "orientation trial");
            let record = orientation::run(
                &mut self.presenter,
                &mut self.log,
                config,
                self.pair,
                *layout,
                TrialMode::Main,
            )?;
            if record.outcome == OrientationOutcome::PrimeReported {
                reports += 1;
            }
        }
        self.log.end_stage(self.stage)?;
        Ok((order.len(), reports))
    }

    /// Leaving the end screen with the abort key is a normal exit.
    fn farewell(&mut self) -> Result<()> {
        info!("all trials completed");
        let frame = self.presenter.scene.farewell();
        match self.presenter.ask(&frame, &[Key::Quit]) {
            Ok(_) => Ok(()),
            Err(ExperimentError::Aborted) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<D, T, R, W> DiscriminationProbe for Session<D, T, R, W>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    fn discriminate(&mut self, tilt: f64) -> Result<Option<bool>> {
        let layout = random_orientation_layout(
            &mut self.presenter.rng,
            self.config.geometry.ring_radius,
            tilt,
        );
        if !self.config.staircase.follow_up_questions {
            return orientation::run_tilt_only(
                &mut self.presenter,
                &self.config.orientation,
                self.pair,
                layout,
            );
        }
        let record = orientation::run(
            &mut self.presenter,
            &mut self.log,
            &self.config.orientation,
            self.pair,
            layout,
            TrialMode::Calibration,
        )?;
        Ok(match record.outcome {
            OrientationOutcome::PrimeReported => None,
            OrientationOutcome::Discriminated(d) => Some(d.correct),
        })
    }

    fn observe(&mut self, step: &CalibrationStep) -> Result<()> {
        self.log.record(step)
    }
}
