//! Adaptive tilt calibration.
//!
//! Two 3-down/1-up staircases, one descending from a steep tilt and one
//! ascending from a shallow one, each run until the configured number of
//! reversals. Their final tilts are averaged.

use crate::config::StaircaseConfig;
use crate::error::Result;
use colorpref_core::CalibrationStep;
use tracing::{debug, info, warn};

/// One discrimination at a given tilt magnitude.
pub trait DiscriminationProbe {
    /// Runs a trial; `None` when it cannot be scored.
    fn discriminate(&mut self, tilt: f64) -> Result<Option<bool>>;

    /// Called after every scored trial.
    fn observe(&mut self, _step: &CalibrationStep) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Staircase {
    index: usize,
    tilt: f64,
    descending: bool,
    streak: u8,
    reversals: u8,
    trials: usize,
    config: StaircaseConfig,
}

impl Staircase {
    pub fn new(index: usize, tilt: f64, descending: bool, config: &StaircaseConfig) -> Self {
        Self {
            index,
            tilt,
            descending,
            streak: 0,
            reversals: 0,
            trials: 0,
            config: config.clone(),
        }
    }

    pub fn descending(index: usize, config: &StaircaseConfig) -> Self {
        Self::new(index, config.descending_start, true, config)
    }

    pub fn ascending(index: usize, config: &StaircaseConfig) -> Self {
        Self::new(index, config.ascending_start, false, config)
    }

    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    pub fn reversals(&self) -> u8 {
        self.reversals
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    pub fn converged(&self) -> bool {
        self.reversals >= self.config.reversals
    }

    pub fn is_finished(&self) -> bool {
        self.converged() || self.trials >= self.config.max_trials
    }

    /// Counts a trial that was presented but not scored.
    pub fn skip(&mut self) {
        self.trials += 1;
    }

    pub fn update(&mut self, correct: bool) -> CalibrationStep {
        self.trials += 1;
        if correct {
            self.streak += 1;
            if self.streak >= self.config.streak {
                self.streak = 0;
                let lowered = (self.tilt - self.config.step).max(self.config.min_tilt);
                if lowered < self.tilt {
                    self.tilt = lowered;
                    if !self.descending {
                        self.descending = true;
                        self.reversals += 1;
                    }
                }
            }
        } else {
            self.streak = 0;
            self.tilt += self.config.step;
            if self.descending {
                self.descending = false;
                self.reversals += 1;
            }
        }
        CalibrationStep {
            staircase: self.index,
            tilt: self.tilt,
            correct,
            streak: self.streak,
            reversals: self.reversals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaircaseOutcome {
    pub tilt: f64,
    pub reversals: u8,
    pub trials: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub descending: StaircaseOutcome,
    pub ascending: StaircaseOutcome,
}

impl CalibrationResult {
    /// Mean of the two staircase end points.
    pub fn tilt(&self) -> f64 {
        (self.descending.tilt + self.ascending.tilt) / 2.0
    }
}

pub fn run_staircase<P: DiscriminationProbe>(
    probe: &mut P,
    mut staircase: Staircase,
) -> Result<StaircaseOutcome> {
    while !staircase.is_finished() {
        match probe.discriminate(staircase.tilt())? {
            Some(correct) => {
                let step = staircase.update(correct);
                debug!(
                    staircase = step.staircase,
                    tilt = step.tilt,
                    correct,
                    reversals = step.reversals,
                    "staircase step"
                );
                probe.observe(&step)?;
            }
            None => staircase.skip(),
        }
    }
    let outcome = StaircaseOutcome {
        tilt: staircase.tilt(),
        reversals: staircase.reversals(),
        trials: staircase.trials(),
        converged: staircase.converged(),
    };
    if !outcome.converged {
        warn!(
            trials = outcome.trials,
            reversals = outcome.reversals,
            "staircase stopped at its trial budget"
        );
    }
    Ok(outcome)
}

/// Runs the descending then the ascending staircase.
pub fn calibrate<P: DiscriminationProbe>(
    probe: &mut P,
    config: &StaircaseConfig,
) -> Result<CalibrationResult> {
    let descending = run_staircase(probe, Staircase::descending(0, config))?;
    let ascending = run_staircase(probe, Staircase::ascending(1, config))?;
    let result = CalibrationResult {
        descending,
        ascending,
    };
    info!(tilt = result.tilt(), "tilt calibrated");
    Ok(result)
}
