use crate::error::{ExperimentError, Result};
use colorpref_core::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hues under test before the display-specific intensity tweak.
const BASE_COLORS: [Color; 6] = [
    Color::new(27, 0, 0),
    Color::new(12, 6, 0),
    Color::new(8, 8, 0),
    Color::new(0, 10, 0),
    Color::new(0, 0, 120),
    Color::new(24, 0, 24),
];
const COLOR_TWEAK: f64 = 0.3;

/// Everything that distinguishes one session variant from another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub refresh_rate: u32,
    pub output_path: PathBuf,
    pub colors: Vec<Color>,
    pub stages: StageToggles,
    pub breaking: BreakingConfig,
    pub orientation: OrientationConfig,
    pub staircase: StaircaseConfig,
    pub geometry: Geometry,
    pub assets: AssetConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_rate: 60,
            output_path: PathBuf::from("colorPrefData/session.txt"),
            colors: BASE_COLORS.iter().map(|c| c.scaled(COLOR_TWEAK)).collect(),
            stages: StageToggles::default(),
            breaking: BreakingConfig::default(),
            orientation: OrientationConfig::default(),
            staircase: StaircaseConfig::default(),
            geometry: Geometry::default(),
            assets: AssetConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_rate < 10 {
            return Err(ExperimentError::config(format!(
                "refresh rate {} Hz is below the 10 Hz mask rate",
                self.refresh_rate
            )));
        }
        if self.stages.preference && !(2..=9).contains(&self.colors.len()) {
            return Err(ExperimentError::config(format!(
                "ranking needs 2..=9 colors, got {}",
                self.colors.len()
            )));
        }
        if self.colors.len() < 2 {
            return Err(ExperimentError::config("at least two colors are required"));
        }
        if self.stages.breaking_time && self.breaking.offsets.is_empty() {
            return Err(ExperimentError::config("no probe offsets configured"));
        }
        let scale = &self.orientation.rating_scale;
        let levels = scale.levels();
        if levels == 0 || levels > 9 {
            return Err(ExperimentError::config(format!(
                "rating scale must have 1..=9 levels, got {levels}"
            )));
        }
        if scale.base as usize + levels - 1 > u8::MAX as usize {
            return Err(ExperimentError::config(format!(
                "rating scale starting at {} does not fit {levels} levels",
                scale.base
            )));
        }
        let s = &self.staircase;
        if s.step <= 0.0 || s.min_tilt <= 0.0 || s.streak == 0 || s.reversals == 0 {
            return Err(ExperimentError::config("staircase parameters must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquiluminanceMethod {
    Flicker,
    MinimumMotion,
    /// Use the ranked extremes unmodified.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageToggles {
    pub breaking_time: bool,
    pub preference: bool,
    pub equiluminance: EquiluminanceMethod,
    pub calibrate_tilt: bool,
    pub orientation: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            breaking_time: true,
            preference: true,
            equiluminance: EquiluminanceMethod::MinimumMotion,
            calibrate_tilt: true,
            orientation: true,
        }
    }
}

/// Stage-1 timing and presentation options. Durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakingConfig {
    /// Per color + offset combination.
    pub repetitions: usize,
    pub offsets: Vec<f64>,
    pub ask_location: bool,
    pub blinking: bool,
    pub ramp_in: bool,
    pub max_duration: f64,
    /// Masks stop after this; the remaining frames catch subjects who press late.
    pub mask_duration: f64,
    pub ramp_duration: f64,
    pub blink_period: f64,
    /// Upper bound (exclusive) of the random blank interval before the trial.
    pub max_fixation: f64,
}

impl Default for BreakingConfig {
    fn default() -> Self {
        Self {
            repetitions: 5,
            offsets: vec![-0.0625, 0.0625],
            ask_location: true,
            blinking: true,
            ramp_in: true,
            max_duration: 10.8,
            mask_duration: 10.0,
            ramp_duration: 6.0,
            blink_period: 0.6,
            max_fixation: 1.0,
        }
    }
}

/// Ordinal scale for "did you see the prime". Ratings are `base..base + levels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub base: u8,
    pub labels: Vec<String>,
}

impl RatingScale {
    pub fn three_level() -> Self {
        Self {
            base: 0,
            labels: vec![
                "1. Not visible".into(),
                "2. Slightly visible".into(),
                "3. Clearly visible".into(),
            ],
        }
    }

    pub fn four_level() -> Self {
        Self {
            base: 1,
            labels: vec![
                "1. No experience".into(),
                "2. Brief glimpse".into(),
                "3. Almost clear".into(),
                "4. Clear experience".into(),
            ],
        }
    }

    pub fn binary() -> Self {
        Self {
            base: 0,
            labels: vec!["No".into(), "Yes".into()],
        }
    }

    pub fn levels(&self) -> usize {
        self.labels.len()
    }

    /// Rating logged for the `index`-th option.
    pub fn rating(&self, index: usize) -> u8 {
        self.base + index as u8
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::three_level()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Per layout.
    pub repetitions: usize,
    /// Used when tilt calibration is disabled.
    pub fixed_tilt: f64,
    pub rating_scale: RatingScale,
    pub ask_locations: bool,
    pub ask_color_seen: bool,
    /// Space during the prime marks it as perceived and skips the task.
    pub prime_report: bool,
    pub prime_duration: f64,
    pub prime_period: f64,
    pub target_duration: f64,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            repetitions: 5,
            fixed_tilt: 5.0,
            rating_scale: RatingScale::default(),
            ask_locations: true,
            ask_color_seen: true,
            prime_report: false,
            prime_duration: 2.5,
            prime_period: 0.5,
            target_duration: 0.2,
        }
    }
}

/// 3-down/1-up tilt staircase. Tilts are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaircaseConfig {
    pub descending_start: f64,
    pub ascending_start: f64,
    pub step: f64,
    pub min_tilt: f64,
    pub streak: u8,
    pub reversals: u8,
    pub max_trials: usize,
    /// Ask the visibility, location and color questions on calibration
    /// trials too. Their answers are never logged.
    pub follow_up_questions: bool,
}

impl Default for StaircaseConfig {
    fn default() -> Self {
        Self {
            descending_start: 5.0,
            ascending_start: 1.0,
            step: 0.5,
            min_tilt: 0.5,
            streak: 3,
            reversals: 10,
            max_trials: 200,
            follow_up_questions: true,
        }
    }
}

/// Stereoscope layout in normalized window units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Positive for right-eye dominant subjects, negative for left-eye dominant.
    pub center_dist: f32,
    pub ypos: f32,
    /// Vertical correction of the left field for the subject's stereoscope.
    pub left_shift: f32,
    /// Vertical units; also the magnitude of the popout and target offsets.
    pub ring_radius: f64,
    pub text_size: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            center_dist: 0.4,
            ypos: 0.1,
            left_shift: 0.055,
            ring_radius: 0.12,
            text_size: 0.038,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `circ00.jpg` .. `circ09.jpg`; procedural masks otherwise.
    pub mondrian_dir: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_colors_are_tweaked() {
        let config = SessionConfig::default();
        assert_eq!(config.colors[0], Color::new(8, 0, 0));
        assert_eq!(config.colors[4], Color::new(0, 0, 36));
        config.validate().unwrap();
    }

    #[test]
    fn rating_scale_must_fit_a_byte() {
        let mut config: SessionConfig = serde_json::from_str(
            r#"{ "orientation": { "rating_scale": { "base": 255, "labels": ["a", "b"] } } }"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not fit 2 levels"));

        config.orientation.rating_scale.base = 254;
        config.validate().unwrap();
        assert_eq!(config.orientation.rating_scale.rating(1), 255);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{
                "refresh_rate": 120,
                "colors": [[10, 0, 0], [0, 10, 0], [0, 0, 10]],
                "stages": { "equiluminance": "flicker", "calibrate_tilt": false },
                "orientation": { "rating_scale": { "base": 1, "labels": ["a", "b", "c", "d"] } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.refresh_rate, 120);
        assert_eq!(config.colors.len(), 3);
        assert_eq!(config.stages.equiluminance, EquiluminanceMethod::Flicker);
        assert!(config.stages.orientation);
        assert_eq!(config.orientation.rating_scale.rating(3), 4);
        assert_eq!(config.breaking.offsets, vec![-0.0625, 0.0625]);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_unrankable_color_sets() {
        let mut config = SessionConfig::default();
        config.colors = (0..10).map(|i| Color::new(i, 0, 0)).collect();
        assert!(matches!(
            config.validate(),
            Err(ExperimentError::Config { .. })
        ));
        config.stages.preference = false;
        config.validate().unwrap();
    }
}
