pub mod breaking;
pub mod config;
pub mod equiluminance;
pub mod error;
pub mod log;
pub mod mask;
pub mod orientation;
pub mod preference;
pub mod presenter;
pub mod rig;
pub mod scene;
pub mod sequencer;
pub mod session;
pub mod sim;
pub mod staircase;

pub use config::{
    AssetConfig, BreakingConfig, EquiluminanceMethod, Geometry, OrientationConfig, RatingScale,
    SessionConfig, StageToggles, StaircaseConfig,
};
pub use error::{ExperimentError, Result};
pub use log::TrialLog;
pub use mask::{DutyCycle, MONDRIAN_COUNT, MaskSequence};
pub use orientation::TrialMode;
pub use presenter::Presenter;
pub use rig::{Keyboard, Screen};
pub use scene::Scene;
pub use sequencer::TrialOrder;
pub use session::{Session, SessionSummary};
pub use sim::{SimulatedRig, Subject};
pub use staircase::{CalibrationResult, DiscriminationProbe, Staircase, StaircaseOutcome};
