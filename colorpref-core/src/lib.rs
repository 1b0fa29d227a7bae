pub mod color;
pub mod error;
pub mod key;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use color::Color;
pub use error::ParseError;
pub use key::Key;
pub use phase::{Marker, Stage};
pub use stimulus::{DrawItem, Frame, Shape};
pub use trial::{
    BreakingLayout, BreakingRecord, BreakingTime, CALIBRATED_TILT_PREFIX, CalibrationStep,
    ColorSeen, DID_NOT_BREAK, Discrimination, EQUILUMINANCE_PREFIX, LocationsSeen, LogLine,
    OrientationLayout, OrientationOutcome, OrientationRecord, Popout, PreferenceRecord,
};
