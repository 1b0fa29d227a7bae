//! Reads a colorpref trial log back and summarizes it per condition.

pub mod error;
pub mod reader;
pub mod report;
pub mod stats;
pub mod summary;

pub use error::{AnalysisError, Result};
pub use reader::LogContents;
pub use report::{Report, Row};
pub use stats::Summary;
pub use summary::{Accuracy, Cue, MeanRank, ValidityWindow};
