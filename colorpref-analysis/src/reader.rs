//! Reads a trial log back into records.
//!
//! Sessions append to the same file, so every occurrence of a section is
//! collected. A section opened without its closing marker runs until the next
//! opening marker or the end of the file.

use crate::error::Result;
use colorpref_core::{
    BreakingRecord, CalibrationStep, Color, LogLine, Marker, OrientationRecord, PreferenceRecord,
};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Breaking,
    Calibration,
    Orientation,
}

impl Section {
    /// Section a marker opens; `None` for closing markers.
    fn opened_by(marker: Marker) -> Option<Self> {
        match marker {
            Marker::Start1 => Some(Section::Breaking),
            Marker::Calib => Some(Section::Calibration),
            Marker::Start2 => Some(Section::Orientation),
            Marker::End1 | Marker::End2 => None,
        }
    }
}

/// Everything recovered from one log file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogContents {
    pub breaking: Vec<BreakingRecord>,
    pub orientation: Vec<OrientationRecord>,
    pub calibration: Vec<CalibrationStep>,
    pub preferences: Vec<PreferenceRecord>,
    pub equiluminant: Vec<Color>,
    pub calibrated_tilts: Vec<f64>,
    /// Lines that did not parse, or parsed but sat outside their section.
    pub skipped: usize,
}

impl LogContents {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let contents = Self::parse(&text);
        debug!(
            path = %path.display(),
            breaking = contents.breaking.len(),
            orientation = contents.orientation.len(),
            skipped = contents.skipped,
            "read trial log"
        );
        Ok(contents)
    }

    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        let mut section = None;
        for (n, raw) in text.lines().enumerate() {
            let line = match raw.parse::<LogLine>() {
                Ok(line) => line,
                Err(e) => {
                    debug!(line = n + 1, error = %e, "skipping malformed line");
                    out.skipped += 1;
                    continue;
                }
            };
            let in_section = match line {
                LogLine::Blank => true,
                LogLine::Marker(marker) => {
                    section = Section::opened_by(marker);
                    true
                }
                LogLine::Breaking(record) if section == Some(Section::Breaking) => {
                    out.breaking.push(record);
                    true
                }
                LogLine::Orientation(record) if section == Some(Section::Orientation) => {
                    out.orientation.push(record);
                    true
                }
                LogLine::Calibration(step) if section == Some(Section::Calibration) => {
                    out.calibration.push(step);
                    true
                }
                LogLine::Preference(record) => {
                    out.preferences.push(record);
                    true
                }
                LogLine::Equiluminant(color) => {
                    out.equiluminant.push(color);
                    true
                }
                LogLine::CalibratedTilt(tilt) => {
                    out.calibrated_tilts.push(tilt);
                    true
                }
                _ => false,
            };
            if !in_section {
                debug!(line = n + 1, ?section, "skipping record outside its section");
                out.skipped += 1;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorpref_core::BreakingTime;

    #[test]
    fn unterminated_section_runs_to_next_start() {
        let log = "START1\n\
                   (3,6,24) -0.0625 1.5 True\n\
                   START2\n\
                   (3,6,24) 0.0625 2.5 True\n\
                   (1,-0.12,0.12,5) 0.5 True 0\n";
        let contents = LogContents::parse(log);
        assert_eq!(contents.breaking.len(), 1);
        assert_eq!(contents.orientation.len(), 1);
        assert_eq!(contents.skipped, 1);
    }

    #[test]
    fn appended_sessions_are_all_read() {
        let session = "START1\n(8,0,0) 0.0625 1.0 True\nEND1\n";
        let contents = LogContents::parse(&session.repeat(3));
        assert_eq!(contents.breaking.len(), 3);
        assert_eq!(contents.breaking[2].breaking_time, BreakingTime::Broke(1.0));
    }

    #[test]
    fn malformed_lines_are_counted_not_fatal() {
        let log = "START1\n\
                   (3,6,24) -0.0625\n\
                   garbage\n\
                   (3,6,24 -0.0625 1.5 True\n\
                   (3,6,24) -0.0625 1.5 True\n\
                   END1\n";
        let contents = LogContents::parse(log);
        assert_eq!(contents.breaking.len(), 1);
        assert_eq!(contents.skipped, 3);
    }

    #[test]
    fn stage_results_are_read_anywhere() {
        let log = "preferences: (8,0,0)1 (0,0,36)2\n\
                   equiluminantColor: (0,0,30)\n\
                   CALIB\n\
                   0 5 1 1 0\n\
                   calibratedTilt: 1.75\n";
        let contents = LogContents::parse(log);
        assert_eq!(contents.preferences.len(), 1);
        assert_eq!(contents.equiluminant, vec![Color::new(0, 0, 30)]);
        assert_eq!(contents.calibration.len(), 1);
        assert_eq!(contents.calibrated_tilts, vec![1.75]);
        assert_eq!(contents.skipped, 0);
    }
}
