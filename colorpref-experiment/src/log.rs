use crate::error::{ExperimentError, Result};
use colorpref_core::{Marker, Stage};
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Append-only trial log.
///
/// Markers are checked as they are written: each may appear once, in
/// canonical order, and `END` markers only close their own `START`. The
/// underlying writer is flushed on drop, so an aborted session keeps every
/// line written before the abort.
pub struct TrialLog<W: Write> {
    out: W,
    previous: Option<Marker>,
    open: Option<Marker>,
    lines: usize,
}

impl TrialLog<BufWriter<File>> {
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "opened trial log");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TrialLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            previous: None,
            open: None,
            lines: 0,
        }
    }

    pub fn record(&mut self, record: &impl Display) -> Result<()> {
        writeln!(self.out, "{record}")?;
        self.lines += 1;
        Ok(())
    }

    pub fn marker(&mut self, marker: Marker) -> Result<()> {
        let out_of_order = ExperimentError::MarkerOrder {
            marker,
            previous: self.previous,
        };
        if self.previous.is_some_and(|p| p >= marker) {
            return Err(out_of_order);
        }
        match marker.opening() {
            Some(start) if self.open != Some(start) => return Err(out_of_order),
            Some(_) => self.open = None,
            None if self.open.is_some() => return Err(out_of_order),
            None => self.open = marker.closing().map(|_| marker),
        }
        self.previous = Some(marker);
        self.record(&marker)?;
        self.out.flush()?;
        Ok(())
    }

    /// Writes the marker `stage` opens with. Stages without one write nothing.
    pub fn begin_stage(&mut self, stage: Stage) -> Result<()> {
        stage.opening_marker().map_or(Ok(()), |m| self.marker(m))
    }

    pub fn end_stage(&mut self, stage: Stage) -> Result<()> {
        stage.closing_marker().map_or(Ok(()), |m| self.marker(m))
    }

    /// Section currently open, if a `START` has not been closed yet.
    pub fn open_section(&self) -> Option<Marker> {
        self.open
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Drop for TrialLog<W> {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!(error = %e, "failed to flush trial log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(log: &TrialLog<Vec<u8>>) -> String {
        String::from_utf8(log.get_ref().clone()).unwrap()
    }

    #[test]
    fn canonical_markers_are_accepted() {
        let mut log = TrialLog::new(Vec::new());
        log.marker(Marker::Start1).unwrap();
        assert_eq!(log.open_section(), Some(Marker::Start1));
        log.record(&"(3,6,24) -0.0625 1.5 True").unwrap();
        log.marker(Marker::End1).unwrap();
        log.marker(Marker::Calib).unwrap();
        log.marker(Marker::Start2).unwrap();
        log.marker(Marker::End2).unwrap();
        assert_eq!(
            text(&log),
            "START1\n(3,6,24) -0.0625 1.5 True\nEND1\nCALIB\nSTART2\nEND2\n"
        );
        assert_eq!(log.lines(), 6);
    }

    #[test]
    fn stage_boundaries_write_their_markers() {
        let mut log = TrialLog::new(Vec::new());
        log.begin_stage(Stage::Preference).unwrap();
        log.end_stage(Stage::Preference).unwrap();
        log.begin_stage(Stage::Calibration).unwrap();
        log.end_stage(Stage::Calibration).unwrap();
        log.begin_stage(Stage::Orientation).unwrap();
        assert_eq!(log.open_section(), Some(Marker::Start2));
        log.end_stage(Stage::Orientation).unwrap();
        assert_eq!(text(&log), "CALIB\nSTART2\nEND2\n");
    }

    #[test]
    fn skipped_stages_are_fine() {
        let mut log = TrialLog::new(Vec::new());
        log.marker(Marker::Start2).unwrap();
        log.marker(Marker::End2).unwrap();
    }

    #[test]
    fn rejects_repeats_and_bad_nesting() {
        let mut log = TrialLog::new(Vec::new());
        assert!(log.marker(Marker::End1).is_err());
        log.marker(Marker::Start1).unwrap();
        assert!(log.marker(Marker::Calib).is_err());
        assert!(log.marker(Marker::Start2).is_err());
        log.marker(Marker::End1).unwrap();
        assert!(log.marker(Marker::Start1).is_err());
        assert!(log.marker(Marker::End1).is_err());
        assert_eq!(text(&log), "START1\nEND1\n");
    }

    #[test]
    fn file_log_appends_and_flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("log.txt");
        {
            let mut log = TrialLog::append(&path).unwrap();
            log.record(&"first").unwrap();
        }
        {
            let mut log = TrialLog::append(&path).unwrap();
            log.record(&"second").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
