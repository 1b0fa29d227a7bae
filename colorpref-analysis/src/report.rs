use crate::error::Result;
use crate::reader::LogContents;
use crate::stats::Summary;
use crate::summary::{
    Accuracy, MeanRank, ValidityWindow, breaking_summaries, by_cue, by_rating, mean_ranks,
    prime_reports,
};
use colorpref_core::Color;
use serde::Serialize;
use std::fmt;

/// One condition's result, or why it has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row<T> {
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Row<T> {
    fn new(condition: impl fmt::Display, result: Result<T>) -> Self {
        let (result, error) = match result {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            condition: condition.to_string(),
            result,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub window: ValidityWindow,
    pub breaking: Vec<Row<Summary>>,
    pub preferences: Vec<MeanRank>,
    pub equiluminant: Vec<Color>,
    pub calibrated_tilts: Vec<f64>,
    pub calibration_steps: usize,
    pub orientation_by_cue: Vec<Row<Accuracy>>,
    pub orientation_by_rating: Vec<Row<Accuracy>>,
    pub prime_reports: usize,
    pub skipped_lines: usize,
}

impl Report {
    pub fn build(log: &LogContents, window: ValidityWindow) -> Self {
        Self {
            window,
            breaking: breaking_summaries(&log.breaking, window)
                .into_iter()
                .map(|(color, s)| Row::new(color, s))
                .collect(),
            preferences: mean_ranks(&log.preferences),
            equiluminant: log.equiluminant.clone(),
            calibrated_tilts: log.calibrated_tilts.clone(),
            calibration_steps: log.calibration.len(),
            orientation_by_cue: by_cue(&log.orientation, window)
                .into_iter()
                .map(|(cue, a)| Row::new(cue, a))
                .collect(),
            orientation_by_rating: by_rating(&log.orientation, window)
                .into_iter()
                .map(|(rating, a)| Row::new(format!("rating {rating}"), a))
                .collect(),
            prime_reports: prime_reports(&log.orientation),
            skipped_lines: log.skipped,
        }
    }
}

fn accuracy_rows(f: &mut fmt::Formatter<'_>, rows: &[Row<Accuracy>]) -> fmt::Result {
    for row in rows {
        match (&row.result, &row.error) {
            (Some(a), _) => {
                write!(
                    f,
                    "  {:<14} {:>4}/{:<4} {:>6.1}%",
                    row.condition,
                    a.correct,
                    a.trials,
                    a.accuracy * 100.0
                )?;
                match &a.latency {
                    Some(l) => writeln!(f, "  rt {:.3}s (sd {:.3})", l.mean, l.std)?,
                    None => writeln!(f, "  rt n/a")?,
                }
            }
            (None, error) => {
                writeln!(f, "  {:<14} {}", row.condition, error.as_deref().unwrap_or(""))?
            }
        }
    }
    Ok(())
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "breaking times (valid {} < t < {} s)",
            self.window.lower, self.window.upper
        )?;
        writeln!(
            f,
            "  {:<14} {:>5} {:>8} {:>8} {:>7}",
            "color", "n", "mean", "sd", "trimmed"
        )?;
        for row in &self.breaking {
            match (&row.result, &row.error) {
                (Some(s), _) => writeln!(
                    f,
                    "  {:<14} {:>5} {:>8.3} {:>8.3} {:>7}",
                    row.condition, s.count, s.mean, s.std, s.trimmed
                )?,
                (None, error) => {
                    writeln!(f, "  {:<14} {}", row.condition, error.as_deref().unwrap_or(""))?
                }
            }
        }

        if !self.preferences.is_empty() {
            writeln!(f, "\npreference ranks (1 = favorite)")?;
            for r in &self.preferences {
                writeln!(
                    f,
                    "  {:<14} {:>6.2}  over {} ranking(s)",
                    r.color.to_string(),
                    r.mean_rank,
                    r.sessions
                )?;
            }
        }
        for color in &self.equiluminant {
            writeln!(f, "\nequiluminant color {color}")?;
        }
        for tilt in &self.calibrated_tilts {
            writeln!(f, "calibrated tilt {tilt:.3} deg")?;
        }

        if !self.orientation_by_rating.is_empty() || self.prime_reports > 0 {
            writeln!(f, "\norientation by cue")?;
            accuracy_rows(f, &self.orientation_by_cue)?;
            writeln!(f, "orientation by visibility")?;
            accuracy_rows(f, &self.orientation_by_rating)?;
            writeln!(f, "  prime reported on {} trial(s)", self.prime_reports)?;
        }

        if self.skipped_lines > 0 {
            writeln!(f, "\nskipped {} unreadable line(s)", self.skipped_lines)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "START1\n\
                       (3,6,24) -0.0625 1.5 True\n\
                       (3,6,24) 0.0625 2.5 True\n\
                       (8,0,0) 0.0625 99999 True\n\
                       END1\n";

    #[test]
    fn table_lists_every_color() {
        let report = Report::build(&LogContents::parse(LOG), ValidityWindow::default());
        let text = report.to_string();
        assert!(text.contains("(3,6,24)"));
        assert!(text.contains("2.000"));
        assert!(text.contains("insufficient data for (8,0,0)"));
        assert!(!text.contains("orientation by cue"));
    }

    #[test]
    fn json_omits_the_missing_side() {
        let report = Report::build(&LogContents::parse(LOG), ValidityWindow::default());
        let json = serde_json::to_value(&report).unwrap();
        let rows = json["breaking"].as_array().unwrap();
        assert_eq!(rows[0]["result"]["mean"], 2.0);
        assert!(rows[0].get("error").is_none());
        assert!(rows[1].get("result").is_none());
        assert_eq!(rows[1]["condition"], "(8,0,0)");
    }
}
