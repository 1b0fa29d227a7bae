//! Per-condition aggregates over parsed records.

use crate::error::{AnalysisError, Result};
use crate::stats::Summary;
use colorpref_core::{
    BreakingRecord, Color, Discrimination, OrientationOutcome, OrientationRecord,
    PreferenceRecord,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Open interval of plausible latencies, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidityWindow {
    pub lower: f64,
    pub upper: f64,
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self {
            lower: 0.1,
            upper: 10.23,
        }
    }
}

impl ValidityWindow {
    pub fn contains(&self, seconds: f64) -> bool {
        seconds > self.lower && seconds < self.upper
    }
}

/// Valid breaking times grouped by color, colors in order of first
/// appearance. A color whose trials were all filtered out keeps an empty list.
pub fn breaking_times(
    records: &[BreakingRecord],
    window: ValidityWindow,
) -> Vec<(Color, Vec<f64>)> {
    let mut groups: Vec<(Color, Vec<f64>)> = Vec::new();
    for record in records {
        let color = record.layout.color;
        let i = match groups.iter().position(|(c, _)| *c == color) {
            Some(i) => i,
            None => {
                groups.push((color, Vec::new()));
                groups.len() - 1
            }
        };
        let valid = record
            .breaking_time
            .seconds()
            .filter(|&t| record.passed == Some(true) && window.contains(t));
        if let Some(t) = valid {
            groups[i].1.push(t);
        }
    }
    groups
}

pub fn breaking_summaries(
    records: &[BreakingRecord],
    window: ValidityWindow,
) -> Vec<(Color, Result<Summary>)> {
    breaking_times(records, window)
        .into_iter()
        .map(|(color, times)| (color, Summary::of(&times, &color.to_string())))
        .collect()
}

/// Whether the popout sat in the target's half of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    Valid,
    Invalid,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cue::Valid => "valid cue",
            Cue::Invalid => "invalid cue",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accuracy {
    pub trials: usize,
    pub correct: usize,
    pub accuracy: f64,
    /// Response latency of correct trials inside the validity window.
    pub latency: Option<Summary>,
}

impl Accuracy {
    pub fn of<'a>(
        trials: impl IntoIterator<Item = &'a Discrimination>,
        window: ValidityWindow,
        condition: &str,
    ) -> Result<Self> {
        let trials: Vec<&Discrimination> = trials.into_iter().collect();
        if trials.is_empty() {
            return Err(AnalysisError::insufficient(condition));
        }
        let latencies: Vec<f64> = trials
            .iter()
            .filter(|d| d.correct && window.contains(d.response_time))
            .map(|d| d.response_time)
            .collect();
        let correct = trials.iter().filter(|d| d.correct).count();
        Ok(Self {
            trials: trials.len(),
            correct,
            accuracy: correct as f64 / trials.len() as f64,
            latency: Summary::of(&latencies, condition).ok(),
        })
    }
}

fn discriminated(
    records: &[OrientationRecord],
) -> impl Iterator<Item = (&OrientationRecord, &Discrimination)> {
    records.iter().filter_map(|r| match &r.outcome {
        OrientationOutcome::Discriminated(d) => Some((r, d)),
        OrientationOutcome::PrimeReported => None,
    })
}

/// Accuracy for valid and invalid cues. Prime-reported trials are excluded.
pub fn by_cue(
    records: &[OrientationRecord],
    window: ValidityWindow,
) -> Vec<(Cue, Result<Accuracy>)> {
    [Cue::Valid, Cue::Invalid]
        .into_iter()
        .map(|cue| {
            let trials = discriminated(records)
                .filter(|(r, _)| r.layout.is_cued() == (cue == Cue::Valid))
                .map(|(_, d)| d);
            (cue, Accuracy::of(trials, window, &cue.to_string()))
        })
        .collect()
}

/// Accuracy per visibility rating, lowest rating first.
pub fn by_rating(
    records: &[OrientationRecord],
    window: ValidityWindow,
) -> Vec<(u8, Result<Accuracy>)> {
    let mut groups: BTreeMap<u8, Vec<&Discrimination>> = BTreeMap::new();
    for (_, d) in discriminated(records) {
        groups.entry(d.visibility).or_default().push(d);
    }
    groups
        .into_iter()
        .map(|(rating, trials)| {
            let condition = format!("rating {rating}");
            (rating, Accuracy::of(trials, window, &condition))
        })
        .collect()
}

pub fn prime_reports(records: &[OrientationRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.outcome == OrientationOutcome::PrimeReported)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanRank {
    pub color: Color,
    pub sessions: usize,
    pub mean_rank: f64,
}

/// Mean rank per color over every ranking in the log, favorite first.
pub fn mean_ranks(records: &[PreferenceRecord]) -> Vec<MeanRank> {
    let mut sums: Vec<(Color, usize, u32)> = Vec::new();
    for (color, rank) in records.iter().flat_map(|r| &r.ranks) {
        match sums.iter_mut().find(|(c, _, _)| c == color) {
            Some((_, n, total)) => {
                *n += 1;
                *total += u32::from(*rank);
            }
            None => sums.push((*color, 1, u32::from(*rank))),
        }
    }
    let mut ranks: Vec<MeanRank> = sums
        .into_iter()
        .map(|(color, sessions, total)| MeanRank {
            color,
            sessions,
            mean_rank: total as f64 / sessions as f64,
        })
        .collect();
    ranks.sort_by(|a, b| a.mean_rank.total_cmp(&b.mean_rank));
    ranks
}
