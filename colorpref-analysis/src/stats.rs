//! Descriptive statistics over trial measurements.

use crate::error::{AnalysisError, Result};
use serde::Serialize;

/// Values further than this many standard deviations from the rest are outliers.
pub const OUTLIER_SDS: f64 = 3.0;

pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Splits `values` into (kept, removed), preserving order.
///
/// Each value is judged against the mean and standard deviation of all the
/// *other* values, so a single extreme value cannot widen its own band. With
/// fewer than three values nothing is removed, and nothing is judged against
/// others that have no spread at all.
pub fn trim_outliers(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    if values.len() < 3 {
        return (values.to_vec(), Vec::new());
    }
    let mut kept = Vec::with_capacity(values.len());
    let mut removed = Vec::new();
    let mut others = Vec::with_capacity(values.len() - 1);
    for (i, &v) in values.iter().enumerate() {
        others.clear();
        others.extend(
            values
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &x)| x),
        );
        let (Some(m), Some(sd)) = (mean(&others), std_dev(&others)) else {
            kept.push(v);
            continue;
        };
        if sd > f64::EPSILON && (v - m).abs() > OUTLIER_SDS * sd {
            removed.push(v);
        } else {
            kept.push(v);
        }
    }
    (kept, removed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    /// Values dropped by outlier trimming before `mean` and `std` were taken.
    pub trimmed: usize,
}

impl Summary {
    /// Outlier-trimmed summary of `values`, or `InsufficientData` for `condition`.
    pub fn of(values: &[f64], condition: &str) -> Result<Self> {
        let (kept, removed) = trim_outliers(values);
        match (mean(&kept), std_dev(&kept)) {
            (Some(mean), Some(std)) => Ok(Self {
                count: kept.len(),
                mean,
                std,
                trimmed: removed.len(),
            }),
            _ => Err(AnalysisError::insufficient(condition)),
        }
    }
}
