//! Peak-to-peak reductions and the exponential decay rate of the spread
//!
//! Reductions follow the same conventions as the axis folds used elsewhere in
//! the crate: non-finite values are skipped and a slice without any finite
//! value reduces to NaN.

use crate::errors::{OpinionVisError, Result};
use ndarray::{Array1, ArrayD, ArrayView2, Axis};

/// Max minus min over the given axes, one value per remaining slice.
///
/// Reducing over every axis yields a 0-dimensional array.
///
/// # Errors
///
/// Returns an error if an axis is out of bounds or listed twice.
pub fn peak2peak(v: &ArrayD<f64>, axes: &[usize]) -> Result<ArrayD<f64>> {
    let mut sorted = axes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != axes.len() {
        return Err(OpinionVisError::NumericsError(format!(
            "axes {:?} contain duplicates",
            axes
        )));
    }
    if let Some(&bad) = sorted.iter().find(|&&a| a >= v.ndim()) {
        return Err(OpinionVisError::NumericsError(format!(
            "Axis {} is out of bounds for array with {} dimensions",
            bad,
            v.ndim()
        )));
    }

    // Highest axis first so the remaining indices stay valid
    let mut min = v.clone();
    let mut max = v.clone();
    for &axis in sorted.iter().rev() {
        min = min.fold_axis(Axis(axis), f64::INFINITY, |&acc, &x| {
            if x.is_finite() {
                acc.min(x)
            } else {
                acc
            }
        });
        max = max.fold_axis(Axis(axis), f64::NEG_INFINITY, |&acc, &x| {
            if x.is_finite() {
                acc.max(x)
            } else {
                acc
            }
        });
    }

    let mut out = max;
    out.zip_mut_with(&min, |hi, &lo| {
        *hi = if hi.is_finite() && lo.is_finite() {
            *hi - lo
        } else {
            f64::NAN
        };
    });
    Ok(out)
}

/// Per-column spread of a matrix (reduction over the rows)
pub fn peak2peak_columns(a: ArrayView2<'_, f64>) -> Array1<f64> {
    a.axis_iter(Axis(1))
        .map(|column| {
            let (lo, hi) = column
                .iter()
                .filter(|x| x.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                    (lo.min(x), hi.max(x))
                });
            if lo.is_finite() {
                hi - lo
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Exponential decay rate of a peak-to-peak series.
///
/// `steps` are snapshot step indices on the time axis `steps * dt`. The first
/// sample at or after `cutoff_time` is compared against the initial spread:
/// `-ln(p2p[idx] / p2p[0]) / (dt * steps[idx])`.
///
/// # Errors
///
/// Returns an error if:
/// - the series are empty or have different lengths
/// - no sample reaches `cutoff_time`
/// - the elapsed time at the selected sample is not positive
/// - the initial spread is not positive
pub fn compute_p2p_rate(steps: &[f64], p2p: &[f64], dt: f64, cutoff_time: f64) -> Result<f64> {
    if steps.is_empty() || steps.len() != p2p.len() {
        return Err(OpinionVisError::NumericsError(format!(
            "step and p2p series must be non-empty and equally long (got {} and {})",
            steps.len(),
            p2p.len()
        )));
    }

    let idx = steps
        .iter()
        .position(|&s| s * dt >= cutoff_time)
        .ok_or_else(|| {
            OpinionVisError::NumericsError(format!(
                "no sample reaches cutoff time {} (last time {})",
                cutoff_time,
                steps[steps.len() - 1] * dt
            ))
        })?;

    let elapsed = dt * steps[idx];
    if !(elapsed > 0.0) {
        return Err(OpinionVisError::NumericsError(format!(
            "elapsed time at sample {} is {}, cannot estimate a rate",
            idx, elapsed
        )));
    }
    if !(p2p[0] > 0.0) {
        return Err(OpinionVisError::NumericsError(format!(
            "initial peak-to-peak {} must be positive",
            p2p[0]
        )));
    }

    Ok(-(p2p[idx] / p2p[0]).ln() / elapsed)
}
