//! Support bounds of a density sampled on a grid

use crate::errors::{OpinionVisError, Result};
use ndarray::{ArrayView1, ArrayView2, Axis};

/// Threshold below which a density value counts as zero
pub const DEFAULT_SUPPORT_TOL: f64 = 1e-5;

/// For each column of `f`, the grid coordinates of the first and last row
/// with `f > tol`.
///
/// Columns with no value above `tol` report `(x[0], x[0])`.
///
/// # Errors
///
/// Returns an error if `x` is empty or its length differs from the row count of `f`.
pub fn find_support_bounds(
    f: ArrayView2<'_, f64>,
    x: ArrayView1<'_, f64>,
    tol: f64,
) -> Result<Vec<(f64, f64)>> {
    if x.is_empty() {
        return Err(OpinionVisError::NumericsError(
            "support bounds need a non-empty grid".to_string(),
        ));
    }
    if f.nrows() != x.len() {
        return Err(OpinionVisError::ShapeMismatch {
            message: format!(
                "density has {} rows but the grid has {} points",
                f.nrows(),
                x.len()
            ),
        });
    }

    let bounds = f
        .axis_iter(Axis(1))
        .map(|column| {
            let mut first = None;
            let mut last = None;
            for (row, &v) in column.iter().enumerate() {
                if v > tol {
                    first.get_or_insert(row);
                    last = Some(row);
                }
            }
            match (first, last) {
                (Some(lo), Some(hi)) => (x[lo], x[hi]),
                _ => (x[0], x[0]),
            }
        })
        .collect();

    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};

    #[test]
    fn bounds_per_column() {
        let x = array![-1.0, -0.5, 0.0, 0.5, 1.0];
        let f = array![
            [0.0, 0.0, 0.0],
            [0.2, 0.0, 0.0],
            [0.3, 1.0, 0.0],
            [0.2, 1e-6, 0.0],
            [0.0, 0.0, 0.0]
        ];
        let bounds = find_support_bounds(f.view(), x.view(), DEFAULT_SUPPORT_TOL).unwrap();
        assert_eq!(bounds, vec![(-0.5, 0.5), (0.0, 0.0), (-1.0, -1.0)]);
    }

    #[test]
    fn tolerance_is_strict() {
        let x = array![0.0, 1.0];
        let f = array![[1e-5], [2e-5]];
        let bounds = find_support_bounds(f.view(), x.view(), 1e-5).unwrap();
        assert_eq!(bounds, vec![(1.0, 1.0)]);
    }

    #[test]
    fn mismatched_grid_is_an_error() {
        let x = Array1::linspace(0.0, 1.0, 4);
        let f = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            find_support_bounds(f.view(), x.view(), DEFAULT_SUPPORT_TOL),
            Err(OpinionVisError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn empty_grid_is_an_error() {
        let x = Array1::<f64>::zeros(0);
        let f = Array2::<f64>::zeros((0, 2));
        assert!(find_support_bounds(f.view(), x.view(), DEFAULT_SUPPORT_TOL).is_err());
    }
}
