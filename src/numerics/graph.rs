//! Degree-weighted statistics of a node signal
//!
//! Each node is weighted by its degree `d_i = sum_j A[i,j]`, so well connected
//! agents dominate the center. The spread around that center is estimated with
//! an unweighted `N - 1` denominator. Without an adjacency every node weighs
//! the same.

use crate::errors::{OpinionVisError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// Row sums of an adjacency matrix
pub fn degrees(adjacency: ArrayView2<'_, f64>) -> Array1<f64> {
    adjacency.sum_axis(Axis(1))
}

/// `sum(s_i * d_i) / sum(d_i)`, or the plain mean without an adjacency.
///
/// # Errors
///
/// Returns an error if the signal is empty, the adjacency is not `N x N`,
/// or the total degree is zero.
pub fn weighted_average(
    signal: ArrayView1<'_, f64>,
    adjacency: Option<ArrayView2<'_, f64>>,
) -> Result<f64> {
    let n = signal.len();
    if n == 0 {
        return Err(OpinionVisError::NumericsError(
            "cannot average an empty signal".to_string(),
        ));
    }

    match adjacency {
        Some(a) => {
            if a.dim() != (n, n) {
                return Err(OpinionVisError::ShapeMismatch {
                    message: format!(
                        "adjacency is {}x{} but the signal has {} nodes",
                        a.nrows(),
                        a.ncols(),
                        n
                    ),
                });
            }
            let weights = degrees(a);
            let total = weights.sum();
            if total == 0.0 {
                return Err(OpinionVisError::NumericsError(
                    "graph has no edges, degree weights sum to zero".to_string(),
                ));
            }
            Ok(signal.dot(&weights) / total)
        }
        None => Ok(signal.sum() / n as f64),
    }
}

/// `sum((s_i - center)^2) / (N - 1)` around the degree-weighted center.
///
/// # Errors
///
/// Returns an error for fewer than two nodes, plus every error of [`weighted_average`].
pub fn weighted_variance(
    signal: ArrayView1<'_, f64>,
    adjacency: Option<ArrayView2<'_, f64>>,
) -> Result<f64> {
    weighted_moments(signal, adjacency).map(|(_, variance)| variance)
}

/// Center and variance in one pass over the adjacency
pub fn weighted_moments(
    signal: ArrayView1<'_, f64>,
    adjacency: Option<ArrayView2<'_, f64>>,
) -> Result<(f64, f64)> {
    let n = signal.len();
    if n < 2 {
        return Err(OpinionVisError::NumericsError(format!(
            "variance needs at least two nodes, got {}",
            n
        )));
    }
    let center = weighted_average(signal, adjacency)?;
    let squares: f64 = signal.iter().map(|&s| (s - center).powi(2)).sum();
    Ok((center, squares / (n - 1) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn degree_weighted_center() {
        // star graph: node 0 connected to 1 and 2
        let a = array![[0.0, 1.0, 1.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let s = array![1.0, 0.0, 3.0];
        assert_eq!(degrees(a.view()).to_vec(), vec![2.0, 1.0, 1.0]);

        let center = weighted_average(s.view(), Some(a.view())).unwrap();
        assert!((center - 5.0 / 4.0).abs() < 1e-12);

        let var = weighted_variance(s.view(), Some(a.view())).unwrap();
        let expected = ((1.0 - 1.25f64).powi(2) + 1.25f64.powi(2) + (3.0 - 1.25f64).powi(2)) / 2.0;
        assert!((var - expected).abs() < 1e-12);
    }

    #[test]
    fn unweighted_fallback() {
        let s = array![1.0, 2.0, 3.0, 4.0];
        let (center, var) = weighted_moments(s.view(), None).unwrap();
        assert_eq!(center, 2.5);
        assert!((var - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn regular_graph_matches_unweighted() {
        let n = 5;
        let a = Array2::from_shape_fn((n, n), |(i, j)| if i != j { 1.0 } else { 0.0 });
        let s = array![0.1, -0.3, 0.7, 0.2, 0.0];
        let weighted = weighted_moments(s.view(), Some(a.view())).unwrap();
        let plain = weighted_moments(s.view(), None).unwrap();
        assert!((weighted.0 - plain.0).abs() < 1e-12);
        assert!((weighted.1 - plain.1).abs() < 1e-12);
    }

    #[test]
    fn errors() {
        let s = array![1.0];
        assert!(weighted_variance(s.view(), None).is_err());

        let s = array![1.0, 2.0];
        let empty_graph = Array2::<f64>::zeros((2, 2));
        assert!(weighted_average(s.view(), Some(empty_graph.view())).is_err());

        let wrong = Array2::<f64>::ones((3, 3));
        assert!(matches!(
            weighted_average(s.view(), Some(wrong.view())),
            Err(OpinionVisError::ShapeMismatch { .. })
        ));
    }
}
