//! Symmetry checks for square matrices
//!
//! Undirected interaction graphs must have a symmetric adjacency. The defect is
//! reported together with the offending entry so a broken input can be located.

use ndarray::ArrayView2;

/// Largest asymmetry of a matrix and where it occurs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryDefect {
    /// `max |A[i,j] - A[j,i]|` over `i <= j`; infinite for non-square input
    pub max_abs: f64,
    /// `(i, j)` achieving the maximum, `None` for non-square or empty input
    pub index: Option<(usize, usize)>,
}

/// Maximum of `|A[i,j] - A[j,i]|` over the upper triangle including the diagonal
pub fn symmetry_defect(a: ArrayView2<'_, f64>) -> SymmetryDefect {
    let (rows, cols) = a.dim();
    if rows != cols {
        return SymmetryDefect {
            max_abs: f64::INFINITY,
            index: None,
        };
    }
    if rows == 0 {
        return SymmetryDefect {
            max_abs: 0.0,
            index: None,
        };
    }

    let mut max_abs = 0.0_f64;
    let mut index = (0, 0);
    for i in 0..rows {
        for j in i..cols {
            let d = (a[[i, j]] - a[[j, i]]).abs();
            // NaN entries count as maximally asymmetric
            if d > max_abs || d.is_nan() {
                max_abs = if d.is_nan() { f64::INFINITY } else { d };
                index = (i, j);
            }
        }
    }

    SymmetryDefect {
        max_abs,
        index: Some(index),
    }
}

pub fn is_symmetric(a: ArrayView2<'_, f64>, tol: f64) -> bool {
    symmetry_defect(a).max_abs <= tol
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn symmetric_matrix_has_zero_defect() {
        let a = array![[0.0, 1.0, 2.0], [1.0, 0.0, 3.0], [2.0, 3.0, 5.0]];
        let d = symmetry_defect(a.view());
        assert_eq!(d.max_abs, 0.0);
        assert_eq!(d.index, Some((0, 0)));
        assert!(is_symmetric(a.view(), 0.0));
    }

    #[test]
    fn reports_largest_offending_pair() {
        let a = array![[0.0, 1.0, 2.0], [1.5, 0.0, 3.0], [2.0, 0.0, 5.0]];
        let d = symmetry_defect(a.view());
        assert_eq!(d.max_abs, 3.0);
        assert_eq!(d.index, Some((1, 2)));
        assert!(!is_symmetric(a.view(), 1.0));
        assert!(is_symmetric(a.view(), 3.0));
    }

    #[test]
    fn non_square_is_infinite() {
        let a = Array2::<f64>::zeros((2, 3));
        let d = symmetry_defect(a.view());
        assert!(d.max_abs.is_infinite());
        assert_eq!(d.index, None);
        assert!(!is_symmetric(a.view(), 1e9));
    }

    #[test]
    fn empty_matrix_is_symmetric() {
        let a = Array2::<f64>::zeros((0, 0));
        let d = symmetry_defect(a.view());
        assert_eq!(d.max_abs, 0.0);
        assert_eq!(d.index, None);
    }

    #[test]
    fn nan_entry_breaks_symmetry() {
        let a = array![[0.0, f64::NAN], [1.0, 0.0]];
        let d = symmetry_defect(a.view());
        assert!(d.max_abs.is_infinite());
        assert_eq!(d.index, Some((0, 1)));
    }
}
