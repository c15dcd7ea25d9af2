//! Compressed sparse row matrices and the block-identity operator
//!
//! `[I_n I_n ... I_n]` applied to a column-major flattened `n x n` joint density
//! sums over the second variable, which is how [`marginal`] integrates
//! `g(omega, m)` over `m` once each column carries its quadrature weight.

use crate::errors::{OpinionVisError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Sparse matrix in CSR layout
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// Build from raw CSR parts, checking they describe a valid matrix
    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self> {
        if indptr.len() != nrows + 1 || indptr.first() != Some(&0) {
            return Err(OpinionVisError::NumericsError(format!(
                "indptr must have {} entries starting at 0",
                nrows + 1
            )));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) || indptr[nrows] != indices.len() {
            return Err(OpinionVisError::NumericsError(
                "indptr must be non-decreasing and end at nnz".to_string(),
            ));
        }
        if indices.len() != data.len() {
            return Err(OpinionVisError::NumericsError(format!(
                "{} column indices but {} values",
                indices.len(),
                data.len()
            )));
        }
        if let Some(&col) = indices.iter().find(|&&c| c >= ncols) {
            return Err(OpinionVisError::NumericsError(format!(
                "column index {} out of bounds for {} columns",
                col, ncols
            )));
        }
        Ok(Self {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// `y = M x`
    pub fn mul_vec(&self, x: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if x.len() != self.ncols {
            return Err(OpinionVisError::ShapeMismatch {
                message: format!(
                    "vector of length {} cannot multiply a {}x{} matrix",
                    x.len(),
                    self.nrows,
                    self.ncols
                ),
            });
        }
        let y = (0..self.nrows)
            .map(|row| {
                let span = self.indptr[row]..self.indptr[row + 1];
                self.indices[span.clone()]
                    .iter()
                    .zip(&self.data[span])
                    .map(|(&col, &v)| v * x[col])
                    .sum()
            })
            .collect();
        Ok(y)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.nrows, self.ncols));
        for row in 0..self.nrows {
            for k in self.indptr[row]..self.indptr[row + 1] {
                dense[[row, self.indices[k]]] += self.data[k];
            }
        }
        dense
    }
}

/// `[I_n I_n ... I_n]` with `repeats` identity blocks side by side
pub fn block_identity(n: usize, repeats: usize) -> CsrMatrix {
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(n * repeats);
    indptr.push(0);
    for row in 0..n {
        indices.extend((0..repeats).map(|block| block * n + row));
        indptr.push(indices.len());
    }
    let data = vec![1.0; indices.len()];
    CsrMatrix {
        nrows: n,
        ncols: n * repeats,
        indptr,
        indices,
        data,
    }
}

/// Trapezoid weights on a possibly non-uniform grid, so that
/// `weights.dot(y)` integrates samples `y` over `x`. Fewer than two points
/// span no interval and get zero weight.
pub fn trapezoid_weights(x: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut weights = Array1::zeros(x.len());
    for k in 1..x.len() {
        let half = 0.5 * (x[k] - x[k - 1]);
        weights[k - 1] += half;
        weights[k] += half;
    }
    weights
}

/// `integral g(omega, m) dm`, with `weights[m]` the quadrature weight of
/// grid point `m` (see [`trapezoid_weights`])
pub fn marginal(g: ArrayView2<'_, f64>, weights: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
    let (n, m) = g.dim();
    if n != m {
        return Err(OpinionVisError::ShapeMismatch {
            message: format!("joint density must be square, got {}x{}", n, m),
        });
    }
    if weights.len() != m {
        return Err(OpinionVisError::ShapeMismatch {
            message: format!("{} quadrature weights for a {}x{} joint density", weights.len(), n, m),
        });
    }
    let weighted = &g * &weights;
    // column-major flattening: index = omega + m * n
    let flat: Array1<f64> = weighted.t().iter().cloned().collect();
    block_identity(n, n).mul_vec(flat.view())
}
