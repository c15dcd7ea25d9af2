//! Numeric helpers shared by the loaders, observables and figures
//!
//! # Organization
//!
//! - [`symmetry`]: symmetry defect of square matrices (adjacency sanity checks)
//! - [`support`]: per-column support bounds of a density
//! - [`spread`]: peak-to-peak reductions and the p2p decay rate
//! - [`graph`]: degree-weighted averages and variances over a graph
//! - [`sparse`]: CSR matrices, the block-identity operator and trapezoid weights
//! - [`binning`]: histograms and hexagonal binning

pub mod binning;
pub mod graph;
pub mod sparse;
pub mod spread;
pub mod support;
pub mod symmetry;

pub use binning::{HexBinning, Histogram};
pub use graph::{degrees, weighted_average, weighted_moments, weighted_variance};
pub use sparse::{block_identity, marginal, trapezoid_weights, CsrMatrix};
pub use spread::{compute_p2p_rate, peak2peak, peak2peak_columns};
pub use support::{find_support_bounds, DEFAULT_SUPPORT_TOL};
pub use symmetry::{is_symmetric, symmetry_defect, SymmetryDefect};
