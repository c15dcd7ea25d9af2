//! opinion_vis: post-processing and visualization of opinion-formation runs
//!
//! Loads finished **micro** (agent-based) and **meanfield** (density) runs from
//! a result directory holding `metadata.toml` and an HDF5/netCDF-4 `data.h5`,
//! computes derived observables and renders figures and movies.
//!
//! ## Key Features
//!
//! - **Loaders**: typed micro and meanfield runs with shape validation
//! - **Numerics**: symmetry defect, support bounds, peak-to-peak spread,
//!   degree-weighted moments, sparse block identity and spread decay rate
//! - **Figures**: comparison line plots, histograms, hexbins, heatmaps and graph drawings
//! - **Movies**: animated GIF or PNG sequences, rendered in parallel with Rayon
//!
//! ## Module Organization
//!
//! - [`config`]: run metadata and render configuration
//! - [`data_source`]: the dataset reader seam and an in-memory source
//! - [`run_io`]: HDF5 loading and observables output
//! - [`metadata`]: dataset listing and run summaries
//! - [`numerics`]: numeric utilities
//! - [`observables`]: per-snapshot observables and decay rates
//! - [`render`]: raster figures, layouts and the movie driver
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use opinion_vis::prelude::*;
//!
//! let names = DatasetNames::default();
//! let run = Run::load("runs/micro_001", &names).unwrap();
//! let series = observable_series(&run, DEFAULT_SUPPORT_TOL).unwrap();
//! let rate = decay_rate(&run, &series, 5.0).unwrap();
//! println!("spread decays at {:.4}", rate);
//! ```

pub mod config;
pub mod data_source;
pub mod errors;
pub mod metadata;
pub mod numerics;
pub mod observables;
pub mod parallel;
pub mod render;
pub mod run_io;

pub use config::{DatasetNames, RenderConfig, RunKind, RunMetadata};
pub use data_source::{DatasetReader, MemorySource};
pub use errors::{OpinionVisError, Result};
pub use observables::{decay_rate, frame_observables, observable_series, Observables};
pub use parallel::ParallelConfig;
pub use run_io::{Hdf5Source, MeanfieldRun, MicroRun, ObservablesWriter, Run};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{DatasetNames, RenderConfig, RunKind, RunMetadata};
    pub use crate::data_source::{DatasetReader, MemorySource};
    pub use crate::errors::{OpinionVisError, Result};
    pub use crate::numerics::{
        compute_p2p_rate, find_support_bounds, peak2peak, symmetry_defect, weighted_average,
        weighted_variance, DEFAULT_SUPPORT_TOL,
    };
    pub use crate::observables::{decay_rate, observable_series, Observables};
    pub use crate::parallel::ParallelConfig;
    pub use crate::render::{ComparisonFigure, FigureStyle, MovieDriver, MovieKind, MovieOutput, Series};
    pub use crate::run_io::{Hdf5Source, MeanfieldRun, MicroRun, ObservablesWriter, Run};
}
