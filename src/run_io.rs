//! Result-directory loaders and observables output
//!
//! A run directory holds a `metadata.toml` and an HDF5 (netCDF-4) data file.
//! [`Hdf5Source`] exposes the data file through [`DatasetReader`];
//! [`MicroRun`] and [`MeanfieldRun`] pull the arrays they need out of any
//! reader and validate their shapes once, so downstream code can index freely.
//! [`ObservablesWriter`] stores a computed observables series in a new file.

use crate::config::{DatasetNames, RunKind, RunMetadata};
use crate::data_source::DatasetReader;
use crate::errors::{OpinionVisError, Result};
use crate::numerics::{marginal, symmetry_defect, trapezoid_weights};
use crate::observables::Observables;
use chrono::Utc;
use ndarray::{s, Array1, Array2, Array3, ArrayD, ArrayView1, Ix1, Ix2, Ix3};
use netcdf::{AttributeValue, File};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Adjacency asymmetry above which a warning is logged
const ADJACENCY_SYMMETRY_TOL: f64 = 1e-10;

/// HDF5 / netCDF-4 data file opened for reading
///
/// Goes through netCDF-C, which reads plain HDF5 files too. Datasets written
/// without dimension scales get synthesized `phony_dim_N` dimensions; only
/// their shapes matter here. HDF5 features netCDF-4 cannot map (references,
/// compound types) are out of reach.
pub struct Hdf5Source {
    file: File,
    path: PathBuf,
}

impl Hdf5Source {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)?;
        debug!(path = %path.display(), "opened data file");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

impl DatasetReader for Hdf5Source {
    fn list_datasets(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.file.variables().map(|v| v.name()).collect();
        names.sort();
        Ok(names)
    }

    fn read_dataset(&self, name: &str) -> Result<Option<ArrayD<f64>>> {
        let var = match self.file.variable(name) {
            Some(var) => var,
            None => return Ok(None),
        };
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values = var.get_values::<f64, _>(..)?;
        debug!(dataset = name, ?shape, "read dataset");
        Ok(Some(ArrayD::from_shape_vec(shape, values)?))
    }

    fn read_attribute(&self, name: &str) -> Result<Option<f64>> {
        let attr = match self.file.attribute(name) {
            Some(attr) => attr,
            None => return Ok(None),
        };
        let value = match attr.value()? {
            AttributeValue::Double(v) => Some(v),
            AttributeValue::Float(v) => Some(f64::from(v)),
            AttributeValue::Int(v) => Some(f64::from(v)),
            AttributeValue::Short(v) => Some(f64::from(v)),
            AttributeValue::Uint(v) => Some(f64::from(v)),
            AttributeValue::Ushort(v) => Some(f64::from(v)),
            AttributeValue::Uchar(v) => Some(f64::from(v)),
            _ => None,
        };
        Ok(value)
    }
}

fn as_vector(data: ArrayD<f64>, name: &str) -> Result<Array1<f64>> {
    let ndim = data.ndim();
    data.into_dimensionality::<Ix1>()
        .map_err(|_| OpinionVisError::ShapeMismatch {
            message: format!("dataset '{}' must be 1-D, found {} dimensions", name, ndim),
        })
}

fn as_matrix(data: ArrayD<f64>, name: &str) -> Result<Array2<f64>> {
    let ndim = data.ndim();
    data.into_dimensionality::<Ix2>()
        .map_err(|_| OpinionVisError::ShapeMismatch {
            message: format!("dataset '{}' must be 2-D, found {} dimensions", name, ndim),
        })
}

fn as_cube(data: ArrayD<f64>, name: &str) -> Result<Array3<f64>> {
    let ndim = data.ndim();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| OpinionVisError::ShapeMismatch {
            message: format!("dataset '{}' must be 3-D, found {} dimensions", name, ndim),
        })
}

/// Step indices of the snapshots, `0..frames` when the file has none
fn load_steps(source: &dyn DatasetReader, name: &str, frames: usize) -> Result<Array1<f64>> {
    match source.read_dataset(name)? {
        Some(data) => {
            let steps = as_vector(data, name)?;
            if steps.len() != frames {
                return Err(OpinionVisError::ShapeMismatch {
                    message: format!(
                        "'{}' has {} entries but the run has {} snapshots",
                        name,
                        steps.len(),
                        frames
                    ),
                });
            }
            Ok(steps)
        }
        None => {
            warn!(dataset = name, "no step indices stored, using 0..{}", frames);
            Ok(Array1::from_iter((0..frames).map(|k| k as f64)))
        }
    }
}

/// Agent-based run: per-agent opinions and an optional interaction graph
#[derive(Debug, Clone)]
pub struct MicroRun {
    pub metadata: RunMetadata,
    pub dt: f64,
    pub steps: Array1<f64>,
    /// Opinions, one row per agent and one column per snapshot
    pub omega: Array2<f64>,
    pub adjacency: Option<Array2<f64>>,
}

impl MicroRun {
    pub fn from_source(
        source: &dyn DatasetReader,
        metadata: RunMetadata,
        names: &DatasetNames,
    ) -> Result<Self> {
        let omega = as_matrix(source.require_dataset(&names.omega)?, &names.omega)?;
        let (agents, frames) = omega.dim();
        let steps = load_steps(source, &names.steps, frames)?;

        let adjacency = match source.read_dataset(&names.adjacency)? {
            Some(data) => {
                let a = as_matrix(data, &names.adjacency)?;
                if a.dim() != (agents, agents) {
                    return Err(OpinionVisError::ShapeMismatch {
                        message: format!(
                            "adjacency is {}x{} but the run has {} agents",
                            a.nrows(),
                            a.ncols(),
                            agents
                        ),
                    });
                }
                let defect = symmetry_defect(a.view());
                if defect.max_abs > ADJACENCY_SYMMETRY_TOL {
                    warn!(
                        defect = defect.max_abs,
                        at = ?defect.index,
                        "adjacency is not symmetric"
                    );
                }
                Some(a)
            }
            None => None,
        };

        let dt = run_dt(&metadata, source)?;
        info!(agents, frames, graph = adjacency.is_some(), "loaded micro run");
        Ok(Self {
            metadata,
            dt,
            steps,
            omega,
            adjacency,
        })
    }

    pub fn load<P: AsRef<Path>>(dir: P, names: &DatasetNames) -> Result<Self> {
        let (source, metadata) = open_run_dir(dir.as_ref(), names)?;
        Self::from_source(&source, metadata, names)
    }

    pub fn agents(&self) -> usize {
        self.omega.nrows()
    }

    pub fn frames(&self) -> usize {
        self.omega.ncols()
    }

    pub fn times(&self) -> Array1<f64> {
        &self.steps * self.dt
    }

    /// Opinions of every agent at one snapshot
    pub fn opinions(&self, frame: usize) -> Result<ArrayView1<'_, f64>> {
        check_frame(frame, self.frames())?;
        Ok(self.omega.column(frame))
    }

    /// `(omega_i, omega_j)` for every directed edge `A[i,j] != 0` at one snapshot
    pub fn edge_pairs(&self, frame: usize) -> Result<Vec<(f64, f64)>> {
        let opinions = self.opinions(frame)?;
        let adjacency = self.adjacency.as_ref().ok_or_else(|| {
            OpinionVisError::DatasetNotFound {
                dataset: "adjacency".to_string(),
            }
        })?;
        Ok(adjacency
            .indexed_iter()
            .filter(|(_, &w)| w != 0.0)
            .map(|((i, j), _)| (opinions[i], opinions[j]))
            .collect())
    }
}

/// Continuum run: a density on an opinion grid, optionally the pair density
#[derive(Debug, Clone)]
pub struct MeanfieldRun {
    pub metadata: RunMetadata,
    pub dt: f64,
    pub steps: Array1<f64>,
    pub x: Array1<f64>,
    /// Density, one row per grid point and one column per snapshot
    pub f: Array2<f64>,
    /// Joint density `g[omega, m, frame]`
    pub g: Option<Array3<f64>>,
}

impl MeanfieldRun {
    pub fn from_source(
        source: &dyn DatasetReader,
        metadata: RunMetadata,
        names: &DatasetNames,
    ) -> Result<Self> {
        let x = as_vector(source.require_dataset(&names.grid)?, &names.grid)?;
        let f = as_matrix(source.require_dataset(&names.density)?, &names.density)?;
        if f.nrows() != x.len() {
            return Err(OpinionVisError::ShapeMismatch {
                message: format!(
                    "density has {} rows but the grid has {} points",
                    f.nrows(),
                    x.len()
                ),
            });
        }
        let frames = f.ncols();
        let steps = load_steps(source, &names.steps, frames)?;

        let g = match source.read_dataset(&names.joint_density)? {
            Some(data) => {
                let g = as_cube(data, &names.joint_density)?;
                if g.dim() != (x.len(), x.len(), frames) {
                    return Err(OpinionVisError::ShapeMismatch {
                        message: format!(
                            "joint density has shape {:?}, expected [{}, {}, {}]",
                            g.shape(),
                            x.len(),
                            x.len(),
                            frames
                        ),
                    });
                }
                Some(g)
            }
            None => None,
        };

        let dt = run_dt(&metadata, source)?;
        info!(
            grid = x.len(),
            frames,
            joint = g.is_some(),
            "loaded meanfield run"
        );
        Ok(Self {
            metadata,
            dt,
            steps,
            x,
            f,
            g,
        })
    }

    pub fn load<P: AsRef<Path>>(dir: P, names: &DatasetNames) -> Result<Self> {
        let (source, metadata) = open_run_dir(dir.as_ref(), names)?;
        Self::from_source(&source, metadata, names)
    }

    pub fn frames(&self) -> usize {
        self.f.ncols()
    }

    pub fn times(&self) -> Array1<f64> {
        &self.steps * self.dt
    }

    pub fn density(&self, frame: usize) -> Result<ArrayView1<'_, f64>> {
        check_frame(frame, self.frames())?;
        Ok(self.f.column(frame))
    }

    /// `integral g(omega, m, frame) dm` by the trapezoid rule over `x`,
    /// `None` without a joint density
    pub fn pair_marginal(&self, frame: usize) -> Result<Option<Array1<f64>>> {
        check_frame(frame, self.frames())?;
        match &self.g {
            Some(g) => {
                let weights = trapezoid_weights(self.x.view());
                Ok(Some(marginal(g.slice(s![.., .., frame]), weights.view())?))
            }
            None => Ok(None),
        }
    }
}

/// Either kind of run
#[derive(Debug, Clone)]
pub enum Run {
    Micro(MicroRun),
    Meanfield(MeanfieldRun),
}

impl Run {
    /// Load a run directory, dispatching on `run.kind` or on which datasets exist
    pub fn load<P: AsRef<Path>>(dir: P, names: &DatasetNames) -> Result<Self> {
        let (source, metadata) = open_run_dir(dir.as_ref(), names)?;
        Self::from_source(&source, metadata, names)
    }

    pub fn from_source(
        source: &dyn DatasetReader,
        metadata: RunMetadata,
        names: &DatasetNames,
    ) -> Result<Self> {
        let kind = match metadata.kind() {
            Some(kind) => kind,
            None if source.has_dataset(&names.omega)? => RunKind::Micro,
            None if source.has_dataset(&names.density)? => RunKind::Meanfield,
            None => {
                return Err(OpinionVisError::DatasetNotFound {
                    dataset: format!("{} or {}", names.omega, names.density),
                })
            }
        };
        match kind {
            RunKind::Micro => Ok(Run::Micro(MicroRun::from_source(source, metadata, names)?)),
            RunKind::Meanfield => Ok(Run::Meanfield(MeanfieldRun::from_source(
                source, metadata, names,
            )?)),
        }
    }

    pub fn kind(&self) -> RunKind {
        match self {
            Run::Micro(_) => RunKind::Micro,
            Run::Meanfield(_) => RunKind::Meanfield,
        }
    }

    pub fn metadata(&self) -> &RunMetadata {
        match self {
            Run::Micro(run) => &run.metadata,
            Run::Meanfield(run) => &run.metadata,
        }
    }

    pub fn frames(&self) -> usize {
        match self {
            Run::Micro(run) => run.frames(),
            Run::Meanfield(run) => run.frames(),
        }
    }

    pub fn dt(&self) -> f64 {
        match self {
            Run::Micro(run) => run.dt,
            Run::Meanfield(run) => run.dt,
        }
    }

    pub fn steps(&self) -> &Array1<f64> {
        match self {
            Run::Micro(run) => &run.steps,
            Run::Meanfield(run) => &run.steps,
        }
    }

    pub fn times(&self) -> Array1<f64> {
        self.steps() * self.dt()
    }
}

/// `run.dt` from the metadata, else a `dt` attribute of the data file, else 1.0
fn run_dt(metadata: &RunMetadata, source: &dyn DatasetReader) -> Result<f64> {
    if metadata.get_f64("run.dt").is_none() {
        if let Some(dt) = source.read_attribute("dt")? {
            debug!(dt, "time step taken from data file attribute");
            return Ok(dt);
        }
    }
    Ok(metadata.dt())
}

pub(crate) fn check_frame(frame: usize, frames: usize) -> Result<()> {
    if frame >= frames {
        return Err(OpinionVisError::NumericsError(format!(
            "frame {} out of range for {} snapshots",
            frame, frames
        )));
    }
    Ok(())
}

/// Open the data file of a run directory and read its metadata
pub fn open_run_dir(dir: &Path, names: &DatasetNames) -> Result<(Hdf5Source, RunMetadata)> {
    let meta_path = dir.join(&names.metadata_file);
    let metadata = if meta_path.exists() {
        RunMetadata::load(&meta_path)?
    } else {
        warn!(path = %meta_path.display(), "run has no metadata file");
        RunMetadata::default()
    };
    let source = Hdf5Source::open(dir.join(&names.data_file))?;
    Ok((source, metadata))
}

/// Writes an observables series to a new netCDF-4 file
pub struct ObservablesWriter<'a> {
    output_path: &'a Path,
}

impl<'a> ObservablesWriter<'a> {
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// One variable per observable along a shared `time` dimension.
    ///
    /// Missing support bounds are stored as NaN.
    pub fn write(&self, series: &[Observables], source: &str) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = netcdf::create(self.output_path)?;
        file.add_dimension("time", series.len())?;

        let columns: [(&str, Vec<f64>); 6] = [
            ("time", series.iter().map(|o| o.time).collect()),
            ("mean", series.iter().map(|o| o.mean).collect()),
            ("variance", series.iter().map(|o| o.variance).collect()),
            ("p2p", series.iter().map(|o| o.p2p).collect()),
            (
                "support_lo",
                series
                    .iter()
                    .map(|o| o.support.map_or(f64::NAN, |s| s.0))
                    .collect(),
            ),
            (
                "support_hi",
                series
                    .iter()
                    .map(|o| o.support.map_or(f64::NAN, |s| s.1))
                    .collect(),
            ),
        ];

        for (name, values) in &columns {
            let mut var = file.add_variable::<f64>(name, &["time"])?;
            var.put(ArrayView1::from(values.as_slice()), ..)?;
        }

        file.add_attribute("source", source)?;
        file.add_attribute(
            "history",
            format!("Created by opinion_vis on {}", Utc::now().to_rfc3339()),
        )?;

        info!(path = %self.output_path.display(), snapshots = series.len(), "wrote observables");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::MemorySource;
    use ndarray::{array, Array2};

    fn names() -> DatasetNames {
        DatasetNames::default()
    }

    #[test]
    fn micro_shapes_are_validated() {
        let omega = Array2::<f64>::zeros((3, 4)).into_dyn();
        let source = MemorySource::new()
            .with_dataset("omega", omega.clone())
            .with_dataset("A", Array2::<f64>::zeros((2, 2)).into_dyn());
        assert!(matches!(
            MicroRun::from_source(&source, RunMetadata::default(), &names()),
            Err(OpinionVisError::ShapeMismatch { .. })
        ));

        let source = MemorySource::new()
            .with_dataset("omega", omega)
            .with_dataset("i", array![0.0, 1.0].into_dyn());
        assert!(MicroRun::from_source(&source, RunMetadata::default(), &names()).is_err());
    }

    #[test]
    fn dt_falls_back_to_file_attribute() {
        let source = MemorySource::new()
            .with_dataset("omega", Array2::<f64>::zeros((2, 3)).into_dyn())
            .with_attribute("dt", 0.25);
        let run = MicroRun::from_source(&source, RunMetadata::default(), &names()).unwrap();
        assert_eq!(run.dt, 0.25);
        assert_eq!(run.times().to_vec(), vec![0.0, 0.25, 0.5]);

        let metadata = RunMetadata::from_toml_str("[run]\ndt = 2\n").unwrap();
        let run = MicroRun::from_source(&source, metadata, &names()).unwrap();
        assert_eq!(run.dt, 2.0);
    }

    #[test]
    fn kind_is_inferred_from_datasets() {
        let source = MemorySource::new()
            .with_dataset("x", array![0.0, 0.5, 1.0].into_dyn())
            .with_dataset("f", Array2::<f64>::ones((3, 2)).into_dyn());
        let run = Run::from_source(&source, RunMetadata::default(), &names()).unwrap();
        assert_eq!(run.kind(), RunKind::Meanfield);
        assert_eq!(run.frames(), 2);

        let empty = MemorySource::new();
        assert!(matches!(
            Run::from_source(&empty, RunMetadata::default(), &names()),
            Err(OpinionVisError::DatasetNotFound { .. })
        ));
    }

    #[test]
    fn joint_density_marginal() {
        let f = Array2::<f64>::ones((3, 1));
        let g = ndarray::Array3::from_shape_fn((3, 3, 1), |(a, _, _)| a as f64);
        let source = MemorySource::new()
            .with_dataset("x", array![0.0, 0.5, 1.0].into_dyn())
            .with_dataset("f", f.into_dyn())
            .with_dataset("g", g.into_dyn());
        let run = MeanfieldRun::from_source(&source, RunMetadata::default(), &names()).unwrap();
        let pair = run.pair_marginal(0).unwrap().unwrap();
        assert_eq!(pair.to_vec(), vec![0.0, 1.0, 2.0]);
        assert!(run.pair_marginal(1).is_err());
    }

    #[test]
    fn joint_density_marginal_on_a_non_uniform_grid() {
        let x = array![0.0, 0.25, 1.0];
        let f = Array2::<f64>::ones((3, 1));
        // g(omega, m) = m integrates to 1/2 on [0, 1]
        let g = ndarray::Array3::from_shape_fn((3, 3, 1), |(_, m, _)| x[m]);
        let source = MemorySource::new()
            .with_dataset("x", x.clone().into_dyn())
            .with_dataset("f", f.into_dyn())
            .with_dataset("g", g.into_dyn());
        let run = MeanfieldRun::from_source(&source, RunMetadata::default(), &names()).unwrap();
        let pair = run.pair_marginal(0).unwrap().unwrap();
        assert!(pair.iter().all(|&p| (p - 0.5).abs() < 1e-12));
    }
}
