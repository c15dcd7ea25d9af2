//! Run metadata and render configuration
//!
//! [`RunMetadata`] wraps the `metadata.toml` written next to every result file.
//! Lookups use dotted keys (`"run.dt"`) and return `None` for absent keys so
//! callers decide their own fallbacks. [`RenderConfig`] holds figure, movie and
//! binning settings, every field defaulted so a partial file is enough.

use crate::errors::{OpinionVisError, Result};
use crate::numerics::DEFAULT_SUPPORT_TOL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Which simulation produced a run directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// Agent-based run: per-agent opinions plus a graph adjacency
    Micro,
    /// Continuum run: a density over the opinion variable
    Meanfield,
}

impl RunKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "micro" | "microscopic" | "agent" => Some(RunKind::Micro),
            "meanfield" | "mean-field" | "mean_field" | "pde" => Some(RunKind::Meanfield),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RunKind::Micro => "micro",
            RunKind::Meanfield => "meanfield",
        }
    }
}

/// Parsed `metadata.toml` of a run directory
#[derive(Debug, Clone, Default)]
pub struct RunMetadata {
    table: toml::Table,
}

impl RunMetadata {
    /// Read and parse a metadata file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        Ok(Self { table })
    }

    /// Dotted-key lookup, `None` when any segment is absent
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.table.get(first)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// Numeric lookup accepting both TOML floats and integers
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            toml::Value::Float(v) => Some(*v),
            toml::Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key)?
            .as_integer()
            .and_then(|v| usize::try_from(v).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Declared run kind, if the metadata names one
    pub fn kind(&self) -> Option<RunKind> {
        self.get_str("run.kind").and_then(RunKind::parse)
    }

    /// Simulation time step, 1.0 when the metadata does not record it
    pub fn dt(&self) -> f64 {
        match self.get_f64("run.dt") {
            Some(dt) => dt,
            None => {
                warn!("metadata has no run.dt, assuming a unit time step");
                1.0
            }
        }
    }

    /// Top-level keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.table.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// File and dataset names inside a run directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetNames {
    #[serde(default = "DatasetNames::default_data_file")]
    pub data_file: String,
    #[serde(default = "DatasetNames::default_metadata_file")]
    pub metadata_file: String,
    #[serde(default = "DatasetNames::default_steps")]
    pub steps: String,
    #[serde(default = "DatasetNames::default_omega")]
    pub omega: String,
    #[serde(default = "DatasetNames::default_adjacency")]
    pub adjacency: String,
    #[serde(default = "DatasetNames::default_grid")]
    pub grid: String,
    #[serde(default = "DatasetNames::default_density")]
    pub density: String,
    #[serde(default = "DatasetNames::default_joint_density")]
    pub joint_density: String,
}

impl DatasetNames {
    fn default_data_file() -> String {
        "data.h5".to_string()
    }
    fn default_metadata_file() -> String {
        "metadata.toml".to_string()
    }
    fn default_steps() -> String {
        "i".to_string()
    }
    fn default_omega() -> String {
        "omega".to_string()
    }
    fn default_adjacency() -> String {
        "A".to_string()
    }
    fn default_grid() -> String {
        "x".to_string()
    }
    fn default_density() -> String {
        "f".to_string()
    }
    fn default_joint_density() -> String {
        "g".to_string()
    }
}

impl Default for DatasetNames {
    fn default() -> Self {
        Self {
            data_file: Self::default_data_file(),
            metadata_file: Self::default_metadata_file(),
            steps: Self::default_steps(),
            omega: Self::default_omega(),
            adjacency: Self::default_adjacency(),
            grid: Self::default_grid(),
            density: Self::default_density(),
            joint_density: Self::default_joint_density(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FigureConfig {
    #[serde(default = "FigureConfig::default_width")]
    pub width: u32,
    #[serde(default = "FigureConfig::default_height")]
    pub height: u32,
    #[serde(default = "FigureConfig::default_colormap")]
    pub colormap: String,
    #[serde(default = "FigureConfig::default_background")]
    pub background: [u8; 3],
}

impl FigureConfig {
    fn default_width() -> u32 {
        800
    }
    fn default_height() -> u32 {
        600
    }
    fn default_colormap() -> String {
        "viridis".to_string()
    }
    fn default_background() -> [u8; 3] {
        [255, 255, 255]
    }
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            colormap: Self::default_colormap(),
            background: Self::default_background(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieConfig {
    #[serde(default = "MovieConfig::default_stride")]
    pub stride: usize,
    #[serde(default = "MovieConfig::default_frame_delay_ms")]
    pub frame_delay_ms: u32,
    #[serde(default)]
    pub first_frame: usize,
    /// Exclusive; `None` runs to the last snapshot
    #[serde(default)]
    pub last_frame: Option<usize>,
}

impl MovieConfig {
    fn default_stride() -> usize {
        1
    }
    fn default_frame_delay_ms() -> u32 {
        100
    }
}

impl Default for MovieConfig {
    fn default() -> Self {
        Self {
            stride: Self::default_stride(),
            frame_delay_ms: Self::default_frame_delay_ms(),
            first_frame: 0,
            last_frame: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BinningConfig {
    #[serde(default = "BinningConfig::default_histogram_bins")]
    pub histogram_bins: usize,
    #[serde(default = "BinningConfig::default_hexbin_gridsize")]
    pub hexbin_gridsize: usize,
    #[serde(default = "BinningConfig::default_support_tol")]
    pub support_tol: f64,
}

impl BinningConfig {
    fn default_histogram_bins() -> usize {
        50
    }
    fn default_hexbin_gridsize() -> usize {
        30
    }
    fn default_support_tol() -> f64 {
        DEFAULT_SUPPORT_TOL
    }
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            histogram_bins: Self::default_histogram_bins(),
            hexbin_gridsize: Self::default_hexbin_gridsize(),
            support_tol: Self::default_support_tol(),
        }
    }
}

/// Figure, movie, binning and dataset-name settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    #[serde(default)]
    pub figure: FigureConfig,
    #[serde(default)]
    pub movie: MovieConfig,
    #[serde(default)]
    pub binning: BinningConfig,
    #[serde(default)]
    pub datasets: DatasetNames,
}

impl RenderConfig {
    /// Strict load: missing or malformed files are errors
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let cfg: RenderConfig = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults when the file is missing or unusable
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to load render config, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.figure.width < 64 || self.figure.height < 64 {
            return Err(OpinionVisError::ConfigError(format!(
                "figure size {}x{} is too small (minimum 64x64)",
                self.figure.width, self.figure.height
            )));
        }
        if self.movie.stride == 0 {
            return Err(OpinionVisError::ConfigError(
                "movie.stride must be at least 1".to_string(),
            ));
        }
        if self.binning.histogram_bins == 0 || self.binning.hexbin_gridsize == 0 {
            return Err(OpinionVisError::ConfigError(
                "binning sizes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_lookup_and_absent_keys() {
        let meta = RunMetadata::from_toml_str(
            r#"
            [run]
            kind = "micro"
            dt = 0.05
            steps = 200

            [graph]
            model = "erdos-renyi"
            "#,
        )
        .unwrap();

        assert_eq!(meta.kind(), Some(RunKind::Micro));
        assert_eq!(meta.get_f64("run.dt"), Some(0.05));
        assert_eq!(meta.get_f64("run.steps"), Some(200.0));
        assert_eq!(meta.get_usize("run.steps"), Some(200));
        assert_eq!(meta.get_str("graph.model"), Some("erdos-renyi"));
        assert!(meta.get("run.missing").is_none());
        assert!(meta.get("nope.dt").is_none());
        assert!(meta.get_f64("graph.model").is_none());
        assert_eq!(meta.keys(), vec!["graph".to_string(), "run".to_string()]);
    }

    #[test]
    fn dt_defaults_to_one() {
        let meta = RunMetadata::from_toml_str("[run]\nkind = \"meanfield\"\n").unwrap();
        assert_eq!(meta.kind(), Some(RunKind::Meanfield));
        assert_eq!(meta.dt(), 1.0);
    }

    #[test]
    fn partial_render_config_keeps_defaults() {
        let cfg: RenderConfig = toml::from_str(
            r#"
            [figure]
            width = 1024

            [movie]
            stride = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.figure.width, 1024);
        assert_eq!(cfg.figure.height, 600);
        assert_eq!(cfg.movie.stride, 5);
        assert_eq!(cfg.movie.frame_delay_ms, 100);
        assert_eq!(cfg.binning.support_tol, DEFAULT_SUPPORT_TOL);
        assert_eq!(cfg.datasets, DatasetNames::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_stride_is_rejected() {
        let mut cfg = RenderConfig::default();
        cfg.movie.stride = 0;
        assert!(matches!(
            cfg.validate(),
            Err(OpinionVisError::ConfigError(_))
        ));
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let cfg = RenderConfig::load_or_default("/definitely/not/here/render.toml");
        assert_eq!(cfg, RenderConfig::default());
    }
}
