//! Data source abstraction for result files
//!
//! Loaders and drivers talk to a [`DatasetReader`] rather than to a concrete
//! file, so HDF5 result files and in-memory arrays are interchangeable.
//! Absent datasets and attributes are `Ok(None)`, never errors: whether a
//! missing key matters is decided by the caller.

use crate::errors::{OpinionVisError, Result};
use ndarray::ArrayD;
use std::collections::BTreeMap;

/// Read access to the named datasets and scalar attributes of a run
pub trait DatasetReader {
    /// Names of every dataset, sorted
    fn list_datasets(&self) -> Result<Vec<String>>;

    /// Whole dataset as f64, `None` if absent
    fn read_dataset(&self, name: &str) -> Result<Option<ArrayD<f64>>>;

    /// Scalar attribute as f64, `None` if absent or not numeric
    fn read_attribute(&self, name: &str) -> Result<Option<f64>>;

    /// Like [`DatasetReader::read_dataset`] but absence is an error
    fn require_dataset(&self, name: &str) -> Result<ArrayD<f64>> {
        self.read_dataset(name)?
            .ok_or_else(|| OpinionVisError::DatasetNotFound {
                dataset: name.to_string(),
            })
    }

    fn has_dataset(&self, name: &str) -> Result<bool> {
        Ok(self.list_datasets()?.iter().any(|d| d == name))
    }
}

/// Datasets held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: BTreeMap<String, ArrayD<f64>>,
    attributes: BTreeMap<String, f64>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, name: &str, data: ArrayD<f64>) -> Self {
        self.datasets.insert(name.to_string(), data);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: f64) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

impl DatasetReader for MemorySource {
    fn list_datasets(&self) -> Result<Vec<String>> {
        Ok(self.datasets.keys().cloned().collect())
    }

    fn read_dataset(&self, name: &str) -> Result<Option<ArrayD<f64>>> {
        Ok(self.datasets.get(name).cloned())
    }

    fn read_attribute(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.attributes.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn absent_entries_are_none() {
        let source = MemorySource::new()
            .with_dataset("x", array![0.0, 1.0].into_dyn())
            .with_attribute("dt", 0.1);

        assert!(source.read_dataset("x").unwrap().is_some());
        assert!(source.read_dataset("y").unwrap().is_none());
        assert_eq!(source.read_attribute("dt").unwrap(), Some(0.1));
        assert_eq!(source.read_attribute("N").unwrap(), None);
        assert!(source.has_dataset("x").unwrap());
        assert!(matches!(
            source.require_dataset("y"),
            Err(OpinionVisError::DatasetNotFound { .. })
        ));
    }
}
