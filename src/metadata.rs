//! Result-file inspection
//!
//! Lists the datasets of a data file with their dimensions and summarizes a
//! loaded run. Both produce plain structs with `Display` impls; the CLI prints
//! them.

use crate::errors::Result;
use crate::run_io::{Hdf5Source, Run};
use std::fmt;
use tracing::info;

/// Shape information about one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub name: String,
    pub dimensions: Vec<(String, usize)>,
    pub total_elements: usize,
}

impl fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dimensions.is_empty() {
            return write!(f, "{}: scalar", self.name);
        }
        let dims: Vec<String> = self
            .dimensions
            .iter()
            .map(|(name, len)| format!("{}[{}]", name, len))
            .collect();
        write!(
            f,
            "{} ({}) = {} elements",
            self.name,
            dims.join(", "),
            self.total_elements
        )
    }
}

/// Every variable in the data file, sorted by name
pub fn describe_datasets(source: &Hdf5Source) -> Result<Vec<DatasetInfo>> {
    let mut infos: Vec<DatasetInfo> = source
        .file()
        .variables()
        .map(|var| {
            let dimensions: Vec<(String, usize)> = var
                .dimensions()
                .iter()
                .map(|d| (d.name().to_string(), d.len()))
                .collect();
            let total_elements = dimensions.iter().map(|(_, len)| len).product();
            DatasetInfo {
                name: var.name().to_string(),
                dimensions,
                total_elements,
            }
        })
        .collect();
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(infos)
}

/// Headline numbers of a loaded run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: &'static str,
    pub frames: usize,
    pub dt: f64,
    pub time_span: (f64, f64),
    /// Agents for micro runs, grid points for meanfield runs
    pub size: usize,
    pub has_pair_data: bool,
    pub metadata_keys: Vec<String>,
}

impl RunSummary {
    pub fn new(run: &Run) -> Self {
        let times = run.times();
        let time_span = match (times.iter().next(), times.iter().last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => (0.0, 0.0),
        };
        let (size, has_pair_data) = match run {
            Run::Micro(micro) => (micro.agents(), micro.adjacency.is_some()),
            Run::Meanfield(mf) => (mf.x.len(), mf.g.is_some()),
        };
        Self {
            kind: run.kind().as_str(),
            frames: run.frames(),
            dt: run.dt(),
            time_span,
            size,
            has_pair_data,
            metadata_keys: run.metadata().keys(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (size_label, pair_label) = if self.kind == "micro" {
            ("agents", "adjacency")
        } else {
            ("grid points", "joint density")
        };
        writeln!(f, "Run kind: {}", self.kind)?;
        writeln!(f, "   Snapshots: {}", self.frames)?;
        writeln!(f, "   {}: {}", size_label, self.size)?;
        writeln!(f, "   dt: {}", self.dt)?;
        writeln!(
            f,
            "   Time span: {} .. {}",
            self.time_span.0, self.time_span.1
        )?;
        writeln!(
            f,
            "   {}: {}",
            pair_label,
            if self.has_pair_data { "yes" } else { "no" }
        )?;
        if self.metadata_keys.is_empty() {
            write!(f, "   Metadata: (none)")
        } else {
            write!(f, "   Metadata tables: {}", self.metadata_keys.join(", "))
        }
    }
}

/// Log the headline numbers of a run at info level
pub fn print_run_summary(run: &Run) {
    let summary = RunSummary::new(run);
    info!(
        kind = summary.kind,
        frames = summary.frames,
        size = summary.size,
        dt = summary.dt,
        t_start = summary.time_span.0,
        t_end = summary.time_span.1,
        pair_data = summary.has_pair_data,
        "loaded run"
    );
    if !summary.metadata_keys.is_empty() {
        info!(keys = %summary.metadata_keys.join(", "), "run metadata");
    }
}
