//! Derived observables per snapshot
//!
//! Both run kinds reduce to the same [`Observables`] record so they can be
//! plotted against each other. Micro runs use the degree-weighted center and
//! variance of the opinions. Meanfield runs use trapezoid moments of the
//! density. `p2p` is the opinion spread: max minus min for agents, support
//! width for a density.

use crate::config::RunKind;
use crate::errors::Result;
use crate::numerics::{
    compute_p2p_rate, find_support_bounds, peak2peak_columns, trapezoid_weights, weighted_moments,
};
use crate::run_io::{MeanfieldRun, MicroRun, Run};
use chrono::Utc;
use ndarray::{ArrayView1, Axis};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// Scalar summary of one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observables {
    pub time: f64,
    pub mean: f64,
    pub variance: f64,
    pub p2p: f64,
    /// Support bounds of the density, meanfield runs only
    pub support: Option<(f64, f64)>,
}

pub fn micro_observables(run: &MicroRun, frame: usize) -> Result<Observables> {
    let opinions = run.opinions(frame)?;
    let (mean, variance) = weighted_moments(opinions, run.adjacency.as_ref().map(|a| a.view()))?;
    let p2p = peak2peak_columns(opinions.insert_axis(Axis(1)))[0];

    Ok(Observables {
        time: run.steps[frame] * run.dt,
        mean,
        variance,
        p2p,
        support: None,
    })
}

/// Trapezoid rule on a possibly non-uniform grid
fn trapezoid(y: impl Iterator<Item = f64>, x: ArrayView1<'_, f64>) -> f64 {
    trapezoid_weights(x).iter().zip(y).map(|(w, v)| w * v).sum()
}

pub fn meanfield_observables(run: &MeanfieldRun, frame: usize, tol: f64) -> Result<Observables> {
    let f = run.density(frame)?;
    let x = run.x.view();

    let mass = trapezoid(f.iter().copied(), x);
    let (mean, variance) = if mass > 0.0 {
        let mean = trapezoid(f.iter().zip(x.iter()).map(|(&fi, &xi)| fi * xi), x) / mass;
        let variance = trapezoid(
            f.iter()
                .zip(x.iter())
                .map(|(&fi, &xi)| fi * (xi - mean).powi(2)),
            x,
        ) / mass;
        (mean, variance)
    } else {
        (f64::NAN, f64::NAN)
    };

    let bounds = find_support_bounds(f.insert_axis(Axis(1)), x, tol)?;
    let support = bounds[0];

    Ok(Observables {
        time: run.steps[frame] * run.dt,
        mean,
        variance,
        p2p: support.1 - support.0,
        support: Some(support),
    })
}

/// Observables of a single snapshot of either run kind
pub fn frame_observables(run: &Run, frame: usize, tol: f64) -> Result<Observables> {
    match run {
        Run::Micro(run) => micro_observables(run, frame),
        Run::Meanfield(run) => meanfield_observables(run, frame, tol),
    }
}

/// Observables of every snapshot, computed in parallel
pub fn observable_series(run: &Run, tol: f64) -> Result<Vec<Observables>> {
    let frames = run.frames();
    info!(
        frames,
        threads = rayon::current_num_threads(),
        "computing observables"
    );
    let series = (0..frames)
        .into_par_iter()
        .map(|frame| frame_observables(run, frame, tol))
        .collect::<Result<Vec<_>>>()?;
    debug!(frames = series.len(), "observables ready");
    Ok(series)
}

/// Exponential decay rate of the spread after `cutoff_time`
pub fn decay_rate(run: &Run, series: &[Observables], cutoff_time: f64) -> Result<f64> {
    let steps = run.steps().to_vec();
    let p2p: Vec<f64> = series.iter().map(|o| o.p2p).collect();
    compute_p2p_rate(&steps, &p2p, run.dt(), cutoff_time)
}

/// JSON-ready report of a run's observables
#[derive(Debug, Clone, Serialize)]
pub struct ObservablesReport {
    pub kind: RunKind,
    pub frames: usize,
    pub dt: f64,
    pub cutoff_time: Option<f64>,
    pub decay_rate: Option<f64>,
    pub generated_at: String,
    pub series: Vec<Observables>,
}

impl ObservablesReport {
    pub fn new(run: &Run, series: Vec<Observables>, cutoff_time: Option<f64>) -> Result<Self> {
        let decay_rate = match cutoff_time {
            Some(cutoff) => Some(decay_rate(run, &series, cutoff)?),
            None => None,
        };
        Ok(Self {
            kind: run.kind(),
            frames: run.frames(),
            dt: run.dt(),
            cutoff_time,
            decay_rate,
            generated_at: Utc::now().to_rfc3339(),
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetNames, RunMetadata};
    use crate::data_source::MemorySource;
    use crate::numerics::DEFAULT_SUPPORT_TOL;
    use ndarray::{array, Array1, Array2};

    fn metadata(kind: &str, dt: f64) -> RunMetadata {
        RunMetadata::from_toml_str(&format!("[run]\nkind = \"{}\"\ndt = {}\n", kind, dt)).unwrap()
    }

    #[test]
    fn micro_snapshot() {
        let source = MemorySource::new()
            .with_dataset("omega", array![[-1.0, 0.0], [0.0, 0.0], [1.0, 0.5]].into_dyn())
            .with_dataset("i", array![0.0, 10.0].into_dyn());
        let run = MicroRun::from_source(&source, metadata("micro", 0.5), &DatasetNames::default())
            .unwrap();

        let o = micro_observables(&run, 0).unwrap();
        assert_eq!(o.time, 0.0);
        assert_eq!(o.mean, 0.0);
        assert_eq!(o.variance, 1.0);
        assert_eq!(o.p2p, 2.0);
        assert!(o.support.is_none());

        let o = micro_observables(&run, 1).unwrap();
        assert_eq!(o.time, 5.0);
        assert_eq!(o.p2p, 0.5);

        assert!(micro_observables(&run, 2).is_err());
    }

    #[test]
    fn meanfield_moments_of_uniform_density() {
        let x = Array1::linspace(-1.0, 1.0, 201);
        let mut f = Array2::<f64>::zeros((201, 1));
        for (k, &xi) in x.iter().enumerate() {
            if (0.0..=0.5).contains(&xi) {
                f[[k, 0]] = 2.0;
            }
        }
        let source = MemorySource::new()
            .with_dataset("x", x.into_dyn())
            .with_dataset("f", f.into_dyn());
        let run =
            MeanfieldRun::from_source(&source, metadata("meanfield", 1.0), &DatasetNames::default())
                .unwrap();

        let o = meanfield_observables(&run, 0, DEFAULT_SUPPORT_TOL).unwrap();
        assert!((o.mean - 0.25).abs() < 1e-2);
        assert!((o.variance - 0.25f64.powi(2) / 3.0).abs() < 5e-3);
        let (lo, hi) = o.support.unwrap();
        assert!(lo.abs() < 1e-12);
        assert!((hi - 0.5).abs() < 1e-12);
        assert!((o.p2p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn series_and_rate() {
        let dt = 0.1;
        let lambda = 0.3;
        let frames = 30;
        let steps: Vec<f64> = (0..frames).map(|k| (k * 5) as f64).collect();
        let omega = Array2::from_shape_fn((4, frames), |(agent, frame)| {
            let spread = (-lambda * steps[frame] * dt).exp();
            (agent as f64 - 1.5) * spread
        });
        let source = MemorySource::new()
            .with_dataset("omega", omega.into_dyn())
            .with_dataset("i", Array1::from(steps).into_dyn());
        let run = Run::from_source(&source, metadata("micro", dt), &DatasetNames::default())
            .unwrap();

        let series = observable_series(&run, DEFAULT_SUPPORT_TOL).unwrap();
        assert_eq!(series.len(), frames);
        assert!(series.windows(2).all(|w| w[1].p2p < w[0].p2p));

        let rate = decay_rate(&run, &series, 5.0).unwrap();
        assert!((rate - lambda).abs() < 1e-9);

        let report = ObservablesReport::new(&run, series, Some(5.0)).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"kind\":\"micro\""));
        assert!(json.contains("\"decay_rate\""));
    }
}
