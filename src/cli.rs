//! Defines command-line interface options using `clap` for the opinion_vis application.

use clap::{Args as ClapArgs, Parser, Subcommand};
use opinion_vis::render::MovieKind;
use opinion_vis::ParallelConfig;
use std::path::PathBuf;

/// Post-process and visualize opinion-formation simulation runs
#[derive(Parser, Debug)]
#[command(
    version,
    name = "opinion_vis",
    about = "Plots, movies and observables for micro and meanfield opinion runs"
)]
pub struct Args {
    /// Render configuration (TOML). Defaults are used when absent.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use for parallel processing; 0 uses every CPU core.
    /// Defaults to Rayon's own choice.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Thread pool settings for `--threads`
    pub fn parallel_config(&self) -> ParallelConfig {
        match self.threads {
            Some(0) => ParallelConfig::all_cores(),
            Some(n) => ParallelConfig::with_threads(n),
            None => ParallelConfig::new(None),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List datasets and summarize a run directory
    Inspect {
        /// Run directory
        run: PathBuf,
    },

    /// Plot variance and spread of a micro and a meanfield run side by side
    Compare {
        /// Micro run directory
        #[arg(long)]
        micro: PathBuf,
        /// Meanfield run directory
        #[arg(long)]
        meanfield: PathBuf,
        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Logarithmic y axis
        #[arg(long)]
        log: bool,
    },

    /// Opinion histogram of one snapshot
    Histogram(FrameArgs),

    /// Edge-pair hexbin (micro) or joint density heatmap (meanfield) of one snapshot
    Hexbin(FrameArgs),

    /// Graph drawing with nodes colored by opinion
    Graph {
        #[command(flatten)]
        frame: FrameArgs,
        /// Use a spring layout with this many iterations instead of a circle
        #[arg(long)]
        spring: Option<usize>,
    },

    /// Render a movie over the snapshots of a run
    Movie {
        /// Run directory
        run: PathBuf,
        /// What each frame shows
        #[arg(short, long, value_enum, default_value_t = MovieKind::Density)]
        kind: MovieKind,
        /// `.gif` file, or a directory for a PNG sequence
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Exponential decay rate of the opinion spread after a cutoff time
    Rate {
        /// Run directory
        run: PathBuf,
        /// Cutoff time (in simulation time, steps * dt)
        #[arg(long)]
        cutoff: f64,
        /// Print a JSON report with the full observables series
        #[arg(long)]
        json: bool,
    },

    /// Write the observables series of a run to a netCDF-4 file
    Observables {
        /// Run directory
        run: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// A run directory, a snapshot index and an output image
#[derive(ClapArgs, Debug)]
pub struct FrameArgs {
    /// Run directory
    pub run: PathBuf,
    /// Snapshot index; negative values count from the end
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub frame: i64,
    /// Output PNG
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Resolve a possibly negative snapshot index against `frames`
pub fn resolve_frame(frame: i64, frames: usize) -> Result<usize, String> {
    let resolved = if frame < 0 {
        frames as i64 + frame
    } else {
        frame
    };
    if resolved < 0 || resolved >= frames as i64 {
        return Err(format!(
            "frame {} is out of range for a run with {} snapshots",
            frame, frames
        ));
    }
    Ok(resolved as usize)
}
