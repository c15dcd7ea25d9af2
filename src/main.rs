//! Entry point for the opinion_vis application.
//! Handles CLI parsing, logging and configuration, and dispatches to the subcommands.

use clap::Parser;
use opinion_vis::metadata::{describe_datasets, print_run_summary, RunSummary};
use opinion_vis::numerics::binning::finite_range;
use opinion_vis::observables::ObservablesReport;
use opinion_vis::parallel::get_parallel_info;
use opinion_vis::render::{
    circular_layout, graph_figure, save_image, spring_layout, ComparisonFigure, FigureStyle,
    MovieDriver, MovieKind, MovieOutput, Series,
};
use opinion_vis::run_io::open_run_dir;
use opinion_vis::{observable_series, ObservablesWriter, OpinionVisError, RenderConfig, Run};
use std::path::Path;
use tracing::{info, Level};

mod cli;

use cli::{resolve_frame, Args, Command, FrameArgs};

const DEFAULT_CONFIG: &str = "opinion_vis.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    args.parallel_config().setup_global_pool()?;
    get_parallel_info().log_info();

    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::load_or_default(DEFAULT_CONFIG),
    };

    match args.command {
        Command::Inspect { run } => inspect(&run, &config),
        Command::Compare {
            micro,
            meanfield,
            output,
            log,
        } => compare(&micro, &meanfield, &output, log, &config),
        Command::Histogram(frame) => snapshot_panel(&frame, MovieKind::Density, &config),
        Command::Hexbin(frame) => snapshot_panel(&frame, MovieKind::Joint, &config),
        Command::Graph { frame, spring } => graph(&frame, spring, &config),
        Command::Movie { run, kind, output } => movie(&run, kind, &output, &config),
        Command::Rate { run, cutoff, json } => rate(&run, cutoff, json, &config),
        Command::Observables { run, output } => observables(&run, &output, &config),
    }
}

fn inspect(dir: &Path, config: &RenderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (source, _) = open_run_dir(dir, &config.datasets)?;
    println!("Datasets in {}:", source.path().display());
    for info in describe_datasets(&source)? {
        println!("   {}", info);
    }

    let run = Run::load(dir, &config.datasets)?;
    print_run_summary(&run);
    println!("{}", RunSummary::new(&run));
    Ok(())
}

fn compare(
    micro_dir: &Path,
    meanfield_dir: &Path,
    output: &Path,
    log_y: bool,
    config: &RenderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let tol = config.binning.support_tol;
    let micro = Run::load(micro_dir, &config.datasets)?;
    let meanfield = Run::load(meanfield_dir, &config.datasets)?;

    let mut figure = ComparisonFigure::new(FigureStyle::from_config(&config.figure)?)
        .caption("Opinion spread, micro vs meanfield")
        .axis_labels("t", "variance / p2p")
        .log_y(log_y);
    for (label, run) in [("micro", &micro), ("meanfield", &meanfield)] {
        let series = observable_series(run, tol)?;
        let times = run.times().to_vec();
        figure = figure
            .with_series(Series::new(
                &format!("{} variance", label),
                times.clone(),
                series.iter().map(|o| o.variance).collect(),
            ))
            .with_series(Series::new(
                &format!("{} p2p", label),
                times,
                series.iter().map(|o| o.p2p).collect(),
            ));
    }
    figure.save(output)?;
    println!("✅ Saved comparison to {}", output.display());
    Ok(())
}

fn snapshot_panel(
    args: &FrameArgs,
    kind: MovieKind,
    config: &RenderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let run = Run::load(&args.run, &config.datasets)?;
    let frame = resolve_frame(args.frame, run.frames())?;
    let image = MovieDriver::new(&run, config, kind)?.panel(frame)?;
    save_image(&image, &args.output)?;
    println!("✅ Saved frame {} to {}", frame, args.output.display());
    Ok(())
}

fn graph(
    args: &FrameArgs,
    spring: Option<usize>,
    config: &RenderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let micro = match Run::load(&args.run, &config.datasets)? {
        Run::Micro(micro) => micro,
        Run::Meanfield(_) => {
            return Err(OpinionVisError::RenderError("graph drawings need a micro run".to_string()).into())
        }
    };
    let frame = resolve_frame(args.frame, micro.frames())?;

    let positions = match (spring, &micro.adjacency) {
        (Some(iterations), Some(a)) => spring_layout(a.view(), iterations)?,
        _ => circular_layout(micro.agents()),
    };
    let value_range = finite_range(micro.omega.iter())
        .ok_or_else(|| OpinionVisError::RenderError("run has no finite opinions".to_string()))?;

    let image = graph_figure(
        &FigureStyle::from_config(&config.figure)?,
        &format!("frame {}, t = {:.3}", frame, micro.times()[frame]),
        &positions,
        micro.adjacency.as_ref().map(|a| a.view()),
        micro.opinions(frame)?,
        value_range,
    )?;
    save_image(&image, &args.output)?;
    println!("✅ Saved graph of frame {} to {}", frame, args.output.display());
    Ok(())
}

fn movie(
    dir: &Path,
    kind: MovieKind,
    output: &Path,
    config: &RenderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let run = Run::load(dir, &config.datasets)?;
    let summary = MovieDriver::new(&run, config, kind)?.render(&MovieOutput::from_path(output))?;
    println!(
        "✅ Saved {} frames to {}",
        summary.frames.len(),
        output.display()
    );
    Ok(())
}

fn rate(
    dir: &Path,
    cutoff: f64,
    json: bool,
    config: &RenderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let run = Run::load(dir, &config.datasets)?;
    let series = observable_series(&run, config.binning.support_tol)?;
    let report = ObservablesReport::new(&run, series, Some(cutoff))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(rate) = report.decay_rate {
        println!("{}", rate);
    }
    Ok(())
}

fn observables(
    dir: &Path,
    output: &Path,
    config: &RenderConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let run = Run::load(dir, &config.datasets)?;
    let series = observable_series(&run, config.binning.support_tol)?;
    ObservablesWriter::new(output).write(&series, &dir.display().to_string())?;
    info!(frames = series.len(), output = %output.display(), "observables written");
    println!("✅ Saved observables to {}", output.display());
    Ok(())
}
