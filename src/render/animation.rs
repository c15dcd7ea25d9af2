//! Frame-stepping movie driver
//!
//! Steps through the snapshots of a run with a fixed stride. At every frame the
//! observables are recomputed and one panel is drawn, captioned with the
//! snapshot time. Frames are rendered in parallel in bounded chunks and handed
//! to the encoder in order, so memory stays flat for long runs.

use crate::config::{BinningConfig, MovieConfig, RenderConfig};
use crate::errors::{OpinionVisError, Result};
use crate::numerics::binning::finite_range;
use crate::numerics::{HexBinning, Histogram};
use crate::observables::{frame_observables, Observables};
use crate::render::figures::{
    graph_figure, heatmap_figure, hexbin_figure, histogram_figure, FigureStyle,
};
use crate::render::layout::{circular_layout, spring_layout};
use crate::run_io::{check_frame, Run};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbImage};
use ndarray::s;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SPRING_ITERATIONS: usize = 100;

/// What each movie frame shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MovieKind {
    /// Opinion histogram (micro) or density curve (meanfield)
    Density,
    /// Edge-pair hexbin (micro) or joint density heatmap (meanfield)
    Joint,
    /// Graph layout with nodes colored by opinion (micro only)
    Graph,
}

/// Where the frames go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieOutput {
    /// Animated GIF, looping forever
    Gif(PathBuf),
    /// Directory of `frame_00000.png`, `frame_00001.png`, ...
    PngSequence(PathBuf),
}

impl MovieOutput {
    /// `.gif` paths become GIFs, anything else a PNG directory
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let is_gif = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"));
        if is_gif {
            MovieOutput::Gif(path.to_path_buf())
        } else {
            MovieOutput::PngSequence(path.to_path_buf())
        }
    }
}

/// Snapshot index and observables of one rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovieFrame {
    pub index: usize,
    pub observables: Observables,
}

#[derive(Debug, Clone)]
pub struct MovieSummary {
    pub frames: Vec<MovieFrame>,
    pub output: MovieOutput,
}

/// Renders a run snapshot by snapshot into a movie
pub struct MovieDriver<'a> {
    run: &'a Run,
    kind: MovieKind,
    style: FigureStyle,
    movie: MovieConfig,
    binning: BinningConfig,
    /// Opinion range over the whole run, so axes stay fixed between frames
    value_range: (f64, f64),
    positions: Option<Vec<(f64, f64)>>,
}

impl<'a> MovieDriver<'a> {
    pub fn new(run: &'a Run, config: &RenderConfig, kind: MovieKind) -> Result<Self> {
        config.validate()?;
        let style = FigureStyle::from_config(&config.figure)?;

        let value_range = match run {
            Run::Micro(micro) => finite_range(micro.omega.iter()),
            Run::Meanfield(mf) => finite_range(mf.x.iter()),
        }
        .ok_or_else(|| OpinionVisError::RenderError("run has no finite opinions".to_string()))?;

        let positions = match (kind, run) {
            (MovieKind::Graph, Run::Micro(micro)) => Some(match &micro.adjacency {
                Some(a) => spring_layout(a.view(), SPRING_ITERATIONS)?,
                None => circular_layout(micro.agents()),
            }),
            (MovieKind::Graph, Run::Meanfield(_)) => {
                return Err(OpinionVisError::RenderError(
                    "graph movies need a micro run".to_string(),
                ))
            }
            (MovieKind::Joint, Run::Micro(micro)) if micro.adjacency.is_none() => {
                return Err(OpinionVisError::DatasetNotFound {
                    dataset: config.datasets.adjacency.clone(),
                })
            }
            (MovieKind::Joint, Run::Meanfield(mf)) if mf.g.is_none() => {
                return Err(OpinionVisError::DatasetNotFound {
                    dataset: config.datasets.joint_density.clone(),
                })
            }
            _ => None,
        };

        Ok(Self {
            run,
            kind,
            style,
            movie: config.movie.clone(),
            binning: config.binning.clone(),
            value_range,
            positions,
        })
    }

    /// Snapshot indices visited, honoring first/last frame and stride
    pub fn frame_indices(&self) -> Vec<usize> {
        let frames = self.run.frames();
        let last = self.movie.last_frame.map_or(frames, |l| l.min(frames));
        (self.movie.first_frame..last)
            .step_by(self.movie.stride.max(1))
            .collect()
    }

    /// Observables and image of one snapshot
    pub fn render_frame(&self, frame: usize) -> Result<(Observables, RgbImage)> {
        let observables = frame_observables(self.run, frame, self.binning.support_tol)?;
        let panel = self.panel(frame)?;
        debug!(frame, time = observables.time, p2p = observables.p2p, "rendered frame");
        Ok((observables, panel))
    }

    /// The figure for one snapshot
    pub fn panel(&self, frame: usize) -> Result<RgbImage> {
        check_frame(frame, self.run.frames())?;
        let caption = format!(
            "frame {} of {}, t = {:.3}",
            frame,
            self.run.frames(),
            self.run.steps()[frame] * self.run.dt()
        );
        match (self.kind, self.run) {
            (MovieKind::Density, Run::Micro(micro)) => {
                let hist = Histogram::new(
                    micro.opinions(frame)?.iter(),
                    self.binning.histogram_bins,
                    self.value_range,
                )?;
                histogram_figure(&self.style, &caption, &hist, None)
            }
            (MovieKind::Density, Run::Meanfield(mf)) => {
                let empty: [f64; 0] = [];
                let axis = Histogram::new(&empty, 1, self.value_range)?;
                histogram_figure(&self.style, &caption, &axis, Some((mf.x.view(), mf.density(frame)?)))
            }
            (MovieKind::Joint, Run::Micro(micro)) => {
                let pairs = micro.edge_pairs(frame)?;
                let hexbins = HexBinning::new(
                    &pairs,
                    self.binning.hexbin_gridsize,
                    self.value_range,
                    self.value_range,
                )?;
                hexbin_figure(&self.style, &caption, &hexbins)
            }
            (MovieKind::Joint, Run::Meanfield(mf)) => {
                let g = mf.g.as_ref().ok_or_else(|| OpinionVisError::DatasetNotFound {
                    dataset: "joint density".to_string(),
                })?;
                heatmap_figure(
                    &self.style,
                    &caption,
                    g.slice(s![.., .., frame]),
                    self.value_range,
                    self.value_range,
                )
            }
            (MovieKind::Graph, Run::Micro(micro)) => {
                let positions = self.positions.as_deref().unwrap_or_default();
                graph_figure(
                    &self.style,
                    &caption,
                    positions,
                    micro.adjacency.as_ref().map(|a| a.view()),
                    micro.opinions(frame)?,
                    self.value_range,
                )
            }
            (MovieKind::Graph, Run::Meanfield(_)) => Err(OpinionVisError::RenderError(
                "graph movies need a micro run".to_string(),
            )),
        }
    }

    /// Render every visited frame and write the movie
    pub fn render(&self, output: &MovieOutput) -> Result<MovieSummary> {
        let indices = self.frame_indices();
        if indices.is_empty() {
            return Err(OpinionVisError::RenderError(format!(
                "frame range {}..{:?} selects no snapshots of {}",
                self.movie.first_frame,
                self.movie.last_frame,
                self.run.frames()
            )));
        }
        info!(
            frames = indices.len(),
            kind = ?self.kind,
            threads = rayon::current_num_threads(),
            "rendering movie"
        );

        let mut sink = FrameSink::open(output, self.movie.frame_delay_ms)?;
        let mut frames = Vec::with_capacity(indices.len());
        let chunk = 2 * rayon::current_num_threads().max(1);

        for batch in indices.chunks(chunk) {
            let rendered = batch
                .par_iter()
                .map(|&frame| self.render_frame(frame))
                .collect::<Result<Vec<_>>>()?;
            for (&index, (observables, image)) in batch.iter().zip(rendered) {
                sink.push(image)?;
                frames.push(MovieFrame { index, observables });
            }
        }
        // dropping the GIF encoder writes the trailer
        drop(sink);

        info!(frames = frames.len(), output = ?output, "movie written");
        Ok(MovieSummary {
            frames,
            output: output.clone(),
        })
    }
}

/// Ordered consumer of rendered frames
enum FrameSink {
    Gif {
        encoder: GifEncoder<BufWriter<File>>,
        delay: Delay,
    },
    Png {
        dir: PathBuf,
        next: usize,
    },
}

impl FrameSink {
    fn open(output: &MovieOutput, delay_ms: u32) -> Result<Self> {
        match output {
            MovieOutput::Gif(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let mut encoder = GifEncoder::new(BufWriter::new(File::create(path)?));
                encoder.set_repeat(Repeat::Infinite)?;
                Ok(FrameSink::Gif {
                    encoder,
                    delay: Delay::from_numer_denom_ms(delay_ms, 1),
                })
            }
            MovieOutput::PngSequence(dir) => {
                fs::create_dir_all(dir)?;
                Ok(FrameSink::Png {
                    dir: dir.clone(),
                    next: 0,
                })
            }
        }
    }

    fn push(&mut self, image: RgbImage) -> Result<()> {
        match self {
            FrameSink::Gif { encoder, delay } => {
                let rgba = DynamicImage::ImageRgb8(image).into_rgba8();
                encoder.encode_frame(Frame::from_parts(rgba, 0, 0, *delay))?;
            }
            FrameSink::Png { dir, next } => {
                image.save(dir.join(format!("frame_{:05}.png", next)))?;
                *next += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetNames, RunMetadata};
    use crate::data_source::MemorySource;
    use ndarray::Array2;

    fn micro_run(frames: usize) -> Run {
        let omega = Array2::from_shape_fn((4, frames), |(i, t)| i as f64 / (1.0 + t as f64));
        let source = MemorySource::new().with_dataset("omega", omega.into_dyn());
        let metadata = RunMetadata::from_toml_str("[run]\nkind = \"micro\"\n").unwrap();
        Run::from_source(&source, metadata, &DatasetNames::default()).unwrap()
    }

    fn config() -> RenderConfig {
        let mut config = RenderConfig::default();
        config.figure.width = 240;
        config.figure.height = 180;
        config
    }

    #[test]
    fn output_kind_follows_extension() {
        assert!(matches!(MovieOutput::from_path("a/b.GIF"), MovieOutput::Gif(_)));
        assert!(matches!(MovieOutput::from_path("frames"), MovieOutput::PngSequence(_)));
        assert!(matches!(MovieOutput::from_path("x.png"), MovieOutput::PngSequence(_)));
    }

    #[test]
    fn frame_range_and_stride() {
        let run = micro_run(10);
        let mut cfg = config();
        cfg.movie.first_frame = 1;
        cfg.movie.last_frame = Some(8);
        cfg.movie.stride = 3;
        let driver = MovieDriver::new(&run, &cfg, MovieKind::Density).unwrap();
        assert_eq!(driver.frame_indices(), vec![1, 4, 7]);

        cfg.movie.last_frame = Some(100);
        let driver = MovieDriver::new(&run, &cfg, MovieKind::Density).unwrap();
        assert_eq!(driver.frame_indices(), vec![1, 4, 7]);
    }

    #[test]
    fn rendered_frames_match_figure_size() {
        let run = micro_run(3);
        let driver = MovieDriver::new(&run, &config(), MovieKind::Graph).unwrap();
        let (observables, image) = driver.render_frame(2).unwrap();
        assert_eq!(image.dimensions(), (240, 180));
        assert!((observables.p2p - 1.0).abs() < 1e-12);
        assert!(driver.panel(3).is_err());
    }

    #[test]
    fn joint_movie_needs_adjacency() {
        let run = micro_run(3);
        assert!(MovieDriver::new(&run, &config(), MovieKind::Joint).is_err());
    }
}
