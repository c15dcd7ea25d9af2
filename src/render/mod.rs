//! Figures and movies
//!
//! Figures are plotters charts rendered into `image::RgbImage` buffers, so
//! callers can save them or stitch them into a movie.

pub mod animation;
pub mod colormap;
pub mod figures;
pub mod layout;

pub use animation::{MovieDriver, MovieFrame, MovieKind, MovieOutput, MovieSummary};
pub use colormap::{palette, Colormap};
pub use figures::{
    graph_figure, heatmap_figure, hexbin_figure, histogram_figure, save_image,
    ComparisonFigure, FigureStyle, Series,
};
pub use layout::{circular_layout, spring_layout};
