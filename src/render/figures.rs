//! Static figures: comparison line plots, histograms, hexbin maps, heatmaps
//! and graph drawings
//!
//! Figures are plotters charts drawn into an in-memory RGB buffer and returned
//! as an [`RgbImage`], so the movie driver can reuse them as frames from many
//! threads at once. [`save_image`] writes one to disk.

use crate::config::FigureConfig;
use crate::errors::{OpinionVisError, Result};
use crate::numerics::binning::finite_range;
use crate::numerics::{HexBinning, Histogram};
use crate::render::colormap::{palette, Colormap};
use image::RgbImage;
use ndarray::{ArrayView1, ArrayView2};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

const EDGE_COLOR: RGBColor = RGBColor(170, 170, 170);
const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);
const OVERLAY_COLOR: RGBColor = RGBColor(214, 39, 40);
const FONT: &str = "sans-serif";

/// Size, background and colormap shared by all figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureStyle {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub colormap: Colormap,
}

impl FigureStyle {
    pub fn from_config(config: &FigureConfig) -> Result<Self> {
        let colormap = Colormap::from_name(&config.colormap).ok_or_else(|| {
            OpinionVisError::ConfigError(format!("unknown colormap '{}'", config.colormap))
        })?;
        Ok(Self {
            width: config.width,
            height: config.height,
            background: config.background,
            colormap,
        })
    }

    fn background_color(&self) -> RGBColor {
        let [r, g, b] = self.background;
        RGBColor(r, g, b)
    }

    /// Chart builder with caption and margins scaled to the figure size.
    /// `axes` reserves room for tick labels and axis descriptions.
    fn chart<'a, DB: DrawingBackend>(
        &self,
        area: &'a DrawingArea<DB, Shift>,
        caption: &str,
        axes: bool,
    ) -> ChartBuilder<'a, 'static, DB> {
        let mut builder = ChartBuilder::on(area);
        builder
            .caption(caption, (FONT, (self.height / 24).clamp(10, 24)))
            .margin((self.width.min(self.height) / 40).clamp(4, 15));
        if axes {
            builder
                .x_label_area_size((self.height / 10).clamp(20, 40))
                .y_label_area_size((self.width / 10).clamp(30, 60));
        }
        builder
    }

    /// Fill the background, run `draw` on a bitmap of the figure size and
    /// hand the pixels back as an image
    fn render<F>(&self, draw: F) -> Result<RgbImage>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
    {
        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root =
                BitMapBackend::with_buffer(&mut buffer, (self.width, self.height)).into_drawing_area();
            root.fill(&self.background_color())?;
            draw(&root)?;
            root.present()?;
        }
        RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            OpinionVisError::RenderError("figure buffer does not match the figure size".to_string())
        })
    }
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: [255, 255, 255],
            colormap: Colormap::Viridis,
        }
    }
}

pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save(path.as_ref())?;
    debug!(path = %path.as_ref().display(), "saved figure");
    Ok(())
}

/// Caller-supplied axis interval that plotters can scale; a single value gets unit width
fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// One labeled line in a comparison figure
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(label: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            label: label.to_string(),
            x,
            y,
        }
    }
}

/// Several series over a shared x axis, e.g. micro vs meanfield variance
#[derive(Debug, Clone)]
pub struct ComparisonFigure {
    style: FigureStyle,
    series: Vec<Series>,
    log_y: bool,
    caption: String,
    x_desc: String,
    y_desc: String,
}

impl ComparisonFigure {
    pub fn new(style: FigureStyle) -> Self {
        Self {
            style,
            series: Vec::new(),
            log_y: false,
            caption: String::new(),
            x_desc: "t".to_string(),
            y_desc: String::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn log_y(mut self, log_y: bool) -> Self {
        self.log_y = log_y;
        self
    }

    pub fn caption(mut self, caption: &str) -> Self {
        self.caption = caption.to_string();
        self
    }

    pub fn axis_labels(mut self, x: &str, y: &str) -> Self {
        self.x_desc = x.to_string();
        self.y_desc = y.to_string();
        self
    }

    /// Runs of consecutive plottable points, y already in axis space.
    /// Non-finite values (and non-positive ones on a log axis) break the line.
    fn segments(&self, series: &Series) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (&x, &y) in series.x.iter().zip(&series.y) {
            if x.is_finite() && y.is_finite() && (!self.log_y || y > 0.0) {
                current.push((x, if self.log_y { y.log10() } else { y }));
            } else if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    pub fn render(&self) -> Result<RgbImage> {
        for s in &self.series {
            if s.x.len() != s.y.len() {
                return Err(OpinionVisError::ShapeMismatch {
                    message: format!(
                        "series '{}' has {} x values and {} y values",
                        s.label,
                        s.x.len(),
                        s.y.len()
                    ),
                });
            }
        }

        let segments: Vec<Vec<Vec<(f64, f64)>>> =
            self.series.iter().map(|s| self.segments(s)).collect();
        let points = || segments.iter().flatten().flatten();
        let (x_range, y_range) = match (
            finite_range(points().map(|p| &p.0)),
            finite_range(points().map(|p| &p.1)),
        ) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(OpinionVisError::RenderError(
                    "comparison figure has no plottable points".to_string(),
                ))
            }
        };
        // whole decades on a log axis, 5% headroom on a linear one
        let y_range = if self.log_y {
            let lo = y_range.0.floor();
            (lo, y_range.1.ceil().max(lo + 1.0))
        } else {
            let pad = 0.05 * (y_range.1 - y_range.0);
            (y_range.0 - pad, y_range.1 + pad)
        };

        let decade = |v: &f64| format!("1e{:.0}", v);
        self.style.render(|root| {
            let mut chart = self
                .style
                .chart(root, &self.caption, true)
                .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

            let mut mesh = chart.configure_mesh();
            mesh.x_desc(self.x_desc.as_str()).y_desc(self.y_desc.as_str());
            if self.log_y {
                mesh.y_label_formatter(&decade);
            }
            mesh.draw()?;

            for (k, (s, runs)) in self.series.iter().zip(&segments).enumerate() {
                let color = palette(k);
                for (r, run) in runs.iter().enumerate() {
                    let drawn = if run.len() == 1 {
                        // a lone point between gaps has no line to show it
                        chart.draw_series(run.iter().map(|&p| Circle::new(p, 2, color.filled())))?
                    } else {
                        chart.draw_series(LineSeries::new(run.iter().copied(), color.stroke_width(2)))?
                    };
                    if r == 0 {
                        drawn.label(s.label.as_str()).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                        });
                    }
                }
            }

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
            Ok(())
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_image(&self.render()?, path)
    }
}

/// Density-normalized bars, optionally overlaid with a reference curve
pub fn histogram_figure(
    style: &FigureStyle,
    caption: &str,
    hist: &Histogram,
    overlay: Option<(ArrayView1<'_, f64>, ArrayView1<'_, f64>)>,
) -> Result<RgbImage> {
    let density = hist.density();
    let mut x_range = (hist.edges[0], hist.edges[hist.bins()]);
    let mut y_max = density.iter().copied().fold(0.0, f64::max);

    if let Some((x, y)) = overlay {
        if x.len() != y.len() {
            return Err(OpinionVisError::ShapeMismatch {
                message: format!("overlay has {} x values and {} y values", x.len(), y.len()),
            });
        }
        if let Some((lo, hi)) = finite_range(x.iter()) {
            x_range = (x_range.0.min(lo), x_range.1.max(hi));
        }
        y_max = y
            .iter()
            .filter(|v| v.is_finite())
            .fold(y_max, |acc, &v| acc.max(v));
    }
    if y_max <= 0.0 {
        y_max = 1.0;
    }

    style.render(|root| {
        let mut chart = style
            .chart(root, caption, true)
            .build_cartesian_2d(x_range.0..x_range.1, 0.0..1.05 * y_max)?;
        chart
            .configure_mesh()
            .x_desc("opinion")
            .y_desc("density")
            .draw()?;

        chart.draw_series(
            density
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0.0)
                .map(|(k, &d)| {
                    Rectangle::new([(hist.edges[k], 0.0), (hist.edges[k + 1], d)], BAR_COLOR.filled())
                }),
        )?;

        if let Some((x, y)) = overlay {
            let curve: Vec<(f64, f64)> = x
                .iter()
                .zip(y.iter())
                .filter(|(a, b)| a.is_finite() && b.is_finite())
                .map(|(&a, &b)| (a, b))
                .collect();
            chart.draw_series(LineSeries::new(curve, OVERLAY_COLOR.stroke_width(2)))?;
        }
        Ok(())
    })
}

/// Hexagonal density map, cells colored by count
pub fn hexbin_figure(style: &FigureStyle, caption: &str, hexbins: &HexBinning) -> Result<RgbImage> {
    let (x_range, y_range) = (widen(hexbins.x_range), widen(hexbins.y_range));
    let max = hexbins.max_count() as f64;

    style.render(|root| {
        let mut chart = style
            .chart(root, caption, true)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("opinion of i")
            .y_desc("opinion of j")
            .draw()?;

        chart.draw_series(hexbins.cells.iter().map(|cell| {
            let color = style.colormap.map_range(cell.count as f64, 0.0, max);
            Polygon::new(hexbins.hexagon(cell.center).to_vec(), color.filled())
        }))?;
        Ok(())
    })
}

/// Matrix drawn as colored cells; row index along x, column index along y
pub fn heatmap_figure(
    style: &FigureStyle,
    caption: &str,
    matrix: ArrayView2<'_, f64>,
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> Result<RgbImage> {
    let (rows, cols) = matrix.dim();
    if rows == 0 || cols == 0 {
        return Err(OpinionVisError::RenderError(
            "cannot draw an empty heatmap".to_string(),
        ));
    }
    let (x_range, y_range) = (widen(x_range), widen(y_range));
    let (lo, hi) = finite_range(matrix.iter()).unwrap_or((0.0, 1.0));
    let dx = (x_range.1 - x_range.0) / rows as f64;
    let dy = (y_range.1 - y_range.0) / cols as f64;

    style.render(|root| {
        let mut chart = style
            .chart(root, caption, true)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("opinion")
            .y_desc("opinion")
            .draw()?;

        chart.draw_series(
            matrix
                .indexed_iter()
                .filter(|(_, v)| v.is_finite())
                .map(|((r, c), &v)| {
                    let x0 = x_range.0 + r as f64 * dx;
                    let y0 = y_range.0 + c as f64 * dy;
                    Rectangle::new(
                        [(x0, y0), (x0 + dx, y0 + dy)],
                        style.colormap.map_range(v, lo, hi).filled(),
                    )
                }),
        )?;
        Ok(())
    })
}

/// Nodes at `positions` colored by `values`, edges wherever `A[i,j] != 0`.
/// Positions are expected in `[-1, 1]^2`, as the layouts produce them.
pub fn graph_figure(
    style: &FigureStyle,
    caption: &str,
    positions: &[(f64, f64)],
    adjacency: Option<ArrayView2<'_, f64>>,
    values: ArrayView1<'_, f64>,
    value_range: (f64, f64),
) -> Result<RgbImage> {
    let n = positions.len();
    if values.len() != n {
        return Err(OpinionVisError::ShapeMismatch {
            message: format!("{} node values for {} positions", values.len(), n),
        });
    }
    if let Some(a) = adjacency {
        if a.dim() != (n, n) {
            return Err(OpinionVisError::ShapeMismatch {
                message: format!("adjacency is {}x{} for {} nodes", a.nrows(), a.ncols(), n),
            });
        }
    }

    let mut edges = Vec::new();
    if let Some(a) = adjacency {
        for i in 0..n {
            for j in (i + 1)..n {
                if a[[i, j]] != 0.0 || a[[j, i]] != 0.0 {
                    edges.push((positions[i], positions[j]));
                }
            }
        }
    }
    let side = style.width.min(style.height) as f64;
    let radius = (0.06 * side / (n.max(1) as f64).sqrt()).clamp(2.0, 8.0) as u32;

    style.render(|root| {
        let mut chart = style
            .chart(root, caption, false)
            .build_cartesian_2d(-1.1..1.1, -1.1..1.1)?;

        chart.draw_series(
            edges
                .iter()
                .map(|&(p, q)| PathElement::new(vec![p, q], EDGE_COLOR)),
        )?;
        chart.draw_series(positions.iter().zip(values.iter()).map(|(&p, &v)| {
            let color = style.colormap.map_range(v, value_range.0, value_range.1);
            Circle::new(p, radius, color.filled())
        }))?;
        Ok(())
    })
}
