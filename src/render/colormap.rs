//! Colormaps and the categorical palette for line series

use plotters::style::colors::colormaps::{
    BlackWhite, Bone, ColorMap, Copper, MandelbrotHSL, VulcanoHSL, ViridisRGB,
};
use plotters::style::{Color, HSLColor, Palette, Palette99, RGBColor};
use serde::{Deserialize, Serialize};

/// Named continuous colormap over `[0, 1]`, backed by plotters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Bone,
    Copper,
    Mandelbrot,
    Vulcano,
    /// Hue sweep from blue to red, for signed opinions
    Spectral,
    Grayscale,
}

fn to_rgb<C: Color>(color: C) -> RGBColor {
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

impl Colormap {
    /// Map a normalized value; out-of-range values are clamped, NaN maps to 0
    pub fn map(&self, value: f64) -> RGBColor {
        let t = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) } as f32;
        match self {
            Colormap::Viridis => to_rgb(ViridisRGB.get_color(t)),
            Colormap::Bone => to_rgb(Bone.get_color(t)),
            Colormap::Copper => to_rgb(Copper.get_color(t)),
            Colormap::Mandelbrot => to_rgb(MandelbrotHSL.get_color(t)),
            Colormap::Vulcano => to_rgb(VulcanoHSL.get_color(t)),
            Colormap::Spectral => {
                to_rgb(HSLColor((240.0 - 240.0 * t as f64) / 360.0, 0.90, 0.45))
            }
            Colormap::Grayscale => to_rgb(BlackWhite.get_color(t)),
        }
    }

    /// Map `value` from `[lo, hi]`; a degenerate range maps to the middle
    pub fn map_range(&self, value: f64, lo: f64, hi: f64) -> RGBColor {
        if hi > lo {
            self.map((value - lo) / (hi - lo))
        } else {
            self.map(0.5)
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viridis" => Some(Colormap::Viridis),
            "bone" => Some(Colormap::Bone),
            "copper" => Some(Colormap::Copper),
            "mandelbrot" => Some(Colormap::Mandelbrot),
            "vulcano" => Some(Colormap::Vulcano),
            "spectral" | "diverging" => Some(Colormap::Spectral),
            "grayscale" | "gray" | "grey" => Some(Colormap::Grayscale),
            _ => None,
        }
    }
}

/// Distinct colors for line series
pub fn palette(index: usize) -> RGBColor {
    to_rgb(Palette99::pick(index))
}
