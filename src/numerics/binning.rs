//! Histograms and hexagonal binning
//!
//! Hexagonal binning uses two interleaved rectangular lattices, the second
//! shifted by half a cell in both directions. A point goes to whichever
//! lattice center is closer in the metric `du^2 + 3 dv^2`, which makes the
//! Voronoi cells regular hexagons in the scaled coordinates.

use crate::errors::{OpinionVisError, Result};
use std::collections::HashMap;

/// Fixed-width histogram over a closed range
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
    /// Finite samples that fell outside the range
    pub outside: u64,
}

impl Histogram {
    /// Bin `values` into `bins` equal bins over `range`.
    ///
    /// Bins are half-open `[lo, hi)` except the last, which includes `range.1`.
    /// Non-finite values are ignored.
    pub fn new<'a, I>(values: I, bins: usize, range: (f64, f64)) -> Result<Self>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let (lo, hi) = range;
        if bins == 0 {
            return Err(OpinionVisError::NumericsError(
                "histogram needs at least one bin".to_string(),
            ));
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(OpinionVisError::NumericsError(format!(
                "invalid histogram range [{}, {}]",
                lo, hi
            )));
        }

        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|k| lo + k as f64 * width).collect();
        let mut counts = vec![0_u64; bins];
        let mut outside = 0;

        for &v in values {
            if !v.is_finite() {
                continue;
            }
            if v < lo || v > hi {
                outside += 1;
                continue;
            }
            let k = (((v - lo) / width) as usize).min(bins - 1);
            counts[k] += 1;
        }

        Ok(Self {
            edges,
            counts,
            outside,
        })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Counts normalized to unit area; all zeros for an empty histogram
    pub fn density(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.bins()];
        }
        let norm = total as f64 * self.bin_width();
        self.counts.iter().map(|&c| c as f64 / norm).collect()
    }
}

/// Smallest and largest finite value, padded when they coincide
pub fn finite_range<'a, I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return None;
    }
    if lo == hi {
        let pad = if lo == 0.0 { 0.5 } else { 0.5 * lo.abs() };
        return Some((lo - pad, hi + pad));
    }
    Some((lo, hi))
}

/// One non-empty hexagonal cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexCell {
    pub center: (f64, f64),
    pub count: u64,
}

/// Point counts on a hexagonal lattice
#[derive(Debug, Clone)]
pub struct HexBinning {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub gridsize: usize,
    /// Cells per unit of the vertical scaled coordinate
    pub ny: usize,
    pub cells: Vec<HexCell>,
}

impl HexBinning {
    /// Bin `points` with `gridsize` hexagons across the x range.
    pub fn new<'a, I>(
        points: I,
        gridsize: usize,
        x_range: (f64, f64),
        y_range: (f64, f64),
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a (f64, f64)>,
    {
        if gridsize == 0 {
            return Err(OpinionVisError::NumericsError(
                "hexbin gridsize must be at least 1".to_string(),
            ));
        }
        for (lo, hi) in [x_range, y_range] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(OpinionVisError::NumericsError(format!(
                    "invalid hexbin range [{}, {}]",
                    lo, hi
                )));
            }
        }

        let nx = gridsize as f64;
        let ny = ((gridsize as f64 / 3f64.sqrt()).round() as usize).max(1);
        let sx = (x_range.1 - x_range.0) / nx;
        let sy = (y_range.1 - y_range.0) / ny as f64;

        // key: (lattice, i, j) with lattice 0 on integer centers, 1 on half-integers
        let mut counts: HashMap<(u8, i64, i64), u64> = HashMap::new();
        for &(x, y) in points {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            if x < x_range.0 || x > x_range.1 || y < y_range.0 || y > y_range.1 {
                continue;
            }
            let u = (x - x_range.0) / sx;
            let v = (y - y_range.0) / sy;

            let (i1, j1) = (u.round(), v.round());
            let (i2, j2) = (u.floor(), v.floor());
            let d1 = (u - i1).powi(2) + 3.0 * (v - j1).powi(2);
            let d2 = (u - i2 - 0.5).powi(2) + 3.0 * (v - j2 - 0.5).powi(2);

            let key = if d1 <= d2 {
                (0, i1 as i64, j1 as i64)
            } else {
                (1, i2 as i64, j2 as i64)
            };
            *counts.entry(key).or_insert(0) += 1;
        }

        let mut cells: Vec<HexCell> = counts
            .into_iter()
            .map(|((lattice, i, j), count)| {
                let offset = if lattice == 0 { 0.0 } else { 0.5 };
                HexCell {
                    center: (
                        x_range.0 + (i as f64 + offset) * sx,
                        y_range.0 + (j as f64 + offset) * sy,
                    ),
                    count,
                }
            })
            .collect();
        cells.sort_by(|a, b| {
            a.center
                .1
                .total_cmp(&b.center.1)
                .then(a.center.0.total_cmp(&b.center.0))
        });

        Ok(Self {
            x_range,
            y_range,
            gridsize,
            ny,
            cells,
        })
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|c| c.count).sum()
    }

    pub fn max_count(&self) -> u64 {
        self.cells.iter().map(|c| c.count).max().unwrap_or(0)
    }

    /// Cell spacing in data units along x and y
    pub fn spacing(&self) -> (f64, f64) {
        (
            (self.x_range.1 - self.x_range.0) / self.gridsize as f64,
            (self.y_range.1 - self.y_range.0) / self.ny as f64,
        )
    }

    /// Hexagon vertices around `center` in data coordinates
    pub fn hexagon(&self, center: (f64, f64)) -> [(f64, f64); 6] {
        let (sx, sy) = self.spacing();
        let (hx, hy) = (sx, sy / 3.0);
        let unit = [
            (0.5, -0.5),
            (0.5, 0.5),
            (0.0, 1.0),
            (-0.5, 0.5),
            (-0.5, -0.5),
            (0.0, -1.0),
        ];
        unit.map(|(u, v)| (center.0 + u * hx, center.1 + v * hy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_and_edges() {
        let values = [0.0, 0.1, 0.5, 0.99, 1.0, 1.5, f64::NAN];
        let h = Histogram::new(&values, 2, (0.0, 1.0)).unwrap();
        assert_eq!(h.edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(h.counts, vec![2, 3]);
        assert_eq!(h.outside, 1);
    }

    #[test]
    fn density_has_unit_area() {
        let values: Vec<f64> = (0..1000).map(|k| (k as f64 / 999.0).powi(2)).collect();
        let h = Histogram::new(&values, 20, (0.0, 1.0)).unwrap();
        let area: f64 = h.density().iter().map(|d| d * h.bin_width()).sum();
        assert!((area - 1.0).abs() < 1e-12);
        assert_eq!(h.total(), 1000);
    }

    #[test]
    fn histogram_rejects_bad_input() {
        assert!(Histogram::new(&[1.0], 0, (0.0, 1.0)).is_err());
        assert!(Histogram::new(&[1.0], 3, (1.0, 1.0)).is_err());
    }

    #[test]
    fn degenerate_range_is_padded() {
        assert_eq!(finite_range(&[2.0, 2.0]), Some((1.0, 3.0)));
        assert_eq!(finite_range(&[0.0]), Some((-0.5, 0.5)));
        assert_eq!(finite_range(&[f64::NAN]), None);
    }

    #[test]
    fn hexbin_keeps_every_point_in_range() {
        let points: Vec<(f64, f64)> = (0..400)
            .map(|k| {
                let t = k as f64 / 400.0;
                (t, (7.0 * t).sin() * 0.5 + 0.5)
            })
            .collect();
        let hb = HexBinning::new(&points, 10, (0.0, 1.0), (0.0, 1.0)).unwrap();
        assert_eq!(hb.total(), 400);
        assert!(hb.max_count() >= 1);
        assert!(hb.cells.iter().all(|c| c.count > 0));
    }

    #[test]
    fn identical_points_share_a_cell() {
        let points = vec![(0.31, 0.62); 5];
        let hb = HexBinning::new(&points, 8, (0.0, 1.0), (0.0, 1.0)).unwrap();
        assert_eq!(hb.cells.len(), 1);
        assert_eq!(hb.cells[0].count, 5);

        let (sx, sy) = hb.spacing();
        let c = hb.cells[0].center;
        assert!((c.0 - 0.31).abs() <= sx);
        assert!((c.1 - 0.62).abs() <= sy);
    }

    #[test]
    fn hexbin_drops_outside_and_non_finite() {
        let points = [(2.0, 0.5), (0.5, f64::NAN), (0.5, 0.5)];
        let hb = HexBinning::new(&points, 4, (0.0, 1.0), (0.0, 1.0)).unwrap();
        assert_eq!(hb.total(), 1);
    }
}
