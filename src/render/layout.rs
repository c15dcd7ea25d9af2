//! Node placement for graph drawings
//!
//! Layouts are deterministic so consecutive movie frames and repeated runs
//! place every agent at the same spot. Positions are normalized to `[-1, 1]^2`.

use crate::errors::{OpinionVisError, Result};
use ndarray::ArrayView2;
use rayon::prelude::*;
use std::f64::consts::TAU;
use tracing::debug;

/// Nodes evenly spaced on the unit circle, starting at angle zero
pub fn circular_layout(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let angle = TAU * i as f64 / n as f64;
            (angle.cos(), angle.sin())
        })
        .collect()
}

/// Fruchterman-Reingold force layout, seeded from a perturbed circle.
///
/// Forces for all nodes are evaluated in parallel against the positions of
/// the previous iteration.
///
/// # Errors
///
/// Returns an error if the adjacency is not square.
pub fn spring_layout(adjacency: ArrayView2<'_, f64>, iterations: usize) -> Result<Vec<(f64, f64)>> {
    let (n, m) = adjacency.dim();
    if n != m {
        return Err(OpinionVisError::ShapeMismatch {
            message: format!("adjacency must be square, got {}x{}", n, m),
        });
    }
    if n < 2 {
        return Ok(vec![(0.0, 0.0); n]);
    }

    // break the rotational symmetry of the circle without randomness
    let mut positions: Vec<(f64, f64)> = circular_layout(n)
        .into_iter()
        .enumerate()
        .map(|(i, (x, y))| {
            let r = 1.0 - 0.3 * ((i * 7919) % 13) as f64 / 13.0;
            (r * x, r * y)
        })
        .collect();

    let k = 2.0 / (n as f64).sqrt();
    let t0 = 0.2;
    for iteration in 0..iterations {
        let temperature = t0 * (1.0 - iteration as f64 / iterations as f64);
        let current = &positions;
        let next: Vec<(f64, f64)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let (xi, yi) = current[i];
                let (mut fx, mut fy) = (0.0, 0.0);
                for (j, &(xj, yj)) in current.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let (dx, dy) = (xi - xj, yi - yj);
                    let d = (dx * dx + dy * dy).sqrt().max(1e-9);
                    let mut force = k * k / d;
                    if adjacency[[i, j]] != 0.0 || adjacency[[j, i]] != 0.0 {
                        force -= d * d / k;
                    }
                    fx += dx / d * force;
                    fy += dy / d * force;
                }
                let norm = (fx * fx + fy * fy).sqrt();
                if norm > 0.0 {
                    let step = norm.min(temperature);
                    (xi + fx / norm * step, yi + fy / norm * step)
                } else {
                    (xi, yi)
                }
            })
            .collect();
        positions = next;
    }

    debug!(nodes = n, iterations, "spring layout done");
    Ok(normalize(positions))
}

/// Center on the origin and scale into `[-1, 1]^2`
fn normalize(mut positions: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let n = positions.len() as f64;
    let cx = positions.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = positions.iter().map(|p| p.1).sum::<f64>() / n;
    let extent = positions
        .iter()
        .map(|p| (p.0 - cx).abs().max((p.1 - cy).abs()))
        .fold(0.0, f64::max);
    let scale = if extent > 0.0 { 1.0 / extent } else { 1.0 };
    for p in &mut positions {
        *p = ((p.0 - cx) * scale, (p.1 - cy) * scale);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn circle_points_are_on_unit_circle() {
        let pos = circular_layout(6);
        assert_eq!(pos.len(), 6);
        assert!((pos[0].0 - 1.0).abs() < 1e-12);
        assert!(pos.iter().all(|(x, y)| ((x * x + y * y) - 1.0).abs() < 1e-12));
        assert!(circular_layout(0).is_empty());
    }

    fn two_cliques() -> Array2<f64> {
        // nodes 0..4 and 4..8 fully connected internally, one bridge 3-4
        Array2::from_shape_fn((8, 8), |(i, j)| {
            let same = (i < 4) == (j < 4);
            if i != j && (same || (i, j) == (3, 4) || (i, j) == (4, 3)) {
                1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn spring_layout_separates_communities() {
        let a = two_cliques();
        let pos = spring_layout(a.view(), 200).unwrap();
        assert_eq!(pos.len(), 8);
        assert!(pos
            .iter()
            .all(|(x, y)| x.abs() <= 1.0 + 1e-9 && y.abs() <= 1.0 + 1e-9));

        let centroid = |range: std::ops::Range<usize>| {
            let len = range.len() as f64;
            let (sx, sy) = range.fold((0.0, 0.0), |acc, i| (acc.0 + pos[i].0, acc.1 + pos[i].1));
            (sx / len, sy / len)
        };
        let (a0, a1) = (centroid(0..4), centroid(4..8));
        let between = ((a0.0 - a1.0).powi(2) + (a0.1 - a1.1).powi(2)).sqrt();
        let within = (0..4)
            .map(|i| ((pos[i].0 - a0.0).powi(2) + (pos[i].1 - a0.1).powi(2)).sqrt())
            .fold(0.0, f64::max);
        assert!(between > within);
    }

    #[test]
    fn spring_layout_is_deterministic() {
        let a = two_cliques();
        assert_eq!(
            spring_layout(a.view(), 50).unwrap(),
            spring_layout(a.view(), 50).unwrap()
        );
    }

    #[test]
    fn degenerate_inputs() {
        assert!(spring_layout(Array2::<f64>::zeros((2, 3)).view(), 10).is_err());
        assert_eq!(spring_layout(Array2::<f64>::zeros((1, 1)).view(), 10).unwrap(), vec![(0.0, 0.0)]);
    }
}
