//! Node placement: force-directed, circular and random layouts
//!
//! All layouts are deterministic for a given node count, edge list and seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::config::LayoutAlgorithm;

/// Minimum pairwise distance used by the force layout
const MIN_DISTANCE: f64 = 0.01;

/// Average displacement below which the force layout stops early
const CONVERGENCE_THRESHOLD: f64 = 1e-4;

/// Layout parameters
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub algorithm: LayoutAlgorithm,
    pub seed: u64,
    pub iterations: usize,
}

/// Positions for nodes `0..node_count` given weighted undirected edges
pub fn compute_layout(
    node_count: usize,
    edges: &[(usize, usize, f64)],
    params: LayoutParams,
) -> Vec<(f64, f64)> {
    match node_count {
        0 => Vec::new(),
        1 => vec![(0.0, 0.0)],
        _ => match params.algorithm {
            LayoutAlgorithm::Force => {
                force_layout(node_count, edges, params.seed, params.iterations)
            }
            LayoutAlgorithm::Circular => circular_layout(node_count),
            LayoutAlgorithm::Random => random_layout(node_count, params.seed),
        },
    }
}

/// Evenly spaced on the unit circle, starting at angle 0
pub fn circular_layout(node_count: usize) -> Vec<(f64, f64)> {
    if node_count == 1 {
        return vec![(0.0, 0.0)];
    }
    let positions = (0..node_count)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / node_count as f64;
            (theta.cos(), theta.sin())
        })
        .collect();
    rescale(positions)
}

/// Uniform in the unit square
pub fn random_layout(node_count: usize, seed: u64) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..node_count)
        .map(|_| (rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)))
        .collect()
}

/// Fruchterman-Reingold spring layout with optimal distance `k = 1 / n^0.3`,
/// rescaled to [-1, 1].
pub fn force_layout(
    node_count: usize,
    edges: &[(usize, usize, f64)],
    seed: u64,
    iterations: usize,
) -> Vec<(f64, f64)> {
    let n = node_count;
    let k = 1.0 / (n as f64).powf(0.3);

    let mut adjacency = vec![0.0_f64; n * n];
    for &(a, b, weight) in edges {
        if a < n && b < n && a != b {
            adjacency[a * n + b] = weight;
            adjacency[b * n + a] = weight;
        }
    }

    let mut pos = random_layout(n, seed);

    let (min_x, max_x, min_y, max_y) = bounds(&pos);
    let mut temperature = (max_x - min_x).max(max_y - min_y) * 0.1;
    let cooling = temperature / (iterations as f64 + 1.0);

    for _ in 0..iterations {
        let mut displacement = vec![(0.0_f64, 0.0_f64); n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = pos[i].0 - pos[j].0;
                let dy = pos[i].1 - pos[j].1;
                let distance = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
                let force = k * k / (distance * distance) - adjacency[i * n + j] * distance / k;
                displacement[i].0 += dx * force;
                displacement[i].1 += dy * force;
            }
        }

        let mut total_move = 0.0;
        for (p, (dx, dy)) in pos.iter_mut().zip(displacement) {
            let length = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
            let step_x = dx * temperature / length;
            let step_y = dy * temperature / length;
            p.0 += step_x;
            p.1 += step_y;
            total_move += (step_x * step_x + step_y * step_y).sqrt();
        }

        temperature -= cooling;
        if total_move / (n as f64) < CONVERGENCE_THRESHOLD {
            break;
        }
    }

    rescale(pos)
}

fn bounds(positions: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    positions.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), &(x, y)| {
            (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
        },
    )
}

/// Centers on the mean and scales so the largest coordinate magnitude is 1
fn rescale(positions: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let n = positions.len() as f64;
    let (sum_x, sum_y) = positions
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);

    let centered: Vec<(f64, f64)> = positions
        .into_iter()
        .map(|(x, y)| (x - mean_x, y - mean_y))
        .collect();
    let max_abs = centered
        .iter()
        .fold(0.0_f64, |m, &(x, y)| m.max(x.abs()).max(y.abs()));

    if max_abs > 0.0 {
        centered
            .into_iter()
            .map(|(x, y)| (x / max_abs, y / max_abs))
            .collect()
    } else {
        centered
    }
}
