//! Eigenvector centrality via power iteration

const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-10;

/// Eigenvector centrality of an undirected, unweighted graph.
///
/// Iterates on `A + I` so bipartite graphs converge; the shift leaves the
/// principal eigenvector unchanged. The result is L2-normalised.
pub fn eigenvector_centrality(node_count: usize, edges: &[(usize, usize)]) -> Vec<f64> {
    if node_count == 0 {
        return Vec::new();
    }

    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(a, b) in edges {
        if a >= node_count || b >= node_count {
            continue;
        }
        neighbors[a].push(b);
        if a != b {
            neighbors[b].push(a);
        }
    }

    let mut scores = vec![1.0 / node_count as f64; node_count];
    for _ in 0..MAX_ITERATIONS {
        let mut next: Vec<f64> = scores.clone();
        for (node, adjacent) in neighbors.iter().enumerate() {
            for &other in adjacent {
                next[node] += scores[other];
            }
        }

        let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            break;
        }
        for v in &mut next {
            *v /= norm;
        }

        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < node_count as f64 * TOLERANCE {
            break;
        }
    }

    scores
}
