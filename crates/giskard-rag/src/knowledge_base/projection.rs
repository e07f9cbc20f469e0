//! 2D projection of high-dimensional embeddings.
//!
//! The projection feeds topic clustering and visualization. It is a
//! deterministic manifold-flavored projection: a PCA initialization (top two
//! principal directions via power iteration) followed by a few refinement
//! sweeps that pull each point toward its nearest neighbors while keeping a
//! minimum separation. The `n_neighbors`/`min_dist` knobs play the same role
//! as in the usual manifold learners.

use tracing::debug;

use crate::error::{Error, Result};

/// Configuration for the 2D projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionConfig {
    /// Size of the local neighborhood considered during refinement
    pub n_neighbors: usize,
    /// Minimum distance enforced between projected points
    pub min_dist: f32,
    /// Number of refinement sweeps
    pub iterations: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 50,
            min_dist: 0.5,
            iterations: 30,
        }
    }
}

/// Project embeddings to 2D.
///
/// Returns one `[x, y]` point per input vector, in input order. The result
/// is deterministic for a given input.
pub fn reduce_to_2d(embeddings: &[Vec<f32>], config: &ProjectionConfig) -> Result<Vec<[f32; 2]>> {
    if embeddings.is_empty() {
        return Err(Error::invalid_input("cannot project an empty embedding set"));
    }
    let dim = embeddings[0].len();
    if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
        return Err(Error::invalid_input(
            "embeddings must be non-empty and share one dimension",
        ));
    }

    debug!(
        points = embeddings.len(),
        dim, "computing 2D projection of embedding matrix"
    );

    let n = embeddings.len();

    // Center the data.
    let mut mean = vec![0.0f32; dim];
    for e in embeddings {
        for (m, v) in mean.iter_mut().zip(e) {
            *m += v / n as f32;
        }
    }
    let centered: Vec<Vec<f32>> = embeddings
        .iter()
        .map(|e| e.iter().zip(&mean).map(|(v, m)| v - m).collect())
        .collect();

    let first = principal_direction(&centered, None);
    let second = principal_direction(&centered, Some(&first));

    let mut points: Vec<[f32; 2]> = centered
        .iter()
        .map(|row| [dot(row, &first), dot(row, &second)])
        .collect();

    refine(&mut points, config);
    Ok(points)
}

/// Top principal direction by power iteration, optionally deflated against
/// an already-found direction. Deterministic start vector.
fn principal_direction(centered: &[Vec<f32>], deflate: Option<&[f32]>) -> Vec<f32> {
    let dim = centered[0].len();
    let mut direction: Vec<f32> = (0..dim)
        .map(|i| if i % 2 == 0 { 1.0 } else { -0.5 })
        .collect();
    normalize(&mut direction);

    for _ in 0..64 {
        // next = C^T C v, without materializing the covariance matrix
        let mut next = vec![0.0f32; dim];
        for row in centered {
            let projection = dot(row, &direction);
            for (acc, v) in next.iter_mut().zip(row) {
                *acc += projection * v;
            }
        }
        if let Some(prev) = deflate {
            let overlap = dot(&next, prev);
            for (v, p) in next.iter_mut().zip(prev) {
                *v -= overlap * p;
            }
        }
        if normalize(&mut next) < f32::EPSILON {
            break;
        }
        direction = next;
    }
    direction
}

/// Neighborhood refinement: pull points toward the centroid of their
/// `n_neighbors` nearest neighbors, then push apart pairs closer than
/// `min_dist`.
fn refine(points: &mut [[f32; 2]], config: &ProjectionConfig) {
    let n = points.len();
    if n < 3 || config.iterations == 0 {
        return;
    }
    let k = config.n_neighbors.min(n - 1);

    for _ in 0..config.iterations {
        let snapshot: Vec<[f32; 2]> = points.to_vec();
        for (i, point) in points.iter_mut().enumerate() {
            let mut neighbors: Vec<(usize, f32)> = snapshot
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, p)| (j, planar_sq_dist(&snapshot[i], p)))
                .collect();
            neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            neighbors.truncate(k);

            let mut cx = 0.0f32;
            let mut cy = 0.0f32;
            for (j, _) in &neighbors {
                cx += snapshot[*j][0];
                cy += snapshot[*j][1];
            }
            cx /= neighbors.len() as f32;
            cy /= neighbors.len() as f32;

            // Attraction toward the neighborhood centroid, bounded step.
            point[0] += 0.1 * (cx - point[0]);
            point[1] += 0.1 * (cy - point[1]);

            // Repulsion from the single nearest point when below min_dist.
            if let Some((j, d2)) = neighbors.first() {
                let d = d2.sqrt();
                if d < config.min_dist && d > f32::EPSILON {
                    let push = 0.5 * (config.min_dist - d) / d;
                    point[0] += push * (point[0] - snapshot[*j][0]);
                    point[1] += push * (point[1] - snapshot[*j][1]);
                }
            }
        }
    }
}

fn planar_sq_dist(a: &[f32; 2], b: &[f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f32]) -> f32 {
    let magnitude = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= magnitude;
        }
    }
    magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_around(center: &[f32], offsets: &[f32]) -> Vec<Vec<f32>> {
        offsets
            .iter()
            .map(|o| center.iter().map(|c| c + o).collect())
            .collect()
    }

    #[test]
    fn test_projection_shape_and_determinism() {
        let mut data = cluster_around(&[0.0, 0.0, 0.0, 0.0], &[0.0, 0.1, -0.1]);
        data.extend(cluster_around(&[5.0, 5.0, 5.0, 5.0], &[0.0, 0.1, -0.1]));

        let config = ProjectionConfig::default();
        let a = reduce_to_2d(&data, &config).unwrap();
        let b = reduce_to_2d(&data, &config).unwrap();

        assert_eq!(a.len(), data.len());
        assert_eq!(a, b);
    }

    #[test]
    fn test_separated_clusters_stay_separated() {
        let mut data = cluster_around(&[0.0; 8], &[0.0, 0.05, -0.05, 0.1]);
        data.extend(cluster_around(&[10.0; 8], &[0.0, 0.05, -0.05, 0.1]));

        let points = reduce_to_2d(&data, &ProjectionConfig::default()).unwrap();
        let within = planar_sq_dist(&points[0], &points[1]);
        let across = planar_sq_dist(&points[0], &points[5]);
        assert!(across > within);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(reduce_to_2d(&[], &ProjectionConfig::default()).is_err());
    }

    #[test]
    fn test_ragged_input_rejected() {
        let data = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(reduce_to_2d(&data, &ProjectionConfig::default()).is_err());
    }
}
