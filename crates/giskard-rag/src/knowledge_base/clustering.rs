//! Density-based topic clustering over reduced embeddings.
//!
//! A core-distance DBSCAN: the working radius is derived from the data (the
//! mean distance to each point's `min_samples`-th neighbor) unless
//! `cluster_selection_epsilon` forces a larger one. Clusters smaller than
//! `min_cluster_size` are dissolved into noise. Labels are consecutive
//! integers in order of first appearance; noise is [`NOISE_TOPIC_ID`].

use tracing::debug;

use crate::error::{Error, Result};

/// Reserved topic id for unclustered / noise documents.
pub const NOISE_TOPIC_ID: i64 = -1;

/// Parameters for density clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringParams {
    /// Minimum number of points to keep a cluster
    pub min_cluster_size: usize,
    /// Neighbors required within the working radius for a core point
    pub min_samples: usize,
    /// Lower bound on the working radius; 0 derives it from the data
    pub cluster_selection_epsilon: f32,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            min_samples: 3,
            cluster_selection_epsilon: 0.0,
        }
    }
}

impl ClusteringParams {
    /// Validate parameter consistency.
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(Error::configuration(format!(
                "min_cluster_size must be >= 2, got {}",
                self.min_cluster_size
            )));
        }
        if self.min_samples < 1 {
            return Err(Error::configuration(format!(
                "min_samples must be >= 1, got {}",
                self.min_samples
            )));
        }
        Ok(())
    }
}

/// Cluster 2D points into topics.
///
/// Returns one label per point, in input order: a non-negative cluster id
/// or [`NOISE_TOPIC_ID`].
pub fn cluster_topics(points: &[[f32; 2]], params: &ClusteringParams) -> Result<Vec<i64>> {
    params.validate()?;

    let n = points.len();
    if n < params.min_cluster_size.max(params.min_samples) {
        // Too few points to form any cluster.
        return Ok(vec![NOISE_TOPIC_ID; n]);
    }

    let eps = working_radius(points, params);
    debug!(points = n, eps, "running density clustering over projection");

    let neighborhoods: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && euclidean(&points[i], &points[j]) <= eps)
                .collect()
        })
        .collect();
    let core: Vec<bool> = neighborhoods
        .iter()
        .map(|nb| nb.len() >= params.min_samples)
        .collect();

    // Expand clusters from core points, in index order for determinism.
    let mut labels = vec![NOISE_TOPIC_ID; n];
    let mut next_label: i64 = 0;
    for start in 0..n {
        if labels[start] != NOISE_TOPIC_ID || !core[start] {
            continue;
        }
        let label = next_label;
        next_label += 1;

        let mut frontier = vec![start];
        labels[start] = label;
        while let Some(point) = frontier.pop() {
            if !core[point] {
                continue;
            }
            for &neighbor in &neighborhoods[point] {
                if labels[neighbor] == NOISE_TOPIC_ID {
                    labels[neighbor] = label;
                    frontier.push(neighbor);
                }
            }
        }
    }

    dissolve_small_clusters(&mut labels, params.min_cluster_size);
    relabel_consecutive(&mut labels);
    Ok(labels)
}

/// Working radius: mean distance to the `min_samples`-th nearest neighbor,
/// floored by the configured selection epsilon.
fn working_radius(points: &[[f32; 2]], params: &ClusteringParams) -> f32 {
    let n = points.len();
    let k = params.min_samples.min(n - 1);
    let mut total = 0.0f32;
    for i in 0..n {
        let mut distances: Vec<f32> = (0..n)
            .filter(|&j| j != i)
            .map(|j| euclidean(&points[i], &points[j]))
            .collect();
        distances.sort_by(f32::total_cmp);
        total += distances[k - 1];
    }
    (total / n as f32).max(params.cluster_selection_epsilon)
}

fn dissolve_small_clusters(labels: &mut [i64], min_cluster_size: usize) {
    let mut counts = std::collections::HashMap::new();
    for &label in labels.iter() {
        if label != NOISE_TOPIC_ID {
            *counts.entry(label).or_insert(0usize) += 1;
        }
    }
    for label in labels.iter_mut() {
        if *label != NOISE_TOPIC_ID && counts[label] < min_cluster_size {
            *label = NOISE_TOPIC_ID;
        }
    }
}

fn relabel_consecutive(labels: &mut [i64]) {
    let mut mapping = std::collections::HashMap::new();
    let mut next: i64 = 0;
    for label in labels.iter_mut() {
        if *label == NOISE_TOPIC_ID {
            continue;
        }
        let relabeled = *mapping.entry(*label).or_insert_with(|| {
            let id = next;
            next += 1;
            id
        });
        *label = relabeled;
    }
}

fn euclidean(a: &[f32; 2], b: &[f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(cx: f32, cy: f32, count: usize) -> Vec<[f32; 2]> {
        (0..count)
            .map(|i| [cx + (i as f32) * 0.05, cy - (i as f32) * 0.04])
            .collect()
    }

    #[test]
    fn test_two_blobs_get_two_labels() {
        let mut points = blob(0.0, 0.0, 6);
        points.extend(blob(100.0, 100.0, 6));

        let labels = cluster_topics(&points, &ClusteringParams::default()).unwrap();
        assert_eq!(labels.len(), 12);
        assert!(labels[..6].iter().all(|&l| l == labels[0]));
        assert!(labels[6..].iter().all(|&l| l == labels[6]));
        assert_ne!(labels[0], labels[6]);
        assert_eq!(labels[0], 0);
        assert_eq!(labels[6], 1);
    }

    #[test]
    fn test_isolated_point_is_noise() {
        let mut points = blob(0.0, 0.0, 8);
        points.push([1000.0, 1000.0]);

        let labels = cluster_topics(&points, &ClusteringParams::default()).unwrap();
        assert_eq!(labels[8], NOISE_TOPIC_ID);
        assert!(labels[..8].iter().all(|&l| l >= 0));
    }

    #[test]
    fn test_small_clusters_dissolve_to_noise() {
        let mut points = blob(0.0, 0.0, 10);
        points.extend(blob(500.0, 500.0, 10));
        let params = ClusteringParams {
            min_cluster_size: 11,
            ..ClusteringParams::default()
        };
        let labels = cluster_topics(&points, &params).unwrap();
        assert!(labels.iter().all(|&l| l == NOISE_TOPIC_ID));
    }

    #[test]
    fn test_too_few_points_all_noise() {
        let points = blob(0.0, 0.0, 2);
        let labels = cluster_topics(&points, &ClusteringParams::default()).unwrap();
        assert_eq!(labels, vec![NOISE_TOPIC_ID, NOISE_TOPIC_ID]);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = ClusteringParams {
            min_cluster_size: 1,
            ..ClusteringParams::default()
        };
        assert!(cluster_topics(&[[0.0, 0.0]], &bad).is_err());
    }

    #[test]
    fn test_determinism() {
        let mut points = blob(0.0, 0.0, 6);
        points.extend(blob(30.0, -20.0, 7));
        let params = ClusteringParams::default();
        assert_eq!(
            cluster_topics(&points, &params).unwrap(),
            cluster_topics(&points, &params).unwrap()
        );
    }
}
