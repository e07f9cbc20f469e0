//! Exact L2 nearest-neighbor index over document embeddings.
//!
//! A brute-force flat index: vectors are kept in insertion order and every
//! query scans all of them. Distances are *squared* L2, the flat-index
//! convention, so threshold values elsewhere in the crate apply to squared
//! distances.

use crate::error::{Error, Result};

/// Exact (brute-force) L2 index.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// Create an empty index for vectors of the given dimension.
    ///
    /// A zero dimension means the backing store cannot be initialized and
    /// is reported as an installation error.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::installation(
                "cannot initialize a flat L2 index with zero-dimensional vectors",
            ));
        }
        Ok(Self {
            dimension,
            vectors: Vec::new(),
        })
    }

    /// Number of indexed vectors
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector dimension
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add vectors to the index, preserving order.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(Error::invalid_input(format!(
                    "vector dimension mismatch: expected {}, got {}",
                    self.dimension,
                    vector.len()
                )));
            }
            self.vectors.push(vector.clone());
        }
        Ok(())
    }

    /// Return the `k` nearest vectors to `query` as `(position, distance)`
    /// pairs, ascending by squared L2 distance, ties broken by position.
    ///
    /// At most `min(k, len)` results are returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::invalid_input(format!(
                "query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }

        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(query, v)))
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
