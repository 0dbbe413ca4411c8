//! In-memory cosine similarity index

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Dense vectors keyed by chunk position, stored unit-normalized
pub struct SemanticIndex {
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

impl SemanticIndex {
    /// Build from one embedding per chunk, in chunk order.
    pub fn build(embeddings: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
        if let Some((position, bad)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, e)| e.len() != dimensions)
        {
            return Err(Error::internal(format!(
                "embedding for chunk {} has {} dimensions, expected {}",
                position,
                bad.len(),
                dimensions
            )));
        }

        Ok(Self {
            vectors: embeddings.into_iter().map(normalize).collect(),
            dimensions,
        })
    }

    /// Top `k` chunk positions by cosine similarity, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(Error::internal(format!(
                "query embedding has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let query = normalize(query.to_vec());
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, v)| (position, v.iter().zip(&query).map(|(a, b)| a * b).sum()))
            .collect();

        // Stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
