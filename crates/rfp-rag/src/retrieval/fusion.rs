//! Weighted fusion of lexical and semantic rankings

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::lexical::LexicalIndex;
use super::semantic::SemanticIndex;
use super::ScoredChunk;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

/// Stage weights applied to min-max normalized scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub semantic: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            semantic: 0.8,
            lexical: 0.2,
        }
    }
}

/// Rescale scores to [0, 1]. A list whose scores are all equal maps to 1.0.
fn min_max(scores: &[(usize, f32)]) -> Vec<(usize, f32)> {
    let (min, max) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (_, s)| {
            (lo.min(*s), hi.max(*s))
        });
    let spread = max - min;

    scores
        .iter()
        .map(|(id, s)| {
            let normalized = if spread > f32::EPSILON {
                (s - min) / spread
            } else {
                1.0
            };
            (*id, normalized)
        })
        .collect()
}

struct Fused {
    id: usize,
    score: f32,
    semantic_rank: Option<usize>,
    lexical_rank: Option<usize>,
}

/// Merge two best-first lists into one.
///
/// Each list is normalized on its own, then a chunk's fused score is the
/// weighted sum of the normalized scores it has. Ties go to the better
/// semantic rank; chunks only the lexical stage found rank after those, in
/// lexical order.
pub fn weighted_fusion(
    semantic: &[(usize, f32)],
    lexical: &[(usize, f32)],
    weights: FusionWeights,
) -> Vec<(usize, f32)> {
    let mut by_id: HashMap<usize, usize> = HashMap::new();
    let mut fused: Vec<Fused> = Vec::with_capacity(semantic.len() + lexical.len());

    for (rank, (id, score)) in min_max(semantic).into_iter().enumerate() {
        if by_id.contains_key(&id) {
            continue;
        }
        by_id.insert(id, fused.len());
        fused.push(Fused {
            id,
            score: weights.semantic * score,
            semantic_rank: Some(rank),
            lexical_rank: None,
        });
    }

    for (rank, (id, score)) in min_max(lexical).into_iter().enumerate() {
        match by_id.get(&id) {
            Some(&slot) if fused[slot].lexical_rank.is_none() => {
                fused[slot].score += weights.lexical * score;
                fused[slot].lexical_rank = Some(rank);
            }
            Some(_) => {}
            None => {
                by_id.insert(id, fused.len());
                fused.push(Fused {
                    id,
                    score: weights.lexical * score,
                    semantic_rank: None,
                    lexical_rank: Some(rank),
                });
            }
        }
    }

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (a.semantic_rank, b.semantic_rank) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.lexical_rank.cmp(&b.lexical_rank),
            })
    });

    fused.into_iter().map(|f| (f.id, f.score)).collect()
}

/// Hybrid retriever over one document's chunks
pub struct FusionRetriever {
    chunks: Vec<Arc<Chunk>>,
    semantic: SemanticIndex,
    lexical: Option<LexicalIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    weights: FusionWeights,
}

impl FusionRetriever {
    /// Embed every chunk and build both indices.
    ///
    /// The lexical index is built on the blocking pool. If it cannot be built
    /// the retriever runs semantic-only.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        weights: FusionWeights,
        parallelism: usize,
    ) -> Result<Self> {
        let start = Instant::now();
        let chunks: Vec<Arc<Chunk>> = chunks.into_iter().map(Arc::new).collect();

        let lexical_input: Vec<Chunk> = chunks.iter().map(|c| c.as_ref().clone()).collect();
        let lexical_task = tokio::task::spawn_blocking(move || LexicalIndex::build(&lexical_input));

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts, parallelism).await?;
        let semantic = SemanticIndex::build(embeddings)?;

        let lexical = match lexical_task.await {
            Ok(Ok(index)) => Some(index),
            Ok(Err(e)) => {
                tracing::warn!("Lexical index unavailable, retrieval is semantic-only: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Lexical index build panicked, retrieval is semantic-only: {}", e);
                None
            }
        };

        tracing::info!(
            chunks = chunks.len(),
            vectors = semantic.len(),
            lexical_documents = lexical.as_ref().map_or(0, LexicalIndex::len),
            "Built retrieval indices in {:?}",
            start.elapsed()
        );

        Ok(Self::from_parts(chunks, semantic, lexical, embedder, weights))
    }

    /// Assemble from prebuilt parts
    pub fn from_parts(
        chunks: Vec<Arc<Chunk>>,
        semantic: SemanticIndex,
        lexical: Option<LexicalIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        weights: FusionWeights,
    ) -> Self {
        Self {
            chunks,
            semantic,
            lexical,
            embedder,
            weights,
        }
    }

    /// Whether keyword retrieval participates in fusion
    pub fn lexical_available(&self) -> bool {
        self.lexical.is_some()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Top `k` from each index, fused. Scores are fused weighted scores.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let semantic = self.semantic.search(&query_embedding, k)?;

        let fused = match &self.lexical {
            Some(index) => weighted_fusion(&semantic, &index.search(query, k), self.weights),
            None => {
                tracing::warn!("Lexical index missing, fusing semantic results only");
                weighted_fusion(&semantic, &[], self.weights)
            }
        };

        tracing::debug!(
            semantic_hits = semantic.len(),
            fused_hits = fused.len(),
            "Fusion retrieval for \"{}\"",
            query
        );

        fused
            .into_iter()
            .map(|(position, score)| {
                self.chunks
                    .get(position)
                    .map(|chunk| ScoredChunk {
                        chunk: Arc::clone(chunk),
                        score,
                    })
                    .ok_or_else(|| Error::internal(format!("index returned unknown chunk {}", position)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_in_both_lists_wins() {
        let semantic = vec![(1, 0.92), (2, 0.80), (3, 0.75)];
        let lexical = vec![(1, 7.5), (4, 3.0), (2, 1.0)];

        let fused = weighted_fusion(&semantic, &lexical, FusionWeights::default());
        assert_eq!(fused[0].0, 1);
        assert!((fused[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(fused.len(), 4);
    }

    #[test]
    fn test_semantic_only_preserves_order() {
        let semantic = vec![(5, 0.9), (3, 0.5), (8, 0.1)];
        let fused = weighted_fusion(&semantic, &[], FusionWeights::default());
        let ids: Vec<usize> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![5, 3, 8]);
    }

    #[test]
    fn test_ties_broken_by_semantic_rank() {
        // Equal scores normalize to 1.0 everywhere
        let semantic = vec![(7, 0.5), (2, 0.5)];
        let lexical = vec![(2, 3.0), (7, 3.0)];
        let fused = weighted_fusion(&semantic, &lexical, FusionWeights::default());
        assert_eq!(fused[0].0, 7);
        assert_eq!(fused[1].0, 2);
    }

    #[test]
    fn test_lexical_only_ranks_after_semantic_ties() {
        let weights = FusionWeights {
            semantic: 0.5,
            lexical: 0.5,
        };
        let fused = weighted_fusion(&[(1, 0.3)], &[(9, 4.0)], weights);
        assert_eq!(fused[0].0, 1);
        assert_eq!(fused[1].0, 9);
    }

    /// Counts of a, b and c, plus a constant so no vector is zero
    struct Abc;

    #[async_trait::async_trait]
    impl EmbeddingProvider for Abc {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let count = |ch: char| text.chars().filter(|c| *c == ch).count() as f32;
            Ok(vec![count('a'), count('b'), count('c'), 0.01])
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "abc"
        }
    }

    fn chunk(position: usize, content: &str) -> Chunk {
        Chunk {
            id: uuid::Uuid::new_v4(),
            position,
            content: content.to_string(),
            source: crate::types::ChunkSource {
                filename: "rfp.txt".into(),
                page_number: None,
                start: 0,
                end: content.len(),
            },
        }
    }

    #[tokio::test]
    async fn test_retrieve_without_lexical_index() {
        let chunks: Vec<Arc<Chunk>> = ["bbbb", "aaab", "aaaa"]
            .iter()
            .enumerate()
            .map(|(i, text)| Arc::new(chunk(i, text)))
            .collect();
        let embeddings = vec![
            vec![0.0, 4.0, 0.0, 0.01],
            vec![3.0, 1.0, 0.0, 0.01],
            vec![4.0, 0.0, 0.0, 0.01],
        ];
        let retriever = FusionRetriever::from_parts(
            chunks,
            SemanticIndex::build(embeddings).unwrap(),
            None,
            Arc::new(Abc),
            FusionWeights::default(),
        );
        assert!(!retriever.lexical_available());
        assert_eq!(retriever.chunk_count(), 3);

        let results = retriever.retrieve("aaa", 2).await.unwrap();
        let positions: Vec<usize> = results.iter().map(|r| r.chunk.position).collect();
        assert_eq!(positions, vec![2, 1]);
        assert!((results[0].score - 0.8).abs() < 1e-6);
        assert!(results[1].score.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_build_indexes_both_stages() {
        let chunks = vec![
            chunk(0, "aaaa proposal deadline"),
            chunk(1, "bbbb page limit"),
            chunk(2, "cccc font size"),
        ];
        let retriever = FusionRetriever::build(chunks, Arc::new(Abc), FusionWeights::default(), 2)
            .await
            .unwrap();
        assert!(retriever.lexical_available());
        assert_eq!(retriever.chunk_count(), 3);

        let results = retriever.retrieve("bbbb page limit", 3).await.unwrap();
        assert_eq!(results[0].chunk.position, 1);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(weighted_fusion(&[], &[], FusionWeights::default()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_shared_top_hit_stays_first(
            semantic_weight in 0.01f32..1.0,
            lexical_weight in 0.01f32..1.0,
            sem_tail in proptest::collection::vec(0.0f32..0.9, 0..6),
            lex_tail in proptest::collection::vec(0.0f32..9.0, 0..6),
        ) {
            let mut semantic = vec![(0usize, 0.95f32)];
            semantic.extend(sem_tail.iter().enumerate().map(|(i, s)| (i + 1, *s)));
            let mut lexical = vec![(0usize, 10.0f32)];
            lexical.extend(lex_tail.iter().enumerate().map(|(i, s)| (i + 100, *s)));

            let weights = FusionWeights { semantic: semantic_weight, lexical: lexical_weight };
            let fused = weighted_fusion(&semantic, &lexical, weights);
            prop_assert_eq!(fused[0].0, 0);
        }
    }
}
