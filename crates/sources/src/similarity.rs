//! Similarity Client - Behavioral Neighbors
//!
//! Finds users who behave like the query user by comparing embeddings:
//! "Users whose messages read like yours"
//!
//! ## Algorithm
//! 1. Resolve the user's aggregate embedding: the element-wise mean of every
//!    message embedding stored for them
//! 2. Search the vector index for `fanout × 10` raw hits (hits are per
//!    message, so one user can appear many times, including the query user)
//! 3. Drop the query user, collapse repeated users by averaging their raw
//!    distance, sort by that distance ascending
//! 4. Keep `fanout` users and convert distance to similarity with `1 / (1 + d)`

use crate::error::{EmbeddingError, SourceError};
use crate::traits::VectorIndex;
use data_loader::{Embedding, NeighborUser, UserId, VectorHit};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Number of neighbor users that seed the rest of the pipeline.
///
/// Independent of the caller's `top_k`.
pub const NEIGHBOR_FANOUT: usize = 5;

/// Raw hits requested per neighbor wanted, to absorb duplicate and self matches
pub const SEARCH_OVERSAMPLE: usize = 10;

/// Maximum stored embeddings read when averaging a user's vector
pub const USER_EMBEDDING_LIMIT: usize = 1000;

/// Convert a squared Euclidean distance into a similarity in `(0, 1]`.
///
/// `0 → 1.0`, strictly decreasing, positive for every finite distance.
/// Negative inputs are treated as 0 and NaN maps to 0.
pub fn distance_to_similarity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    let distance = distance.max(0.0);
    (1.0 / (1.0 + distance)).clamp(0.0, 1.0)
}

/// Element-wise mean of a set of embeddings.
///
/// Returns `Ok(None)` for an empty set and an error if dimensions disagree.
pub fn mean_embedding(embeddings: &[Embedding]) -> Result<Option<Embedding>, EmbeddingError> {
    let Some(first) = embeddings.first() else {
        return Ok(None);
    };
    let dimension = first.len();
    if dimension == 0 {
        return Err(EmbeddingError::ZeroDimension);
    }

    let mut sum = vec![0.0f64; dimension];
    for embedding in embeddings {
        if embedding.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                found: embedding.len(),
            });
        }
        for (acc, value) in sum.iter_mut().zip(embedding) {
            *acc += f64::from(*value);
        }
    }

    let count = embeddings.len() as f64;
    Ok(Some(sum.into_iter().map(|v| (v / count) as f32).collect()))
}

/// Collapse raw hits into at most `fanout` neighbors.
///
/// Users keep their first-seen order when their averaged distances tie.
pub fn collapse_hits(hits: &[VectorHit], exclude_user: &str, fanout: usize) -> Vec<NeighborUser> {
    // (user, distance sum, hit count) in first-seen order
    let mut collapsed: Vec<(UserId, f64, u32)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for hit in hits {
        if hit.user_id == exclude_user {
            continue;
        }
        match positions.get(hit.user_id.as_str()) {
            Some(&i) => {
                collapsed[i].1 += f64::from(hit.distance);
                collapsed[i].2 += 1;
            }
            None => {
                positions.insert(hit.user_id.as_str(), collapsed.len());
                collapsed.push((hit.user_id.clone(), f64::from(hit.distance), 1));
            }
        }
    }

    let mut averaged: Vec<(UserId, f32, u32)> = collapsed
        .into_iter()
        .map(|(user_id, sum, count)| (user_id, (sum / f64::from(count)) as f32, count))
        .collect();

    // Stable sort: equal distances keep first-seen order
    averaged.sort_by(|a, b| a.1.total_cmp(&b.1));
    averaged.truncate(fanout);

    averaged
        .into_iter()
        .map(|(user_id, distance, hit_count)| NeighborUser {
            user_id,
            similarity: distance_to_similarity(distance),
            hit_count,
        })
        .collect()
}

/// Resolves user embeddings and finds nearest-neighbor users
#[derive(Clone)]
pub struct SimilarityClient {
    /// Shared handle to the vector index (read-only, so no Mutex needed)
    index: Arc<dyn VectorIndex>,

    /// Cap on embeddings read per user
    embedding_limit: usize,
}

impl SimilarityClient {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            embedding_limit: USER_EMBEDDING_LIMIT,
        }
    }

    /// Configure how many stored embeddings are averaged per user (default: 1000)
    pub fn with_embedding_limit(mut self, limit: usize) -> Self {
        self.embedding_limit = limit.max(1);
        self
    }

    pub fn embedding_limit(&self) -> usize {
        self.embedding_limit
    }

    pub fn backend_name(&self) -> &str {
        self.index.name()
    }

    pub async fn health_check(&self) -> Result<(), SourceError> {
        self.index.health_check().await
    }

    /// Average all stored embeddings for `user_id`.
    ///
    /// `Ok(None)` means the user has no embeddings (or the index is empty).
    #[instrument(skip(self))]
    pub async fn try_resolve_user_embedding(&self, user_id: &str) -> Result<Option<Embedding>, SourceError> {
        let embeddings = self.index.user_embeddings(user_id, self.embedding_limit).await?;
        debug!("Read {} stored embeddings for user {}", embeddings.len(), user_id);

        mean_embedding(&embeddings).map_err(|e| SourceError::invalid_data(self.index.name(), e))
    }

    /// Like [`Self::try_resolve_user_embedding`], but failures degrade to `None`
    pub async fn resolve_user_embedding(&self, user_id: &str) -> Option<Embedding> {
        match self.try_resolve_user_embedding(user_id).await {
            Ok(Some(embedding)) => Some(embedding),
            Ok(None) => {
                warn!("No embeddings found for user {}", user_id);
                None
            }
            Err(e) => {
                warn!("Error getting embedding for user {}: {}", user_id, e);
                None
            }
        }
    }

    /// Nearest neighbors of `embedding`, excluding `exclude_user`
    #[instrument(skip(self, embedding), fields(dimension = embedding.len()))]
    pub async fn try_find_similar_users(
        &self,
        embedding: &[f32],
        exclude_user: &str,
        fanout: usize,
    ) -> Result<Vec<NeighborUser>, SourceError> {
        if fanout == 0 {
            return Ok(Vec::new());
        }

        let hits = self
            .index
            .search(embedding, fanout.saturating_mul(SEARCH_OVERSAMPLE))
            .await?;
        let neighbors = collapse_hits(&hits, exclude_user, fanout);

        debug!(
            "Collapsed {} raw hits into {} neighbors",
            hits.len(),
            neighbors.len()
        );
        Ok(neighbors)
    }

    /// Like [`Self::try_find_similar_users`], but failures degrade to an empty list
    pub async fn find_similar_users(&self, embedding: &[f32], exclude_user: &str, fanout: usize) -> Vec<NeighborUser> {
        self.try_find_similar_users(embedding, exclude_user, fanout)
            .await
            .unwrap_or_else(|e| {
                warn!("Error in vector search for user {}: {}", exclude_user, e);
                Vec::new()
            })
    }

    /// Resolve the user's embedding and search in one step
    pub async fn similar_users_for(&self, user_id: &str, fanout: usize) -> Vec<NeighborUser> {
        match self.resolve_user_embedding(user_id).await {
            Some(embedding) => self.find_similar_users(&embedding, user_id, fanout).await,
            None => Vec::new(),
        }
    }
}
