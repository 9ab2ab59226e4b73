//! In-memory stores backed by a shared [`DataIndex`].
//!
//! These implement the three store contracts over data loaded from disk, so
//! the pipeline can run locally and in tests without any external service.

use crate::error::SourceError;
use crate::traits::{AnalyticsStore, GraphStore, VectorIndex};
use async_trait::async_trait;
use data_loader::{CampaignExpansion, CampaignId, DataIndex, Embedding, EngagementCount, UserId, VectorHit};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Squared Euclidean distance between two equal-length vectors
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Brute-force vector index over every stored message
pub struct InMemoryVectorIndex {
    data_index: Arc<DataIndex>,
}

impl InMemoryVectorIndex {
    pub fn new(data_index: Arc<DataIndex>) -> Self {
        Self { data_index }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "vector_index"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn user_embeddings(&self, user_id: &str, limit: usize) -> Result<Vec<Embedding>, SourceError> {
        Ok(self
            .data_index
            .get_user_messages(user_id)
            .into_iter()
            .take(limit)
            .map(|m| m.embedding.clone())
            .collect())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<VectorHit>, SourceError> {
        if self.data_index.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(dimension) = self.data_index.dimension()
            && dimension != query.len()
        {
            return Err(SourceError::invalid_data(
                self.name(),
                format!("query has {} dimensions, index has {}", query.len(), dimension),
            ));
        }

        // The scan touches every stored message, so keep it off the async workers
        let data_index = self.data_index.clone();
        let query = query.to_vec();
        tokio::task::spawn_blocking(move || nearest_messages(&data_index, &query, limit))
            .await
            .map_err(|e| SourceError::query(self.name(), e))
    }
}

/// Exact nearest messages to `query`, closest first.
///
/// Ties keep insertion order.
pub fn nearest_messages(data_index: &DataIndex, query: &[f32], limit: usize) -> Vec<VectorHit> {
    let messages = data_index.messages();

    // par_iter().collect() keeps message order, so the stable sort below
    // breaks ties by insertion order
    let mut scored: Vec<(usize, f32)> = messages
        .par_iter()
        .enumerate()
        .map(|(i, m)| (i, squared_euclidean(query, &m.embedding)))
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(i, distance)| VectorHit {
            user_id: messages[i].user_id.clone(),
            campaign_id: messages[i].campaign_id.clone(),
            distance,
        })
        .collect()
}

/// Graph traversal over the message edges of a [`DataIndex`]
pub struct InMemoryGraphStore {
    data_index: Arc<DataIndex>,
}

impl InMemoryGraphStore {
    pub fn new(data_index: Arc<DataIndex>) -> Self {
        Self { data_index }
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    fn name(&self) -> &str {
        "graph_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn campaigns_for_users(&self, user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError> {
        let mut seen_users: HashSet<&str> = HashSet::new();
        let mut order: Vec<CampaignId> = Vec::new();
        let mut users_by_campaign: HashMap<CampaignId, Vec<UserId>> = HashMap::new();

        for user_id in user_ids {
            if !seen_users.insert(user_id.as_str()) {
                continue;
            }
            for campaign_id in self.data_index.get_user_campaigns(user_id) {
                let users = users_by_campaign.entry(campaign_id.clone()).or_insert_with(|| {
                    order.push(campaign_id.clone());
                    Vec::new()
                });
                users.push(user_id.clone());
            }
        }

        let mut campaigns: Vec<CampaignExpansion> = order
            .into_iter()
            .filter_map(|campaign_id| {
                let users = users_by_campaign.remove(&campaign_id)?;
                Some(CampaignExpansion::new(campaign_id, users))
            })
            .collect();

        // Count descending; ties by campaign id so results are reproducible
        campaigns.sort_by(|a, b| {
            b.user_count
                .cmp(&a.user_count)
                .then_with(|| a.campaign_id.cmp(&b.campaign_id))
        });
        Ok(campaigns)
    }
}

/// Engagement counts held in a [`DataIndex`]
pub struct InMemoryAnalyticsStore {
    data_index: Arc<DataIndex>,
}

impl InMemoryAnalyticsStore {
    pub fn new(data_index: Arc<DataIndex>) -> Self {
        Self { data_index }
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryAnalyticsStore {
    fn name(&self) -> &str {
        "analytics_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn engagement_counts(&self, campaign_ids: &[CampaignId]) -> Result<Vec<EngagementCount>, SourceError> {
        let mut seen: HashSet<&str> = HashSet::new();
        Ok(campaign_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| {
                self.data_index.get_engagement(id).map(|count| EngagementCount {
                    campaign_id: id.clone(),
                    count,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::message;

    #[test]
    fn test_squared_euclidean() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_euclidean(&[1.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_returns_closest_first() {
        let mut index = DataIndex::new();
        index.insert_message(message("far", "c1", vec![10.0, 0.0]));
        index.insert_message(message("near", "c2", vec![1.0, 0.0]));
        index.insert_message(message("mid", "c3", vec![3.0, 0.0]));
        let store = InMemoryVectorIndex::new(Arc::new(index));

        let hits = store.search(&[0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].user_id, "near");
        assert_eq!(hits[0].distance, 1.0);
        assert_eq!(hits[1].user_id, "mid");
        assert_eq!(hits[1].distance, 9.0);
    }

    #[test]
    fn test_nearest_messages_ties_keep_insertion_order() {
        let mut index = DataIndex::new();
        index.insert_message(message("first", "c1", vec![1.0, 0.0]));
        index.insert_message(message("second", "c2", vec![0.0, 1.0]));
        index.insert_message(message("third", "c3", vec![-1.0, 0.0]));

        let hits = nearest_messages(&index, &[0.0, 0.0], 3);
        let ids: Vec<_> = hits.iter().map(|h| h.user_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_searches_share_the_index() {
        let mut index = DataIndex::new();
        for i in 0..2_000 {
            index.insert_message(message(&format!("u{}", i), "c", vec![i as f32, 0.0]));
        }
        let store = Arc::new(InMemoryVectorIndex::new(Arc::new(index)));

        let searches: Vec<_> = (0..8)
            .map(|q| {
                let store = store.clone();
                tokio::spawn(async move { store.search(&[q as f32 * 100.0, 0.0], 3).await })
            })
            .collect();

        for (q, search) in searches.into_iter().enumerate() {
            let hits = search.await.unwrap().unwrap();
            assert_eq!(hits.len(), 3);
            assert_eq!(hits[0].user_id, format!("u{}", q * 100));
            assert_eq!(hits[0].distance, 0.0);
        }
    }

    #[tokio::test]
    async fn test_search_rejects_wrong_dimension() {
        let mut index = DataIndex::new();
        index.insert_message(message("u", "c", vec![1.0, 0.0]));
        let store = InMemoryVectorIndex::new(Arc::new(index));

        let err = store.search(&[0.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidData { .. }));
    }

    #[tokio::test]
    async fn test_unpopulated_index_is_empty_not_error() {
        let store = InMemoryVectorIndex::new(Arc::new(DataIndex::new()));
        assert!(store.search(&[0.0], 5).await.unwrap().is_empty());
        assert!(store.user_embeddings("u", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_embeddings_respects_limit() {
        let mut index = DataIndex::new();
        for i in 0..5 {
            index.insert_message(message("u", "c", vec![i as f32]));
        }
        let store = InMemoryVectorIndex::new(Arc::new(index));
        assert_eq!(store.user_embeddings("u", 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_graph_ties_break_by_campaign_id() {
        let mut index = DataIndex::new();
        index.insert_message(message("a", "zeta", vec![0.0]));
        index.insert_message(message("a", "alpha", vec![0.0]));
        let store = InMemoryGraphStore::new(Arc::new(index));

        let campaigns = store.campaigns_for_users(&["a".to_string(), "a".to_string()]).await.unwrap();
        let ids: Vec<_> = campaigns.iter().map(|c| c.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert!(campaigns.iter().all(|c| c.user_count == 1));
    }

    #[tokio::test]
    async fn test_analytics_skips_campaigns_without_rows() {
        let mut index = DataIndex::new();
        index.set_engagement("a", 3);
        let store = InMemoryAnalyticsStore::new(Arc::new(index));

        let rows = store
            .engagement_counts(&["a".to_string(), "a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(rows, vec![EngagementCount { campaign_id: "a".to_string(), count: 3 }]);
    }
}
