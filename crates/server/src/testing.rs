//! Fixtures and mock stores shared by the unit tests in this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use data_loader::{CampaignExpansion, CampaignId, DataIndex, Embedding, EngagementCount, MessageRecord, UserId, VectorHit};
use sources::memory::{InMemoryAnalyticsStore, InMemoryGraphStore, InMemoryVectorIndex};
use sources::{AnalyticsStore, GraphStore, SourceError, VectorIndex};

pub(crate) fn message(user: &str, campaign: &str, embedding: Vec<f32>) -> MessageRecord {
    MessageRecord {
        user_id: user.to_string(),
        campaign_id: campaign.to_string(),
        message: format!("{} about {}", user, campaign),
        embedding,
    }
}

/// Seven users on a plane around `alice` at the origin.
///
/// alice's five nearest neighbors are bob, carol, dave, erin and frank;
/// gina is too far away to be picked.
pub(crate) fn build_test_data_index() -> Arc<DataIndex> {
    let mut index = DataIndex::new();
    index.insert_message(message("alice", "c_alice", vec![0.0, 0.0]));
    index.insert_message(message("bob", "c1", vec![1.0, 0.0]));
    index.insert_message(message("bob", "c2", vec![1.0, 0.0]));
    index.insert_message(message("carol", "c2", vec![0.0, 1.0]));
    index.insert_message(message("carol", "c3", vec![0.0, 1.0]));
    index.insert_message(message("dave", "c3", vec![2.0, 0.0]));
    index.insert_message(message("erin", "c4", vec![0.0, 2.0]));
    index.insert_message(message("frank", "c5", vec![3.0, 3.0]));
    index.insert_message(message("gina", "c6", vec![5.0, 5.0]));

    index.set_engagement("c1", 10);
    index.set_engagement("c2", 50);
    index.set_engagement("c3", 20);
    index.set_engagement("c4", 5);
    index.set_engagement("c6", 100);
    Arc::new(index)
}

pub(crate) fn in_memory_stores(
    index: Arc<DataIndex>,
) -> (Arc<dyn VectorIndex>, Arc<dyn GraphStore>, Arc<dyn AnalyticsStore>) {
    (
        Arc::new(InMemoryVectorIndex::new(index.clone())),
        Arc::new(InMemoryGraphStore::new(index.clone())),
        Arc::new(InMemoryAnalyticsStore::new(index)),
    )
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Unavailable,
    InvalidData,
}

/// Vector index that fails every call the same way
pub(crate) struct FailingVectorIndex(pub Failure);

impl FailingVectorIndex {
    fn error(&self) -> SourceError {
        match self.0 {
            Failure::Unavailable => SourceError::unavailable("vector_index", "connection refused"),
            Failure::InvalidData => SourceError::invalid_data("vector_index", "mixed embedding dimensions"),
        }
    }
}

#[async_trait]
impl VectorIndex for FailingVectorIndex {
    fn name(&self) -> &str {
        "vector_index"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Err(self.error())
    }

    async fn user_embeddings(&self, _user_id: &str, _limit: usize) -> Result<Vec<Embedding>, SourceError> {
        Err(self.error())
    }

    async fn search(&self, _query: &[f32], _limit: usize) -> Result<Vec<VectorHit>, SourceError> {
        Err(self.error())
    }
}

pub(crate) struct FailingGraph;

#[async_trait]
impl GraphStore for FailingGraph {
    fn name(&self) -> &str {
        "graph_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Err(SourceError::unavailable("graph_store", "connection refused"))
    }

    async fn campaigns_for_users(&self, _user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError> {
        Err(SourceError::Timeout {
            backend: "graph_store".to_string(),
        })
    }
}

pub(crate) struct FailingAnalytics;

#[async_trait]
impl AnalyticsStore for FailingAnalytics {
    fn name(&self) -> &str {
        "analytics_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Err(SourceError::unavailable("analytics_store", "connection refused"))
    }

    async fn engagement_counts(&self, _campaign_ids: &[CampaignId]) -> Result<Vec<EngagementCount>, SourceError> {
        Err(SourceError::unavailable("analytics_store", "connection refused"))
    }
}

/// Graph store with a bug: healthy, but panics on every query
pub(crate) struct PanickingGraph;

#[async_trait]
impl GraphStore for PanickingGraph {
    fn name(&self) -> &str {
        "graph_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn campaigns_for_users(&self, _user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError> {
        panic!("graph exploded");
    }
}

/// In-memory vector index that counts embedding lookups and answers slowly
pub(crate) struct CountingVectorIndex {
    inner: InMemoryVectorIndex,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingVectorIndex {
    pub(crate) fn new(index: Arc<DataIndex>, delay: Duration) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner: InMemoryVectorIndex::new(index),
                calls: calls.clone(),
                delay,
            },
            calls,
        )
    }
}

#[async_trait]
impl VectorIndex for CountingVectorIndex {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        self.inner.health_check().await
    }

    async fn user_embeddings(&self, user_id: &str, limit: usize) -> Result<Vec<Embedding>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.user_embeddings(user_id, limit).await
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<VectorHit>, SourceError> {
        self.inner.search(query, limit).await
    }
}

/// Vector index with fixed search hits; every user embeds at the origin
pub(crate) struct ScriptedVectorIndex {
    hits: Vec<VectorHit>,
    delay: Duration,
    searches: Arc<AtomicUsize>,
}

impl ScriptedVectorIndex {
    pub(crate) fn new(hits: &[(&str, f32)]) -> Self {
        Self {
            hits: hits
                .iter()
                .map(|(user, distance)| VectorHit {
                    user_id: user.to_string(),
                    campaign_id: format!("{}_campaign", user),
                    distance: *distance,
                })
                .collect(),
            delay: Duration::ZERO,
            searches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer embedding lookups only after `delay`
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn searches(&self) -> Arc<AtomicUsize> {
        self.searches.clone()
    }
}

#[async_trait]
impl VectorIndex for ScriptedVectorIndex {
    fn name(&self) -> &str {
        "vector_index"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn user_embeddings(&self, _user_id: &str, _limit: usize) -> Result<Vec<Embedding>, SourceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(vec![vec![0.0, 0.0]])
    }

    async fn search(&self, _query: &[f32], limit: usize) -> Result<Vec<VectorHit>, SourceError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

/// Graph store that connects every queried user to one campaign, or to none
pub(crate) struct EchoGraph(pub Option<&'static str>);

#[async_trait]
impl GraphStore for EchoGraph {
    fn name(&self) -> &str {
        "graph_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn campaigns_for_users(&self, user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError> {
        Ok(self
            .0
            .map(|campaign| vec![CampaignExpansion::new(campaign, user_ids.to_vec())])
            .unwrap_or_default())
    }
}

/// Healthy analytics store without any rows
pub(crate) struct EmptyAnalytics;

#[async_trait]
impl AnalyticsStore for EmptyAnalytics {
    fn name(&self) -> &str {
        "analytics_store"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn engagement_counts(&self, _campaign_ids: &[CampaignId]) -> Result<Vec<EngagementCount>, SourceError> {
        Ok(Vec::new())
    }
}
