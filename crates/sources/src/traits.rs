//! Query contracts for the three backing stores.
//!
//! Each trait is the minimal surface the pipeline issues against one store.
//! Concrete stores (in-memory, gRPC) implement them; clients hold them as
//! `Arc<dyn Trait>` so every stage can be swapped or mocked independently.

use crate::error::SourceError;
use async_trait::async_trait;
use data_loader::{CampaignExpansion, CampaignId, Embedding, EngagementCount, UserId, VectorHit};

/// Vector index holding one embedding per (user, campaign, message).
///
/// ## Design Note
/// - `Send + Sync` lets one handle serve concurrent requests
/// - Handles are read-only after construction
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns the name of this store (for logging and errors)
    fn name(&self) -> &str;

    /// Fails if the store cannot currently serve queries
    async fn health_check(&self) -> Result<(), SourceError>;

    /// Exact-match filter on `user_id`, returning up to `limit` stored embeddings.
    ///
    /// An unpopulated index returns `Ok(vec![])`, not an error.
    async fn user_embeddings(&self, user_id: &str, limit: usize) -> Result<Vec<Embedding>, SourceError>;

    /// Nearest-neighbor search by squared Euclidean distance, closest first
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<VectorHit>, SourceError>;
}

/// Graph of `User -[:SENT]-> Message -[:ABOUT]-> Campaign`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    fn name(&self) -> &str;

    async fn health_check(&self) -> Result<(), SourceError>;

    /// Campaigns connected to any of `user_ids`, each with its distinct
    /// connected users, ordered by user count descending
    async fn campaigns_for_users(&self, user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError>;
}

/// Analytics store of historical engagement.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    fn name(&self) -> &str;

    async fn health_check(&self) -> Result<(), SourceError>;

    /// Raw engagement counts for the campaigns that have any analytics rows
    async fn engagement_counts(&self, campaign_ids: &[CampaignId]) -> Result<Vec<EngagementCount>, SourceError>;
}
