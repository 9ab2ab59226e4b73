//! Shared fixtures for the unit tests in this crate.

use crate::error::SourceError;
use crate::traits::{AnalyticsStore, GraphStore, VectorIndex};
use async_trait::async_trait;
use data_loader::{CampaignExpansion, CampaignId, Embedding, EngagementCount, MessageRecord, UserId, VectorHit};

pub(crate) fn message(user: &str, campaign: &str, embedding: Vec<f32>) -> MessageRecord {
    MessageRecord {
        user_id: user.to_string(),
        campaign_id: campaign.to_string(),
        message: format!("{} on {}", user, campaign),
        embedding,
    }
}

/// A store that is always unreachable
pub(crate) struct DownStore;

fn down() -> SourceError {
    SourceError::unavailable("down", "connection refused")
}

#[async_trait]
impl VectorIndex for DownStore {
    fn name(&self) -> &str {
        "down"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Err(down())
    }

    async fn user_embeddings(&self, _user_id: &str, _limit: usize) -> Result<Vec<Embedding>, SourceError> {
        Err(down())
    }

    async fn search(&self, _query: &[f32], _limit: usize) -> Result<Vec<VectorHit>, SourceError> {
        Err(down())
    }
}

#[async_trait]
impl GraphStore for DownStore {
    fn name(&self) -> &str {
        "down"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Err(down())
    }

    async fn campaigns_for_users(&self, _user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError> {
        Err(down())
    }
}

#[async_trait]
impl AnalyticsStore for DownStore {
    fn name(&self) -> &str {
        "down"
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        Err(down())
    }

    async fn engagement_counts(&self, _campaign_ids: &[CampaignId]) -> Result<Vec<EngagementCount>, SourceError> {
        Err(down())
    }
}
