//! Engagement Scorer
//!
//! Turns raw engagement counts from the analytics store into frequencies in
//! `[0, 1]`, normalized against the largest count in the same batch.

use crate::error::SourceError;
use crate::traits::AnalyticsStore;
use data_loader::{CampaignId, EngagementCount, EngagementScores};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Normalize raw counts by the batch maximum: `count / max(count)`.
///
/// Empty when there are no rows or every count is zero.
pub fn normalize_counts(rows: &[EngagementCount]) -> EngagementScores {
    let max_count = rows.iter().map(|r| r.count).max().unwrap_or(0);
    if max_count == 0 {
        return EngagementScores::new();
    }

    rows.iter()
        .map(|row| {
            let frequency = (row.count as f64 / max_count as f64) as f32;
            (row.campaign_id.clone(), frequency.clamp(0.0, 1.0))
        })
        .collect()
}

/// Scores campaigns by normalized historical engagement
#[derive(Clone)]
pub struct EngagementScorer {
    store: Arc<dyn AnalyticsStore>,
}

impl EngagementScorer {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &str {
        self.store.name()
    }

    pub async fn health_check(&self) -> Result<(), SourceError> {
        self.store.health_check().await
    }

    #[instrument(skip(self, campaign_ids), fields(campaigns = campaign_ids.len()))]
    pub async fn try_score_engagement(&self, campaign_ids: &[CampaignId]) -> Result<EngagementScores, SourceError> {
        if campaign_ids.is_empty() {
            return Ok(EngagementScores::new());
        }

        let rows = self.store.engagement_counts(campaign_ids).await?;
        let scores = normalize_counts(&rows);
        debug!("Normalized {} engagement rows into {} scores", rows.len(), scores.len());
        Ok(scores)
    }

    /// Like [`Self::try_score_engagement`], but failures degrade to an empty map
    pub async fn score_engagement(&self, campaign_ids: &[CampaignId]) -> EngagementScores {
        self.try_score_engagement(campaign_ids)
            .await
            .unwrap_or_else(|e| {
                warn!("Error getting campaign engagement frequency: {}", e);
                EngagementScores::new()
            })
    }
}
