//! Per-campaign signal extraction.
//!
//! Computes the three ranking signals for each campaign expansion, before
//! they are blended into one score.

use data_loader::{CampaignExpansion, CampaignId, EngagementScores, NeighborUser};
use rayon::prelude::*;

use crate::weights::clamp_unit;

/// The three signals computed for one campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignSignals {
    pub campaign_id: CampaignId,

    /// Mean similarity of the neighbors connected to this campaign (0 if none)
    pub avg_similarity: f32,

    /// `min(user_count / neighbor pool size, 1.0)`, 0 for an empty pool
    pub user_count_score: f32,

    /// Normalized engagement, 0 when the analytics batch had no row for it
    pub engagement_score: f32,
}

/// Computes signals for every expansion against one neighbor pool.
pub struct SignalExtractor<'a> {
    neighbors: &'a [NeighborUser],
    engagement: &'a EngagementScores,
}

impl<'a> SignalExtractor<'a> {
    pub fn new(neighbors: &'a [NeighborUser], engagement: &'a EngagementScores) -> Self {
        Self { neighbors, engagement }
    }

    /// Signals for one campaign
    pub fn extract(&self, expansion: &CampaignExpansion) -> CampaignSignals {
        let connected = expansion.user_set();

        let relevant: Vec<f32> = self
            .neighbors
            .iter()
            .filter(|n| connected.contains(n.user_id.as_str()))
            .map(|n| clamp_unit(n.similarity))
            .collect();
        let avg_similarity = if relevant.is_empty() {
            0.0
        } else {
            relevant.iter().sum::<f32>() / relevant.len() as f32
        };

        let user_count_score = if self.neighbors.is_empty() {
            0.0
        } else {
            (expansion.user_count as f32 / self.neighbors.len() as f32).min(1.0)
        };

        let engagement_score = self
            .engagement
            .get(&expansion.campaign_id)
            .copied()
            .unwrap_or(0.0);

        CampaignSignals {
            campaign_id: expansion.campaign_id.clone(),
            avg_similarity: clamp_unit(avg_similarity),
            user_count_score: clamp_unit(user_count_score),
            engagement_score: clamp_unit(engagement_score),
        }
    }

    /// Signals for all campaigns, in the same order as `expansions`
    pub fn extract_all(&self, expansions: &[CampaignExpansion]) -> Vec<CampaignSignals> {
        // par_iter().collect() preserves input order
        expansions.par_iter().map(|e| self.extract(e)).collect()
    }
}
