//! Ranking Engine
//!
//! Merges similarity, graph proximity and engagement into one explainable
//! score per campaign, then sorts and truncates.
//!
//! ## Algorithm
//! For each campaign expansion:
//! 1. Extract the three signals (see [`crate::features`])
//! 2. `score = 0.3·similarity + 0.2·user_count + 0.5·engagement`
//! 3. `confidence = min(score × 1.2, 1.0)`
//! 4. Attach an explanation and up to three connected neighbors
//!
//! The result is sorted by score descending with a stable sort, so equal
//! scores keep the graph's original order, and truncated to `top_k`.

use data_loader::{CampaignExpansion, EngagementScores, NeighborUser, Recommendation, RecommendationMetadata};
use tracing::debug;

use crate::features::{CampaignSignals, SignalExtractor};
use crate::weights::{confidence_for, ScoreWeights, MAX_SIMILAR_USERS};

/// Human-readable reason shown with each recommendation
pub fn explanation_for(user_count: u32) -> String {
    format!(
        "Recommended because {} similar users engaged with this campaign",
        user_count
    )
}

/// Blends the three signals into a bounded, sorted recommendation list
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    weights: ScoreWeights,
}

impl RankingEngine {
    pub fn new() -> Self {
        Self {
            weights: ScoreWeights::DEFAULT,
        }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Rank `expansions` and keep the best `top_k`
    pub fn rank(
        &self,
        neighbors: &[NeighborUser],
        expansions: &[CampaignExpansion],
        engagement: &EngagementScores,
        top_k: usize,
    ) -> Vec<Recommendation> {
        let signals = SignalExtractor::new(neighbors, engagement).extract_all(expansions);

        let mut recommendations: Vec<Recommendation> = expansions
            .iter()
            .zip(signals)
            .map(|(expansion, signals)| self.recommend(expansion, signals))
            .collect();

        // sort_by is stable: ties keep expansion order
        recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
        recommendations.truncate(top_k);

        debug!(
            "Ranked {} campaigns, kept {} (top_k = {})",
            expansions.len(),
            recommendations.len(),
            top_k
        );
        recommendations
    }

    fn recommend(&self, expansion: &CampaignExpansion, signals: CampaignSignals) -> Recommendation {
        let score = self.weights.combine(
            signals.avg_similarity,
            signals.user_count_score,
            signals.engagement_score,
        );

        Recommendation {
            campaign_id: signals.campaign_id,
            score,
            confidence: confidence_for(score),
            explanation: explanation_for(expansion.user_count),
            metadata: RecommendationMetadata {
                similarity_score: signals.avg_similarity,
                user_count: expansion.user_count,
                engagement_frequency: signals.engagement_score,
                similar_users: expansion
                    .user_list
                    .iter()
                    .take(MAX_SIMILAR_USERS)
                    .cloned()
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(user: &str, similarity: f32) -> NeighborUser {
        NeighborUser {
            user_id: user.to_string(),
            similarity,
            hit_count: 1,
        }
    }

    fn users(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_neighbor_scenario() {
        // Distances 0 and 1 give similarities 1.0 and 0.5
        let neighbors = vec![neighbor("n1", 1.0), neighbor("n2", 0.5)];
        let expansions = vec![CampaignExpansion::new("c1", users(&["n1", "n2"]))];

        let recs = RankingEngine::new().rank(&neighbors, &expansions, &EngagementScores::new(), 5);

        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert!((rec.metadata.similarity_score - 0.75).abs() < 1e-6);
        assert_eq!(rec.metadata.engagement_frequency, 0.0);
        assert!((rec.score - 0.425).abs() < 1e-6);
        assert!((rec.confidence - 0.51).abs() < 1e-6);
        assert_eq!(
            rec.explanation,
            "Recommended because 2 similar users engaged with this campaign"
        );
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let neighbors = vec![neighbor("a", 0.9), neighbor("b", 0.8)];
        let expansions = vec![
            CampaignExpansion::new("low", users(&["b"])),
            CampaignExpansion::new("high", users(&["a", "b"])),
            CampaignExpansion::new("mid", users(&["a"])),
        ];
        let mut engagement = EngagementScores::new();
        engagement.insert("high".into(), 1.0);
        engagement.insert("mid".into(), 0.5);

        let recs = RankingEngine::new().rank(&neighbors, &expansions, &engagement, 2);
        let ids: Vec<_> = recs.iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_expansion_order() {
        let neighbors = vec![neighbor("a", 0.5)];
        let expansions = vec![
            CampaignExpansion::new("first", users(&["a"])),
            CampaignExpansion::new("second", users(&["a"])),
            CampaignExpansion::new("third", users(&["a"])),
        ];

        let recs = RankingEngine::new().rank(&neighbors, &expansions, &EngagementScores::new(), 10);
        let ids: Vec<_> = recs.iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_similar_users_are_first_three_in_expansion_order() {
        let neighbors = vec![neighbor("d", 1.0), neighbor("c", 0.9), neighbor("b", 0.8), neighbor("a", 0.7)];
        let expansions = vec![CampaignExpansion::new("c1", users(&["a", "b", "c", "d"]))];

        let recs = RankingEngine::new().rank(&neighbors, &expansions, &EngagementScores::new(), 1);
        assert_eq!(recs[0].metadata.similar_users, users(&["a", "b", "c"]));
        assert_eq!(recs[0].metadata.user_count, 4);
    }

    #[test]
    fn test_top_k_larger_than_result() {
        let neighbors = vec![neighbor("a", 1.0)];
        let expansions = vec![CampaignExpansion::new("only", users(&["a"]))];

        let recs = RankingEngine::new().rank(&neighbors, &expansions, &EngagementScores::new(), 3);
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_empty_inputs_and_zero_top_k() {
        let engine = RankingEngine::new();
        assert!(engine.rank(&[], &[], &EngagementScores::new(), 5).is_empty());

        let neighbors = vec![neighbor("a", 1.0)];
        let expansions = vec![CampaignExpansion::new("c", users(&["a"]))];
        assert!(engine.rank(&neighbors, &expansions, &EngagementScores::new(), 0).is_empty());
    }

    #[test]
    fn test_scores_and_confidence_bounded() {
        let neighbors = vec![neighbor("a", 1.0), neighbor("b", 1.0)];
        let expansions = vec![CampaignExpansion::new("c", users(&["a", "b"]))];
        let mut engagement = EngagementScores::new();
        engagement.insert("c".into(), 1.0);

        let recs = RankingEngine::new().rank(&neighbors, &expansions, &engagement, 1);
        assert_eq!(recs[0].score, 1.0);
        assert_eq!(recs[0].confidence, 1.0);
    }
}
