//! Shared fixtures for the unit tests in this crate.

use data_loader::{Recommendation, RecommendationMetadata};

/// A recommendation whose score and confidence are both `confidence`
pub(crate) fn recommendation(campaign: &str, confidence: f32) -> Recommendation {
    Recommendation {
        campaign_id: campaign.to_string(),
        score: confidence,
        confidence,
        explanation: crate::ranking::explanation_for(1),
        metadata: RecommendationMetadata {
            similarity_score: confidence,
            user_count: 1,
            engagement_frequency: 0.0,
            similar_users: vec!["u1".to_string()],
        },
    }
}
