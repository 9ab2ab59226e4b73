//! Filter to enforce a confidence floor.
//!
//! Removes recommendations whose confidence is below the caller's minimum.

use crate::traits::Filter;
use data_loader::Recommendation;

/// Drops recommendations with `confidence < min_confidence`.
pub struct MinimumConfidenceFilter {
    min_confidence: f32,
}

impl MinimumConfidenceFilter {
    /// `min_confidence` is clamped to `[0, 1]`
    pub fn new(min_confidence: f32) -> Self {
        Self {
            min_confidence: crate::weights::clamp_unit(min_confidence),
        }
    }
}

impl Filter for MinimumConfidenceFilter {
    fn name(&self) -> &str {
        "MinimumConfidenceFilter"
    }

    fn apply(&self, recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        recommendations
            .into_iter()
            .filter(|rec| rec.confidence >= self.min_confidence)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recommendation;

    #[test]
    fn test_minimum_confidence_filter() {
        let filter = MinimumConfidenceFilter::new(0.51);
        let recs = vec![
            recommendation("keep", 0.6),
            recommendation("edge", 0.51),
            recommendation("drop", 0.5),
        ];

        let kept: Vec<_> = filter.apply(recs).into_iter().map(|r| r.campaign_id).collect();
        assert_eq!(kept, vec!["keep".to_string(), "edge".to_string()]);
    }

    #[test]
    fn test_zero_floor_keeps_everything() {
        let filter = MinimumConfidenceFilter::new(-1.0);
        let recs = vec![recommendation("a", 0.0), recommendation("b", 1.0)];
        assert_eq!(filter.apply(recs).len(), 2);
    }
}
