//! Clears explanation text when the caller did not ask for it.

use crate::traits::Filter;
use data_loader::Recommendation;

/// Empties `explanation` on every recommendation; keeps the metadata.
pub struct OmitExplanationFilter;

impl Filter for OmitExplanationFilter {
    fn name(&self) -> &str {
        "OmitExplanationFilter"
    }

    fn apply(&self, mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        for rec in &mut recommendations {
            rec.explanation.clear();
        }
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recommendation;

    #[test]
    fn test_omit_explanation_keeps_metadata() {
        let recs = OmitExplanationFilter.apply(vec![recommendation("a", 0.7)]);
        assert!(recs[0].explanation.is_empty());
        assert_eq!(recs[0].metadata.user_count, 1);
        assert_eq!(recs[0].confidence, 0.7);
    }
}
