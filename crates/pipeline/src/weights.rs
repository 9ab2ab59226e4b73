//! Fixed blend of the three ranking signals.

use serde::{Deserialize, Serialize};

/// Confidence is the combined score boosted by 20%, capped at 1.0
pub const CONFIDENCE_BOOST: f32 = 1.2;

/// How many connected neighbors are listed in a recommendation's metadata
pub const MAX_SIMILAR_USERS: usize = 3;

/// Weight of each signal in the combined score.
///
/// The weights sum to 1.0 and every signal lies in `[0, 1]`, so the combined
/// score also lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Mean similarity of the neighbors connected to the campaign
    pub similarity: f32,
    /// Share of the neighbor pool connected to the campaign
    pub user_count: f32,
    /// Normalized engagement frequency
    pub engagement: f32,
}

impl ScoreWeights {
    pub const DEFAULT: ScoreWeights = ScoreWeights {
        similarity: 0.3,
        user_count: 0.2,
        engagement: 0.5,
    };

    /// Weighted sum, clamped to `[0, 1]`
    pub fn combine(&self, similarity: f32, user_count: f32, engagement: f32) -> f32 {
        let combined = self.similarity * clamp_unit(similarity)
            + self.user_count * clamp_unit(user_count)
            + self.engagement * clamp_unit(engagement);
        clamp_unit(combined)
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// `min(score × 1.2, 1.0)`, clamped to `[0, 1]`
pub fn confidence_for(score: f32) -> f32 {
    clamp_unit(score * CONFIDENCE_BOOST)
}

/// Clamp to `[0, 1]`, mapping NaN to 0
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let w = ScoreWeights::DEFAULT;
        assert!((w.similarity + w.user_count + w.engagement - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_combined_and_confidence_stay_in_unit_range() {
        let w = ScoreWeights::default();
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        for &s in &steps {
            for &u in &steps {
                for &e in &steps {
                    let combined = w.combine(s, u, e);
                    assert!((0.0..=1.0).contains(&combined));
                    let confidence = confidence_for(combined);
                    assert!((0.0..=1.0).contains(&confidence));
                    assert!(confidence >= combined);
                }
            }
        }
        assert_eq!(w.combine(1.0, 1.0, 1.0), 1.0);
        assert_eq!(confidence_for(0.9), 1.0);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let w = ScoreWeights::default();
        assert_eq!(w.combine(5.0, -1.0, f32::NAN), 0.3);
        assert_eq!(clamp_unit(f32::NAN), 0.0);
    }
}
