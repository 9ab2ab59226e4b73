//! Core traits for post-ranking filtering.
//!
//! This module defines the Filter trait that allows composable,
//! request-specific adjustments to an already ranked list.

use data_loader::Recommendation;

/// Core trait for filtering ranked recommendations.
///
/// All filters must implement this trait to be used in the FilterPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows filters to be shared across request tasks
/// - Filters take ownership of the Vec and return the kept items
/// - Filters must never reorder: the list stays sorted by score
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a ranked list
    fn apply(&self, recommendations: Vec<Recommendation>) -> Vec<Recommendation>;
}
