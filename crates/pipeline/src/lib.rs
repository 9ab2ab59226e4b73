//! Ranking and post-processing for campaign recommendations.
//!
//! This crate provides:
//! - SignalExtractor for the three per-campaign signals
//! - RankingEngine for blending, sorting and truncating
//! - Filter trait and implementations for request-specific post-processing
//! - FilterPipeline for composing filters
//!
//! ## Architecture
//! Ranking happens in stages:
//! 1. SignalExtractor computes similarity, user-count and engagement signals
//! 2. RankingEngine blends them with fixed weights (0.3 / 0.2 / 0.5), derives
//!    confidence and explanation, sorts stably and keeps `top_k`
//! 3. Filters adjust the ranked list for one request (confidence floor,
//!    explanation omission) without reordering it
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{FilterPipeline, RankingEngine};
//! use pipeline::filters::*;
//!
//! let ranked = RankingEngine::new().rank(&neighbors, &campaigns, &engagement, 5);
//!
//! let pipeline = FilterPipeline::new()
//!     .add_filter(MinimumConfidenceFilter::new(0.5));
//! let filtered = pipeline.apply(ranked);
//! ```

pub mod features;
pub mod filter_pipeline;
pub mod filters;
pub mod ranking;
pub mod traits;
pub mod weights;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use features::{CampaignSignals, SignalExtractor};
pub use filter_pipeline::FilterPipeline;
pub use ranking::RankingEngine;
pub use traits::Filter;
pub use weights::ScoreWeights;
