//! Filter implementations for the post-ranking pipeline.
//!
//! This module contains all the concrete filter implementations
//! that can be composed into a FilterPipeline.

pub mod minimum_confidence;
pub mod omit_explanation;

// Re-export for convenience
pub use minimum_confidence::MinimumConfidenceFilter;
pub use omit_explanation::OmitExplanationFilter;
