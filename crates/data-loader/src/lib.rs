//! # Data Loader Crate
//!
//! Domain types shared by every crate in the workspace, plus an in-memory
//! `DataIndex` that can stand in for the three backing stores.
//!
//! ## Main Components
//!
//! - **types**: Domain types (ids, embeddings, neighbors, expansions, recommendations)
//! - **parser**: Parse messages.dat / engagement.dat fixture files
//! - **index**: Build and validate a `DataIndex` from a dataset directory
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data/campaigns"))?;
//! let messages = index.get_user_messages("user_1");
//! println!("user_1 sent {} messages", messages.len());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use types::{
    // Type aliases
    UserId,
    CampaignId,
    Embedding,
    EngagementScores,
    // Store rows
    MessageRecord,
    VectorHit,
    EngagementCount,
    // Pipeline types
    NeighborUser,
    CampaignExpansion,
    Recommendation,
    RecommendationMetadata,
    DataIndex,
};
