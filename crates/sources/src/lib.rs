//! # Sources Crate
//!
//! The three retrieval stages of the hybrid pipeline and the store contracts
//! they query.
//!
//! ## Components
//!
//! ### Similarity Client (vector index)
//! Behavioral neighbors: "users whose messages read like yours"
//! - Averages a user's message embeddings into one vector
//! - Nearest-neighbor search by squared Euclidean distance
//! - Returns the 5 closest other users with similarity `1 / (1 + d)`
//!
//! ### Graph Expansion Client (graph store)
//! Relational proximity: campaigns reached via User → Message → Campaign,
//! with the distinct neighbor users behind each one.
//!
//! ### Engagement Scorer (analytics store)
//! Popularity: raw engagement counts normalized to the batch maximum.
//!
//! ## Failure Model
//!
//! Every client offers a `try_*` method returning `Result<_, SourceError>`
//! and a plain method that logs the error and degrades to an empty result.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{SimilarityClient, GraphExpansionClient, EngagementScorer, NEIGHBOR_FANOUT};
//! use sources::memory::{InMemoryVectorIndex, InMemoryGraphStore, InMemoryAnalyticsStore};
//!
//! let index = Arc::new(DataIndex::load_from_files(Path::new("data/campaigns"))?);
//! let similarity = SimilarityClient::new(Arc::new(InMemoryVectorIndex::new(index.clone())));
//! let graph = GraphExpansionClient::new(Arc::new(InMemoryGraphStore::new(index.clone())));
//!
//! let neighbors = similarity.similar_users_for("user_1", NEIGHBOR_FANOUT).await;
//! let ids: Vec<_> = neighbors.iter().map(|n| n.user_id.clone()).collect();
//! let campaigns = graph.expand_to_campaigns(&ids).await;
//! ```

// Public modules
pub mod engagement;
pub mod error;
pub mod graph;
pub mod memory;
pub mod similarity;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use engagement::EngagementScorer;
pub use error::{EmbeddingError, SourceError};
pub use graph::GraphExpansionClient;
pub use similarity::{NEIGHBOR_FANOUT, SEARCH_OVERSAMPLE, SimilarityClient};
pub use traits::{AnalyticsStore, GraphStore, VectorIndex};
