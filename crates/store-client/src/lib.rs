//! gRPC clients for the three backing stores.
//!
//! This crate lets the recommendation pipeline run against remote stores
//! defined in `proto/stores.proto`. It handles:
//! - Connection management with explicit connect and per-request timeouts
//! - Converting between protobuf messages and the pipeline's domain types
//! - Mapping gRPC status codes onto [`sources::SourceError`]
//!
//! Each client implements the matching store trait from `sources`, so the
//! orchestrator cannot tell a remote store from an in-memory one.
//!
//! [`service::StoreService`] is the other direction: it exposes any store
//! trait object as a gRPC service.

pub mod analytics;
pub mod channel;
pub mod graph;
pub mod service;
pub mod status;
pub mod vector;

// Include the generated protobuf code
pub mod proto {
    tonic::include_proto!("stores");
}

pub use analytics::GrpcAnalyticsStore;
pub use channel::{connect_channel, ClientTimeouts};
pub use graph::GrpcGraphStore;
pub use service::StoreService;
pub use vector::GrpcVectorIndex;
