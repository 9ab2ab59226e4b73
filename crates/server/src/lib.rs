//! Server crate for the campaign recommendation engine.
//!
//! This crate contains the orchestrator that sequences the hybrid
//! pipeline, and the service layer that fronts it with validation,
//! caching, single-flight and health reporting.

pub mod backends;
pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use backends::{build_service, build_service_with, Backends};
pub use cache::{MokaResponseCache, NoCache, ResponseCache};
pub use config::{BackendKind, Settings};
pub use orchestrator::{EmptyReason, PipelineStage, RecommendationOrchestrator, RecommendationOutcome};
pub use service::{
    HealthReport, RecommendationRequest, RecommendationResponse, RecommendationService, ResponseSource,
    ServiceError,
};
