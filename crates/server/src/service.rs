//! Request-facing layer in front of the orchestrator.
//!
//! ## Algorithm
//! For each request:
//! 1. Validate the user id and `top_k` (default 5, allowed 1..=20)
//! 2. Look up `recs:{user_id}:{top_k}` in the response cache
//! 3. On a miss, run the orchestrator (sharing the run with identical
//!    concurrent requests) and cache the unfiltered response unless a store
//!    failure shaped it
//! 4. Apply the request's filters (confidence floor, explanation omission)
//! 5. Stamp `source` and `latency_ms`; a cached response keeps the
//!    `timestamp` of the run that produced it

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use data_loader::Recommendation;
use pipeline::filters::{MinimumConfidenceFilter, OmitExplanationFilter};
use pipeline::FilterPipeline;

use crate::cache::{cache_key, ResponseCache};
use crate::config::ServiceSettings;
use crate::orchestrator::{RecommendationOrchestrator, RecommendationOutcome};

/// Rejected requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("top_k must be between 1 and {max}, got {requested}")]
    InvalidTopK { requested: usize, max: usize },

    #[error("user_id must not be empty")]
    EmptyUserId,
}

fn default_include_explanation() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,

    /// Number of results; the configured default when absent
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Drop results below this confidence; no floor when absent
    #[serde(default)]
    pub min_confidence: Option<f32>,

    #[serde(default = "default_include_explanation")]
    pub include_explanation: bool,
}

impl RecommendationRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            top_k: None,
            min_confidence: None,
            include_explanation: true,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    pub fn without_explanation(mut self) -> Self {
        self.include_explanation = false;
        self
    }
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Freshly computed by the hybrid pipeline
    Hybrid,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub recommendations: Vec<Recommendation>,
    pub source: ResponseSource,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: f64,
}

/// Status of one dependency in the health report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Ok,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// "healthy" when every dependency is ok, "degraded" otherwise
    pub status: String,
    pub version: String,
    pub dependencies: BTreeMap<String, DependencyStatus>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.dependencies.values().all(|s| *s == DependencyStatus::Ok)
    }
}

type InFlight = Arc<OnceCell<RecommendationResponse>>;

/// Validates, caches and de-duplicates requests before they reach the
/// orchestrator.
pub struct RecommendationService {
    orchestrator: RecommendationOrchestrator,
    cache: Arc<dyn ResponseCache>,
    settings: ServiceSettings,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl RecommendationService {
    pub fn new(orchestrator: RecommendationOrchestrator, cache: Arc<dyn ResponseCache>) -> Self {
        Self {
            orchestrator,
            cache,
            settings: ServiceSettings::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn orchestrator(&self) -> &RecommendationOrchestrator {
        &self.orchestrator
    }

    /// Resolve the effective `top_k` for a request
    pub fn validate(&self, request: &RecommendationRequest) -> Result<usize, ServiceError> {
        if request.user_id.trim().is_empty() {
            return Err(ServiceError::EmptyUserId);
        }

        let top_k = request.top_k.unwrap_or(self.settings.default_top_k);
        if top_k == 0 || top_k > self.settings.max_top_k {
            return Err(ServiceError::InvalidTopK {
                requested: top_k,
                max: self.settings.max_top_k,
            });
        }
        Ok(top_k)
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn recommend(&self, request: RecommendationRequest) -> Result<RecommendationResponse, ServiceError> {
        let start_time = Instant::now();
        let top_k = self.validate(&request)?;
        let key = cache_key(&request.user_id, top_k);

        let mut response = match self.cached(&key).await {
            Some(mut cached) => {
                cached.source = ResponseSource::Cache;
                cached
            }
            None if self.settings.single_flight => self.compute_shared(&key, &request.user_id, top_k).await,
            None => self.compute_and_cache(&key, &request.user_id, top_k).await,
        };

        let recommendations = std::mem::take(&mut response.recommendations);
        response.recommendations = Self::filters_for(&request).apply(recommendations);
        response.latency_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Served {} recommendations for {} from {:?} in {:.2} ms",
            response.recommendations.len(),
            response.user_id,
            response.source,
            response.latency_ms
        );

        Ok(response)
    }

    /// Dependency health: the three stores plus the cache
    pub async fn health(&self) -> HealthReport {
        let mut dependencies = BTreeMap::new();

        for (name, status) in self.orchestrator.check_backends().await {
            if let Err(e) = &status {
                warn!("Health check failed: {}", e);
            }
            dependencies.insert(name, Self::dependency_status(status.is_ok()));
        }

        let cache_ok = match self.cache.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache health check failed: {:#}", e);
                false
            }
        };
        dependencies.insert(self.cache.name().to_string(), Self::dependency_status(cache_ok));

        let healthy = dependencies.values().all(|s| *s == DependencyStatus::Ok);
        HealthReport {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dependencies,
        }
    }

    fn dependency_status(ok: bool) -> DependencyStatus {
        if ok {
            DependencyStatus::Ok
        } else {
            DependencyStatus::Unavailable
        }
    }

    fn filters_for(request: &RecommendationRequest) -> FilterPipeline {
        let mut filters = FilterPipeline::new();
        if let Some(min_confidence) = request.min_confidence {
            filters = filters.add_filter(MinimumConfidenceFilter::new(min_confidence));
        }
        if !request.include_explanation {
            filters = filters.add_filter(OmitExplanationFilter);
        }
        filters
    }

    async fn cached(&self, key: &str) -> Option<RecommendationResponse> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Cache read failed for {}: {:#}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Run the orchestrator once for all concurrent requests with this key
    async fn compute_shared(&self, key: &str, user_id: &str, top_k: usize) -> RecommendationResponse {
        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let response = cell
            .get_or_init(|| self.compute_and_cache(key, user_id, top_k))
            .await
            .clone();

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            in_flight.remove(key);
        }

        response
    }

    async fn compute_and_cache(&self, key: &str, user_id: &str, top_k: usize) -> RecommendationResponse {
        let outcome = self.orchestrator.recommend_with_outcome(user_id, top_k).await;
        let complete = outcome.is_complete();
        if !complete {
            debug!("Not caching {}: incomplete outcome {:?}", key, outcome_summary(&outcome));
        }

        let response = RecommendationResponse {
            user_id: user_id.to_string(),
            recommendations: outcome.into_recommendations(),
            source: ResponseSource::Hybrid,
            timestamp: Utc::now(),
            latency_ms: 0.0,
        };

        // Results shaped by an outage are not worth keeping for an hour
        if complete {
            self.store(key, &response).await;
        }
        response
    }

    async fn store(&self, key: &str, response: &RecommendationResponse) {
        let raw = match serde_json::to_string(response) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize response for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.cache.put(key, raw).await {
            warn!("Cache write failed for {}: {:#}", key, e);
        }
    }
}

fn outcome_summary(outcome: &RecommendationOutcome) -> String {
    match outcome {
        RecommendationOutcome::Ranked { degraded, .. } => format!("degraded {:?}", degraded),
        RecommendationOutcome::Empty(reason) => reason.to_string(),
    }
}
