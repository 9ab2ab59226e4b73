//! Startup wiring: turn [`Settings`] into a ready [`RecommendationService`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use data_loader::DataIndex;
use sources::memory::{InMemoryAnalyticsStore, InMemoryGraphStore, InMemoryVectorIndex};
use sources::{AnalyticsStore, EngagementScorer, GraphExpansionClient, GraphStore, SimilarityClient, VectorIndex};
use store_client::{GrpcAnalyticsStore, GrpcGraphStore, GrpcVectorIndex};

use crate::cache::{MokaResponseCache, NoCache, ResponseCache};
use crate::config::{BackendKind, BackendSettings, CacheSettings, Settings};
use crate::orchestrator::RecommendationOrchestrator;
use crate::service::RecommendationService;

/// Handles to the three stores, local or remote
#[derive(Clone)]
pub struct Backends {
    pub vector_index: Arc<dyn VectorIndex>,
    pub graph_store: Arc<dyn GraphStore>,
    pub analytics_store: Arc<dyn AnalyticsStore>,
}

impl Backends {
    /// All three stores over one shared in-memory index
    pub fn in_memory(data_index: Arc<DataIndex>) -> Self {
        Self {
            vector_index: Arc::new(InMemoryVectorIndex::new(data_index.clone())),
            graph_store: Arc::new(InMemoryGraphStore::new(data_index.clone())),
            analytics_store: Arc::new(InMemoryAnalyticsStore::new(data_index)),
        }
    }

    /// Load a fixture directory and serve it from memory
    pub async fn load_local(data_dir: &Path) -> Result<Self> {
        let data_index = load_data_index(data_dir).await?;
        Ok(Self::in_memory(data_index))
    }

    /// Connect to the three remote store services
    pub async fn connect_grpc(settings: &BackendSettings) -> Result<Self> {
        let timeouts = settings.timeouts();

        let (vector_index, graph_store, analytics_store) = tokio::try_join!(
            GrpcVectorIndex::connect(settings.vector_index_addr.clone(), &timeouts),
            GrpcGraphStore::connect(settings.graph_store_addr.clone(), &timeouts),
            GrpcAnalyticsStore::connect(settings.analytics_store_addr.clone(), &timeouts),
        )?;

        Ok(Self {
            vector_index: Arc::new(vector_index),
            graph_store: Arc::new(graph_store),
            analytics_store: Arc::new(analytics_store),
        })
    }

    pub async fn from_settings(settings: &BackendSettings) -> Result<Self> {
        match settings.kind {
            BackendKind::Local => Self::load_local(&settings.data_dir).await,
            BackendKind::Grpc => Self::connect_grpc(settings).await,
        }
    }
}

/// Parse a fixture directory off the async runtime
pub async fn load_data_index(data_dir: &Path) -> Result<Arc<DataIndex>> {
    info!("Loading data index from {}", data_dir.display());
    let dir: PathBuf = data_dir.to_path_buf();

    let data_index = tokio::task::spawn_blocking(move || DataIndex::load_from_files(&dir))
        .await
        .context("Data loading task panicked")?
        .with_context(|| format!("Failed to load dataset from {}", data_dir.display()))?;

    Ok(Arc::new(data_index))
}

pub fn build_cache(settings: &CacheSettings) -> Arc<dyn ResponseCache> {
    if settings.enabled {
        Arc::new(MokaResponseCache::new(settings.ttl(), settings.max_entries))
    } else {
        info!("Response cache disabled");
        Arc::new(NoCache)
    }
}

/// Health-check the stores and assemble the service
pub async fn build_service_with(backends: Backends, settings: &Settings) -> Result<RecommendationService> {
    let similarity =
        SimilarityClient::new(backends.vector_index).with_embedding_limit(settings.backend.user_embedding_limit);
    let orchestrator = RecommendationOrchestrator::new(
        similarity,
        GraphExpansionClient::new(backends.graph_store),
        EngagementScorer::new(backends.analytics_store),
    )
    .verified()
    .await
    .context("Failed to initialize recommendation orchestrator")?;

    Ok(RecommendationService::new(orchestrator, build_cache(&settings.cache)).with_settings(settings.service.clone()))
}

/// Bootstrap the full service from settings
pub async fn build_service(settings: &Settings) -> Result<RecommendationService> {
    let backends = Backends::from_settings(&settings.backend).await?;
    build_service_with(backends, settings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{RecommendationRequest, ResponseSource};
    use std::fs;
    use store_client::StoreService;
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;

    fn temp_dataset(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("campaign-recs-server-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("messages.dat"),
            "alice::c0::hi::0.0,0.0\n\
             bob::c1::sale::1.0,0.0\n\
             bob::c2::new arrivals::1.0,0.0\n\
             carol::c2::new arrivals::0.0,1.0\n",
        )
        .unwrap();
        fs::write(dir.join("engagement.dat"), "c1::10\nc2::40\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_local_bootstrap_serves_requests() {
        let mut settings = Settings::default();
        settings.backend.data_dir = temp_dataset("local");

        let service = build_service(&settings).await.unwrap();
        let response = service.recommend(RecommendationRequest::new("alice")).await.unwrap();

        assert_eq!(response.source, ResponseSource::Hybrid);
        let ids: Vec<&str> = response.recommendations.iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
    }

    #[tokio::test]
    async fn test_embedding_limit_reaches_similarity_client() {
        let mut settings = Settings::default();
        settings.backend.data_dir = temp_dataset("limit");
        settings.backend.user_embedding_limit = 7;

        let service = build_service(&settings).await.unwrap();
        assert_eq!(service.orchestrator().similarity().embedding_limit(), 7);
    }

    #[tokio::test]
    async fn test_missing_data_dir_fails_with_context() {
        let mut settings = Settings::default();
        settings.backend.data_dir = PathBuf::from("/definitely/not/here");

        let err = build_service(&settings).await.err().expect("bootstrap should fail");
        assert!(format!("{:#}", err).contains("Failed to load dataset"));
    }

    #[tokio::test]
    async fn test_grpc_bootstrap_against_served_stores() {
        let data_index = load_data_index(&temp_dataset("grpc")).await.unwrap();
        let local = Backends::in_memory(data_index);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let router = StoreService::new(local.vector_index, local.graph_store, local.analytics_store).into_router();
        let handle = tokio::spawn(async move {
            router
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .expect("Store service failed");
        });

        let mut settings = Settings::default();
        settings.backend.kind = BackendKind::Grpc;
        settings.backend.vector_index_addr = addr.clone();
        settings.backend.graph_store_addr = addr.clone();
        settings.backend.analytics_store_addr = addr;

        let service = build_service(&settings).await.unwrap();
        let response = service.recommend(RecommendationRequest::new("alice")).await.unwrap();
        let ids: Vec<&str> = response.recommendations.iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
        assert!(service.health().await.is_healthy());

        handle.abort();
    }
}
