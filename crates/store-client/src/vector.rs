//! Vector index client.

use anyhow::Result;
use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::Code;
use tracing::{debug, error};

use data_loader::{Embedding, VectorHit};
use sources::{SourceError, VectorIndex};

use crate::channel::{connect_channel, ClientTimeouts};
use crate::proto::vector_index_service_client::VectorIndexServiceClient;
use crate::proto::{self, HealthRequest, SearchRequest, UserEmbeddingsRequest};
use crate::status::{to_source_error, wire_limit};

const BACKEND: &str = "vector_index";

impl From<proto::VectorHit> for VectorHit {
    fn from(hit: proto::VectorHit) -> Self {
        VectorHit {
            user_id: hit.user_id,
            campaign_id: hit.campaign_id,
            distance: hit.distance,
        }
    }
}

/// Remote vector index reached over gRPC.
///
/// The generated client needs `&mut self` per call; cloning it only clones
/// the underlying `Channel` handle, so each call works on its own copy.
#[derive(Clone)]
pub struct GrpcVectorIndex {
    client: VectorIndexServiceClient<Channel>,
    service_addr: String,
}

impl GrpcVectorIndex {
    pub async fn connect(addr: impl Into<String>, timeouts: &ClientTimeouts) -> Result<Self> {
        let addr = addr.into();
        let channel = connect_channel(&addr, timeouts).await?;
        Ok(Self {
            client: VectorIndexServiceClient::new(channel),
            service_addr: addr,
        })
    }

    /// Get the address of the store this client is connected to.
    pub fn service_address(&self) -> &str {
        &self.service_addr
    }
}

#[async_trait]
impl VectorIndex for GrpcVectorIndex {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        let response = self
            .client
            .clone()
            .health(HealthRequest {})
            .await
            .map_err(|status| to_source_error(BACKEND, &status))?
            .into_inner();

        if response.serving {
            Ok(())
        } else {
            Err(SourceError::unavailable(BACKEND, response.detail))
        }
    }

    async fn user_embeddings(&self, user_id: &str, limit: usize) -> Result<Vec<Embedding>, SourceError> {
        let request = UserEmbeddingsRequest {
            user_id: user_id.to_string(),
            limit: wire_limit(limit),
        };

        match self.client.clone().user_embeddings(request).await {
            Ok(response) => {
                let embeddings: Vec<Embedding> = response
                    .into_inner()
                    .embeddings
                    .into_iter()
                    .map(|e| e.values)
                    .take(limit)
                    .collect();
                debug!("{} returned {} embeddings for {}", self.service_addr, embeddings.len(), user_id);
                Ok(embeddings)
            }
            // An unpopulated collection is not a failure
            Err(status) if status.code() == Code::NotFound => Ok(Vec::new()),
            Err(status) => {
                error!("gRPC error reading embeddings for {}: {}", user_id, status);
                Err(to_source_error(BACKEND, &status))
            }
        }
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<VectorHit>, SourceError> {
        let request = SearchRequest {
            query: query.to_vec(),
            limit: wire_limit(limit),
        };

        let response = self.client.clone().search(request).await.map_err(|status| {
            error!("gRPC error during vector search: {}", status);
            to_source_error(BACKEND, &status)
        })?;

        let hits = response.into_inner().hits;
        if hits.len() > limit {
            return Err(SourceError::invalid_data(
                BACKEND,
                format!("asked for {} hits, got {}", limit, hits.len()),
            ));
        }
        Ok(hits.into_iter().map(VectorHit::from).collect())
    }
}
