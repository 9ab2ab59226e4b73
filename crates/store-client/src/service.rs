//! Serve store trait objects over gRPC.
//!
//! Lets a process holding the data (for example the in-memory stores loaded
//! from a fixture directory) act as the remote stores for another process
//! running with the gRPC backend.

use std::sync::Arc;

use tonic::transport::server::Router;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use sources::{AnalyticsStore, GraphStore, SourceError, VectorIndex};

use crate::proto::analytics_store_service_server::{AnalyticsStoreService, AnalyticsStoreServiceServer};
use crate::proto::graph_store_service_server::{GraphStoreService, GraphStoreServiceServer};
use crate::proto::vector_index_service_server::{VectorIndexService, VectorIndexServiceServer};
use crate::proto::{
    CampaignExpansion, CampaignsForUsersRequest, CampaignsForUsersResponse, Embedding, EngagementCount,
    EngagementCountsRequest, EngagementCountsResponse, HealthRequest, HealthResponse, SearchRequest,
    SearchResponse, UserEmbeddingsRequest, UserEmbeddingsResponse, VectorHit,
};
use crate::status::from_source_error;

fn health_response(result: Result<(), SourceError>) -> HealthResponse {
    match result {
        Ok(()) => HealthResponse {
            serving: true,
            detail: String::new(),
        },
        Err(e) => HealthResponse {
            serving: false,
            detail: e.to_string(),
        },
    }
}

/// All three store services behind one gRPC server
pub struct StoreService {
    vector: Arc<dyn VectorIndex>,
    graph: Arc<dyn GraphStore>,
    analytics: Arc<dyn AnalyticsStore>,
}

impl StoreService {
    pub fn new(vector: Arc<dyn VectorIndex>, graph: Arc<dyn GraphStore>, analytics: Arc<dyn AnalyticsStore>) -> Self {
        Self {
            vector,
            graph,
            analytics,
        }
    }

    /// Build a router; call `serve(addr)` or `serve_with_incoming(..)` on it
    pub fn into_router(self) -> Router {
        Server::builder()
            .add_service(VectorIndexServiceServer::new(VectorIndexAdapter(self.vector)))
            .add_service(GraphStoreServiceServer::new(GraphStoreAdapter(self.graph)))
            .add_service(AnalyticsStoreServiceServer::new(AnalyticsStoreAdapter(self.analytics)))
    }
}

struct VectorIndexAdapter(Arc<dyn VectorIndex>);

#[tonic::async_trait]
impl VectorIndexService for VectorIndexAdapter {
    async fn health(&self, _request: Request<HealthRequest>) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(health_response(self.0.health_check().await)))
    }

    async fn user_embeddings(
        &self,
        request: Request<UserEmbeddingsRequest>,
    ) -> Result<Response<UserEmbeddingsResponse>, Status> {
        let request = request.into_inner();
        let embeddings = self
            .0
            .user_embeddings(&request.user_id, request.limit as usize)
            .await
            .map_err(|e| from_source_error(&e))?;

        Ok(Response::new(UserEmbeddingsResponse {
            embeddings: embeddings.into_iter().map(|values| Embedding { values }).collect(),
        }))
    }

    async fn search(&self, request: Request<SearchRequest>) -> Result<Response<SearchResponse>, Status> {
        let request = request.into_inner();
        let hits = self
            .0
            .search(&request.query, request.limit as usize)
            .await
            .map_err(|e| from_source_error(&e))?;

        Ok(Response::new(SearchResponse {
            hits: hits
                .into_iter()
                .map(|h| VectorHit {
                    user_id: h.user_id,
                    campaign_id: h.campaign_id,
                    distance: h.distance,
                })
                .collect(),
        }))
    }
}

struct GraphStoreAdapter(Arc<dyn GraphStore>);

#[tonic::async_trait]
impl GraphStoreService for GraphStoreAdapter {
    async fn health(&self, _request: Request<HealthRequest>) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(health_response(self.0.health_check().await)))
    }

    async fn campaigns_for_users(
        &self,
        request: Request<CampaignsForUsersRequest>,
    ) -> Result<Response<CampaignsForUsersResponse>, Status> {
        let campaigns = self
            .0
            .campaigns_for_users(&request.into_inner().user_ids)
            .await
            .map_err(|e| from_source_error(&e))?;

        Ok(Response::new(CampaignsForUsersResponse {
            campaigns: campaigns
                .into_iter()
                .map(|c| CampaignExpansion {
                    campaign_id: c.campaign_id,
                    user_count: c.user_count,
                    user_list: c.user_list,
                })
                .collect(),
        }))
    }
}

struct AnalyticsStoreAdapter(Arc<dyn AnalyticsStore>);

#[tonic::async_trait]
impl AnalyticsStoreService for AnalyticsStoreAdapter {
    async fn health(&self, _request: Request<HealthRequest>) -> Result<Response<HealthResponse>, Status> {
        Ok(Response::new(health_response(self.0.health_check().await)))
    }

    async fn engagement_counts(
        &self,
        request: Request<EngagementCountsRequest>,
    ) -> Result<Response<EngagementCountsResponse>, Status> {
        let counts = self
            .0
            .engagement_counts(&request.into_inner().campaign_ids)
            .await
            .map_err(|e| from_source_error(&e))?;

        Ok(Response::new(EngagementCountsResponse {
            counts: counts
                .into_iter()
                .map(|row| EngagementCount {
                    campaign_id: row.campaign_id,
                    count: row.count,
                })
                .collect(),
        }))
    }
}
