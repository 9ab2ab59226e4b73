//! Analytics store client.

use anyhow::Result;
use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::error;

use data_loader::{CampaignId, EngagementCount};
use sources::{AnalyticsStore, SourceError};

use crate::channel::{connect_channel, ClientTimeouts};
use crate::proto::analytics_store_service_client::AnalyticsStoreServiceClient;
use crate::proto::{self, EngagementCountsRequest, HealthRequest};
use crate::status::to_source_error;

const BACKEND: &str = "analytics_store";

impl From<proto::EngagementCount> for EngagementCount {
    fn from(row: proto::EngagementCount) -> Self {
        EngagementCount {
            campaign_id: row.campaign_id,
            count: row.count,
        }
    }
}

/// Remote analytics store reached over gRPC
#[derive(Clone)]
pub struct GrpcAnalyticsStore {
    client: AnalyticsStoreServiceClient<Channel>,
    service_addr: String,
}

impl GrpcAnalyticsStore {
    pub async fn connect(addr: impl Into<String>, timeouts: &ClientTimeouts) -> Result<Self> {
        let addr = addr.into();
        let channel = connect_channel(&addr, timeouts).await?;
        Ok(Self {
            client: AnalyticsStoreServiceClient::new(channel),
            service_addr: addr,
        })
    }

    pub fn service_address(&self) -> &str {
        &self.service_addr
    }
}

#[async_trait]
impl AnalyticsStore for GrpcAnalyticsStore {
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

    async fn engagement_counts(&self, campaign_ids: &[CampaignId]) -> Result<Vec<EngagementCount>, SourceError> {
        let request = EngagementCountsRequest {
            campaign_ids: campaign_ids.to_vec(),
        };

        let response = self
            .client
            .clone()
            .engagement_counts(request)
            .await
            .map_err(|status| {
                error!("gRPC error reading engagement: {}", status);
                to_source_error(BACKEND, &status)
            })?;

        Ok(response
            .into_inner()
            .counts
            .into_iter()
            .map(EngagementCount::from)
            .collect())
    }
}
