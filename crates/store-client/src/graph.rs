//! Graph store client.

use anyhow::Result;
use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::{debug, error};

use data_loader::{CampaignExpansion, UserId};
use sources::{GraphStore, SourceError};

use crate::channel::{connect_channel, ClientTimeouts};
use crate::proto::graph_store_service_client::GraphStoreServiceClient;
use crate::proto::{self, CampaignsForUsersRequest, HealthRequest};
use crate::status::to_source_error;

const BACKEND: &str = "graph_store";

impl From<proto::CampaignExpansion> for CampaignExpansion {
    fn from(c: proto::CampaignExpansion) -> Self {
        CampaignExpansion {
            campaign_id: c.campaign_id,
            user_count: c.user_count,
            user_list: c.user_list,
        }
    }
}

/// Remote graph store reached over gRPC
#[derive(Clone)]
pub struct GrpcGraphStore {
    client: GraphStoreServiceClient<Channel>,
    service_addr: String,
}

impl GrpcGraphStore {
    pub async fn connect(addr: impl Into<String>, timeouts: &ClientTimeouts) -> Result<Self> {
        let addr = addr.into();
        let channel = connect_channel(&addr, timeouts).await?;
        Ok(Self {
            client: GraphStoreServiceClient::new(channel),
            service_addr: addr,
        })
    }

    pub fn service_address(&self) -> &str {
        &self.service_addr
    }
}

#[async_trait]
impl GraphStore for GrpcGraphStore {
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

    async fn campaigns_for_users(&self, user_ids: &[UserId]) -> Result<Vec<CampaignExpansion>, SourceError> {
        let request = CampaignsForUsersRequest {
            user_ids: user_ids.to_vec(),
        };

        let response = self
            .client
            .clone()
            .campaigns_for_users(request)
            .await
            .map_err(|status| {
                error!("gRPC error expanding {} users: {}", user_ids.len(), status);
                to_source_error(BACKEND, &status)
            })?;

        let campaigns: Vec<CampaignExpansion> = response
            .into_inner()
            .campaigns
            .into_iter()
            .map(CampaignExpansion::from)
            .collect();

        if let Some(bad) = campaigns
            .iter()
            .find(|c| c.user_count as usize != c.user_list.len())
        {
            return Err(SourceError::invalid_data(
                BACKEND,
                format!(
                    "campaign {} reports {} users but lists {}",
                    bad.campaign_id,
                    bad.user_count,
                    bad.user_list.len()
                ),
            ));
        }

        debug!("{} returned {} campaigns", self.service_addr, campaigns.len());
        Ok(campaigns)
    }
}
