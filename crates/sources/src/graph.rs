//! Graph Expansion Client
//!
//! Maps neighbor users to the campaigns they are connected to through
//! `User -[:SENT]-> Message -[:ABOUT]-> Campaign`, with the distinct users
//! behind each campaign.

use crate::error::SourceError;
use crate::traits::GraphStore;
use data_loader::{CampaignExpansion, UserId};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Expands neighbor users into connected campaigns
#[derive(Clone)]
pub struct GraphExpansionClient {
    store: Arc<dyn GraphStore>,
}

impl GraphExpansionClient {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &str {
        self.store.name()
    }

    pub async fn health_check(&self) -> Result<(), SourceError> {
        self.store.health_check().await
    }

    /// Campaigns connected to `neighbor_user_ids`, by user count descending.
    ///
    /// An empty id set returns an empty list without querying the store.
    #[instrument(skip(self, neighbor_user_ids), fields(neighbors = neighbor_user_ids.len()))]
    pub async fn try_expand_to_campaigns(
        &self,
        neighbor_user_ids: &[UserId],
    ) -> Result<Vec<CampaignExpansion>, SourceError> {
        if neighbor_user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let campaigns = self.store.campaigns_for_users(neighbor_user_ids).await?;
        debug!("Graph returned {} campaigns", campaigns.len());
        Ok(campaigns)
    }

    /// Like [`Self::try_expand_to_campaigns`], but failures degrade to an empty list
    pub async fn expand_to_campaigns(&self, neighbor_user_ids: &[UserId]) -> Vec<CampaignExpansion> {
        self.try_expand_to_campaigns(neighbor_user_ids)
            .await
            .unwrap_or_else(|e| {
                warn!("Error fetching campaigns from {}: {}", self.store.name(), e);
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryGraphStore;
    use crate::testing::{DownStore, message};
    use data_loader::DataIndex;

    fn graph_client() -> GraphExpansionClient {
        let mut index = DataIndex::new();
        index.insert_message(message("a", "c1", vec![0.0]));
        index.insert_message(message("a", "c2", vec![0.0]));
        index.insert_message(message("b", "c2", vec![0.0]));
        index.insert_message(message("b", "c2", vec![0.0]));
        index.insert_message(message("c", "c3", vec![0.0]));
        GraphExpansionClient::new(Arc::new(InMemoryGraphStore::new(Arc::new(index))))
    }

    #[tokio::test]
    async fn test_expand_orders_by_user_count() {
        let client = graph_client();
        let campaigns = client
            .expand_to_campaigns(&["a".to_string(), "b".to_string()])
            .await;

        assert_eq!(campaigns.len(), 2);
        assert_eq!(campaigns[0].campaign_id, "c2");
        assert_eq!(campaigns[0].user_count, 2);
        assert_eq!(campaigns[0].user_list, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(campaigns[1].campaign_id, "c1");
        assert_eq!(campaigns[1].user_count, 1);
    }

    #[tokio::test]
    async fn test_empty_neighbors_short_circuit() {
        // DownStore would fail any query, so Ok proves no query was issued
        let client = GraphExpansionClient::new(Arc::new(DownStore));
        assert_eq!(client.try_expand_to_campaigns(&[]).await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_empty() {
        let client = GraphExpansionClient::new(Arc::new(DownStore));
        assert!(client.try_expand_to_campaigns(&["a".to_string()]).await.is_err());
        assert!(client.expand_to_campaigns(&["a".to_string()]).await.is_empty());
    }
}
