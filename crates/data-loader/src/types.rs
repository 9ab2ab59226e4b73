//! Core domain types for the campaign recommendation engine.
//!
//! This module defines the fundamental data structures used throughout the system:
//! - Type aliases for domain clarity (UserId, CampaignId, Embedding)
//! - Raw store rows (MessageRecord, VectorHit, EngagementCount)
//! - Pipeline intermediates (NeighborUser, CampaignExpansion, EngagementScores)
//! - The final, explainable Recommendation
//!
//! Every type here is transient: it is built fresh for one request and never
//! persisted by the pipeline itself.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Opaque identifier for a user (e.g. "user_42")
pub type UserId = String;

/// Opaque identifier for a marketing campaign (e.g. "campaign_7")
pub type CampaignId = String;

/// Fixed-dimension embedding vector produced by the upstream text encoder.
///
/// The dimension is decided by the encoder (384 for MiniLM-style models); the
/// engine only requires that all vectors it compares share one dimension.
pub type Embedding = Vec<f32>;

/// Campaign id → normalized engagement frequency in `[0, 1]`.
///
/// Normalized against the maximum raw count of the batch it was computed for,
/// so values are only comparable within one query.
pub type EngagementScores = HashMap<CampaignId, f32>;

// =============================================================================
// Store Rows
// =============================================================================

/// One stored message: the unit of the vector index and the source of the
/// `User -[:SENT]-> Message -[:ABOUT]-> Campaign` relationship path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub user_id: UserId,
    pub campaign_id: CampaignId,
    pub message: String,
    pub embedding: Embedding,
}

/// A raw nearest-neighbor hit returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub user_id: UserId,
    pub campaign_id: CampaignId,
    /// Squared Euclidean distance to the query vector (smaller = closer)
    pub distance: f32,
}

/// Raw engagement count for a campaign, as stored by the analytics backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCount {
    pub campaign_id: CampaignId,
    pub count: u64,
}

// =============================================================================
// Pipeline Intermediates
// =============================================================================

/// A user found to be behaviorally similar to the query user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborUser {
    pub user_id: UserId,
    /// Similarity in `[0, 1]`, derived from the averaged raw distance
    pub similarity: f32,
    /// How many raw search hits collapsed into this neighbor (always >= 1)
    pub hit_count: u32,
}

/// A campaign reached from a set of neighbor users through the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignExpansion {
    pub campaign_id: CampaignId,
    /// Number of distinct neighbor users connected to this campaign
    pub user_count: u32,
    /// The distinct neighbor user ids, in the order the graph returned them
    pub user_list: Vec<UserId>,
}

impl CampaignExpansion {
    pub fn new(campaign_id: impl Into<CampaignId>, user_list: Vec<UserId>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            user_count: user_list.len() as u32,
            user_list,
        }
    }

    /// Distinct users as a set, for O(1) membership checks while ranking
    pub fn user_set(&self) -> HashSet<&str> {
        self.user_list.iter().map(String::as_str).collect()
    }
}

// =============================================================================
// Recommendation
// =============================================================================

/// Per-signal breakdown attached to every recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    /// Mean similarity of the neighbors connected to this campaign
    pub similarity_score: f32,
    pub user_count: u32,
    pub engagement_frequency: f32,
    /// Up to three connected neighbors, in expansion order
    pub similar_users: Vec<UserId>,
}

/// Final, explainable recommendation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub campaign_id: CampaignId,
    /// Combined score in `[0, 1]`; the list is sorted on this
    pub score: f32,
    /// Boosted score in `[0, 1]`
    pub confidence: f32,
    /// Human-readable reason. Empty when the caller asked to omit explanations.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub explanation: String,
    pub metadata: RecommendationMetadata,
}

// =============================================================================
// DataIndex - In-Memory Store Backing
// =============================================================================

/// In-memory copy of everything the three backends hold.
///
/// Messages double as vector-index rows and graph edges; engagement counts
/// stand in for the analytics store. Used for local runs and tests.
#[derive(Debug)]
pub struct DataIndex {
    /// All stored messages, in load order
    pub(crate) messages: Vec<MessageRecord>,
    /// Positions into `messages` for each user
    pub(crate) user_messages: HashMap<UserId, Vec<usize>>,
    /// Distinct campaigns each user sent a message about (the graph edges)
    pub(crate) user_campaigns: HashMap<UserId, Vec<CampaignId>>,
    /// Raw engagement counts per campaign
    pub(crate) engagement: HashMap<CampaignId, u64>,
    /// Embedding dimension, fixed by the first inserted message
    pub(crate) dimension: Option<usize>,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            user_messages: HashMap::new(),
            user_campaigns: HashMap::new(),
            engagement: HashMap::new(),
            dimension: None,
        }
    }

    /// All stored messages
    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    /// Messages sent by one user, in load order
    pub fn get_user_messages(&self, user_id: &str) -> Vec<&MessageRecord> {
        self.user_messages
            .get(user_id)
            .map(|positions| positions.iter().map(|&i| &self.messages[i]).collect())
            .unwrap_or_default()
    }

    /// Every user with at least one message, sorted
    pub fn user_ids(&self) -> Vec<&UserId> {
        let mut ids: Vec<&UserId> = self.user_messages.keys().collect();
        ids.sort();
        ids
    }

    /// Distinct campaigns a user sent messages about
    pub fn get_user_campaigns(&self, user_id: &str) -> &[CampaignId] {
        self.user_campaigns
            .get(user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Raw engagement count, if the analytics data has a row for the campaign
    pub fn get_engagement(&self, campaign_id: &str) -> Option<u64> {
        self.engagement.get(campaign_id).copied()
    }

    /// Embedding dimension shared by every stored message
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Returns true when no messages are stored (an unpopulated vector index)
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Insert a message and update the user and graph indices
    pub fn insert_message(&mut self, message: MessageRecord) {
        if self.dimension.is_none() {
            self.dimension = Some(message.embedding.len());
        }

        let position = self.messages.len();
        self.user_messages
            .entry(message.user_id.clone())
            .or_default()
            .push(position);

        let campaigns = self.user_campaigns.entry(message.user_id.clone()).or_default();
        if !campaigns.contains(&message.campaign_id) {
            campaigns.push(message.campaign_id.clone());
        }

        self.messages.push(message);
    }

    /// Set (or overwrite) the raw engagement count for a campaign
    pub fn set_engagement(&mut self, campaign_id: impl Into<CampaignId>, count: u64) {
        self.engagement.insert(campaign_id.into(), count);
    }

    /// Get counts for debugging/validation: (users, campaigns, messages)
    pub fn counts(&self) -> (usize, usize, usize) {
        let campaigns: HashSet<&CampaignId> = self
            .messages
            .iter()
            .map(|m| &m.campaign_id)
            .chain(self.engagement.keys())
            .collect();
        (self.user_messages.len(), campaigns.len(), self.messages.len())
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}
