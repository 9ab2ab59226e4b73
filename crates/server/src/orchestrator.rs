//! # Recommendation Orchestrator
//!
//! This module sequences the hybrid pipeline for one user:
//! 1. Resolve the user's aggregate embedding
//! 2. Find the 5 nearest neighbor users (vector index)
//! 3. Expand neighbors to connected campaigns (graph store)
//! 4. Score those campaigns by engagement (analytics store)
//! 5. Rank, explain and truncate to `top_k`
//!
//! ## Failure Model
//!
//! Stages run strictly one after another. An empty or failed similarity or
//! graph stage ends the run with an empty list; an empty or failed
//! engagement stage does not, ranking proceeds with zero engagement.
//!
//! The whole run executes in its own task, so a panic anywhere inside a
//! stage is caught at the boundary and turned into an empty result. The
//! task is aborted if the caller stops waiting for it. Ranking runs on the
//! blocking pool.
//! [`RecommendationOrchestrator::recommend`] therefore never errors;
//! [`RecommendationOrchestrator::recommend_with_outcome`] additionally says
//! *why* a list came back empty.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, info_span, warn, Instrument};

use data_loader::{CampaignExpansion, CampaignId, EngagementScores, NeighborUser, Recommendation, UserId};
use pipeline::RankingEngine;
use sources::{
    AnalyticsStore, EngagementScorer, GraphExpansionClient, GraphStore, NEIGHBOR_FANOUT, SimilarityClient,
    SourceError, VectorIndex,
};

/// The step of the pipeline an outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    UserEmbedding,
    SimilarUsers,
    GraphExpansion,
    EngagementScoring,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserEmbedding => "user embedding",
            Self::SimilarUsers => "similar users",
            Self::GraphExpansion => "graph expansion",
            Self::EngagementScoring => "engagement scoring",
        };
        f.write_str(name)
    }
}

/// Why a run produced no recommendations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    /// Legitimately nothing to recommend (unknown user, no neighbors, ...)
    NoData(PipelineStage),

    /// A store could not be reached or failed the query
    BackendUnavailable { stage: PipelineStage, message: String },

    /// Anything else: malformed store data, or a panic (stage unknown)
    UnexpectedFailure {
        stage: Option<PipelineStage>,
        message: String,
    },
}

impl EmptyReason {
    fn from_source_error(stage: PipelineStage, err: SourceError) -> Self {
        if err.is_backend_failure() {
            Self::BackendUnavailable {
                stage,
                message: err.to_string(),
            }
        } else {
            Self::UnexpectedFailure {
                stage: Some(stage),
                message: err.to_string(),
            }
        }
    }

    /// True when the empty result reflects the data rather than a failure
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData(_))
    }
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData(stage) => write!(f, "no data at {}", stage),
            Self::BackendUnavailable { stage, message } => {
                write!(f, "backend unavailable at {}: {}", stage, message)
            }
            Self::UnexpectedFailure { stage: Some(stage), message } => {
                write!(f, "unexpected failure at {}: {}", stage, message)
            }
            Self::UnexpectedFailure { stage: None, message } => {
                write!(f, "unexpected failure: {}", message)
            }
        }
    }
}

/// Result of one orchestrated run, tagged with its provenance
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutcome {
    /// Ranking ran. `degraded` lists stages that failed but did not stop it.
    Ranked {
        recommendations: Vec<Recommendation>,
        degraded: Vec<PipelineStage>,
    },
    Empty(EmptyReason),
}

impl RecommendationOutcome {
    pub fn recommendations(&self) -> &[Recommendation] {
        match self {
            Self::Ranked { recommendations, .. } => recommendations,
            Self::Empty(_) => &[],
        }
    }

    pub fn into_recommendations(self) -> Vec<Recommendation> {
        match self {
            Self::Ranked { recommendations, .. } => recommendations,
            Self::Empty(_) => Vec::new(),
        }
    }

    /// False when a store failure shaped the result
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Ranked { degraded, .. } => degraded.is_empty(),
            Self::Empty(reason) => reason.is_no_data(),
        }
    }
}

/// Main orchestrator that coordinates the recommendation pipeline
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    similarity: SimilarityClient,
    graph: GraphExpansionClient,
    engagement: EngagementScorer,
    ranking: Arc<RankingEngine>,
}

impl RecommendationOrchestrator {
    /// Build from already constructed clients
    pub fn new(similarity: SimilarityClient, graph: GraphExpansionClient, engagement: EngagementScorer) -> Self {
        Self {
            similarity,
            graph,
            engagement,
            ranking: Arc::new(RankingEngine::new()),
        }
    }

    /// Wrap the three stores and verify each one answers.
    ///
    /// Fails if any store reports itself unhealthy or cannot be reached.
    pub async fn connect(
        vector_index: Arc<dyn VectorIndex>,
        graph_store: Arc<dyn GraphStore>,
        analytics_store: Arc<dyn AnalyticsStore>,
    ) -> Result<Self> {
        Self::new(
            SimilarityClient::new(vector_index),
            GraphExpansionClient::new(graph_store),
            EngagementScorer::new(analytics_store),
        )
        .verified()
        .await
    }

    /// Health-check every backend, failing if any is unreachable
    pub async fn verified(self) -> Result<Self> {
        for (name, status) in self.check_backends().await {
            status.with_context(|| format!("Health check failed for {}", name))?;
            info!("Backend {} is healthy", name);
        }
        Ok(self)
    }

    pub fn similarity(&self) -> &SimilarityClient {
        &self.similarity
    }

    /// Health of every backing store, keyed by store name
    pub async fn check_backends(&self) -> Vec<(String, Result<(), SourceError>)> {
        let (vector, graph, analytics) = tokio::join!(
            self.similarity.health_check(),
            self.graph.health_check(),
            self.engagement.health_check(),
        );

        vec![
            (self.similarity.backend_name().to_string(), vector),
            (self.graph.backend_name().to_string(), graph),
            (self.engagement.backend_name().to_string(), analytics),
        ]
    }

    /// Main entry point: at most `top_k` recommendations, best first.
    ///
    /// Never fails; every failure degrades to an empty list.
    pub async fn recommend(&self, user_id: &str, top_k: usize) -> Vec<Recommendation> {
        self.recommend_with_outcome(user_id, top_k)
            .await
            .into_recommendations()
    }

    /// Same as [`Self::recommend`], tagged with why the list may be empty
    pub async fn recommend_with_outcome(&self, user_id: &str, top_k: usize) -> RecommendationOutcome {
        let start_time = Instant::now();
        let span = info_span!("recommend", user_id = %user_id, top_k);

        let this = self.clone();
        let user: UserId = user_id.to_string();
        let mut run = AbortOnDrop(tokio::spawn(
            async move { this.run_pipeline(&user, top_k).await }.instrument(span),
        ));

        let outcome = match (&mut run.0).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let message = join_error_message(join_error);
                error!("Error in hybrid retrieval for user {}: {}", user_id, message);
                RecommendationOutcome::Empty(EmptyReason::UnexpectedFailure { stage: None, message })
            }
        };

        match &outcome {
            RecommendationOutcome::Ranked { recommendations, degraded } => info!(
                "Returned {} recommendations for user {} in {:.2?} (degraded stages: {:?})",
                recommendations.len(),
                user_id,
                start_time.elapsed(),
                degraded
            ),
            RecommendationOutcome::Empty(reason) => info!(
                "No recommendations for user {} in {:.2?}: {}",
                user_id,
                start_time.elapsed(),
                reason
            ),
        }

        outcome
    }

    /// Nearest neighbor users of `user_id` (diagnostics)
    pub async fn similar_users(&self, user_id: &str) -> Vec<NeighborUser> {
        self.similarity.similar_users_for(user_id, NEIGHBOR_FANOUT).await
    }

    /// Campaigns reachable from the neighbors of `user_id` (diagnostics)
    pub async fn campaigns_for(&self, user_id: &str) -> Vec<CampaignExpansion> {
        let neighbors = self.similar_users(user_id).await;
        let ids: Vec<UserId> = neighbors.into_iter().map(|n| n.user_id).collect();
        self.graph.expand_to_campaigns(&ids).await
    }

    async fn run_pipeline(&self, user_id: &str, top_k: usize) -> RecommendationOutcome {
        // Step 1: aggregate embedding
        let embedding = match self.similarity.try_resolve_user_embedding(user_id).await {
            Ok(Some(embedding)) => embedding,
            Ok(None) => {
                warn!("No embeddings found for user {}", user_id);
                return RecommendationOutcome::Empty(EmptyReason::NoData(PipelineStage::UserEmbedding));
            }
            Err(e) => return self.stop(PipelineStage::UserEmbedding, e),
        };

        // Step 2: neighbors
        let neighbors = match self
            .similarity
            .try_find_similar_users(&embedding, user_id, NEIGHBOR_FANOUT)
            .await
        {
            Ok(neighbors) if neighbors.is_empty() => {
                warn!("No similar users found for {}", user_id);
                return RecommendationOutcome::Empty(EmptyReason::NoData(PipelineStage::SimilarUsers));
            }
            Ok(neighbors) => neighbors,
            Err(e) => return self.stop(PipelineStage::SimilarUsers, e),
        };
        info!("Found {} similar users", neighbors.len());

        // Step 3: graph expansion
        let neighbor_ids: Vec<UserId> = neighbors.iter().map(|n| n.user_id.clone()).collect();
        let campaigns = match self.graph.try_expand_to_campaigns(&neighbor_ids).await {
            Ok(campaigns) if campaigns.is_empty() => {
                warn!("No campaigns found for similar users of {}", user_id);
                return RecommendationOutcome::Empty(EmptyReason::NoData(PipelineStage::GraphExpansion));
            }
            Ok(campaigns) => campaigns,
            Err(e) => return self.stop(PipelineStage::GraphExpansion, e),
        };
        info!("Expanded to {} campaigns", campaigns.len());

        // Step 4: engagement; failure here degrades instead of stopping
        let mut degraded = Vec::new();
        let campaign_ids: Vec<CampaignId> = campaigns.iter().map(|c| c.campaign_id.clone()).collect();
        let engagement = match self.engagement.try_score_engagement(&campaign_ids).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!("Error getting campaign engagement frequency: {}", e);
                degraded.push(PipelineStage::EngagementScoring);
                EngagementScores::new()
            }
        };
        info!("Retrieved engagement data for {} campaigns", engagement.len());

        // Step 5: rank
        let ranking = self.ranking.clone();
        let ranked =
            tokio::task::spawn_blocking(move || ranking.rank(&neighbors, &campaigns, &engagement, top_k)).await;
        let recommendations = match ranked {
            Ok(recommendations) => recommendations,
            Err(join_error) => {
                let message = join_error_message(join_error);
                error!("Ranking failed for user {}: {}", user_id, message);
                return RecommendationOutcome::Empty(EmptyReason::UnexpectedFailure { stage: None, message });
            }
        };

        RecommendationOutcome::Ranked {
            recommendations,
            degraded,
        }
    }

    fn stop(&self, stage: PipelineStage, err: SourceError) -> RecommendationOutcome {
        let reason = EmptyReason::from_source_error(stage, err);
        match &reason {
            EmptyReason::BackendUnavailable { .. } => warn!("Stopping at {}: {}", stage, reason),
            _ => error!("Stopping at {}: {}", stage, reason),
        }
        RecommendationOutcome::Empty(reason)
    }
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn join_error_message(join_error: JoinError) -> String {
    if join_error.is_panic() {
        panic_message(join_error.into_panic())
    } else {
        join_error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
