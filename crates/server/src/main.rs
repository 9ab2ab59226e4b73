//! Simple test harness for the recommendation service.
//!
//! Loads settings (file + environment), bootstraps the configured backend
//! and prints recommendations for one user as JSON.
//!
//! Usage: `server [user_id] [top_k]`

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::{RecommendationRequest, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load(None)?;

    // Initialize logging; RUST_LOG wins over the configured filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    info!("Starting campaign-recs service harness ({:?} backend)", settings.backend.kind);

    let mut args = std::env::args().skip(1);
    let user_id = args.next().unwrap_or_else(|| "user_1".to_string());
    let mut request = RecommendationRequest::new(user_id);
    if let Some(top_k) = args.next() {
        request = request.with_top_k(top_k.parse().context("top_k must be a positive integer")?);
    }

    let service = server::build_service(&settings).await?;
    info!("Service ready: {:?}", service.health().await);

    let response = service.recommend(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
