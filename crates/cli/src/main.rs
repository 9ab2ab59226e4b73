use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{CampaignExpansion, DataIndex, NeighborUser, UserId};
use rand::seq::IndexedRandom;
use server::backends::load_data_index;
use server::{
    Backends, BackendKind, HealthReport, RecommendationRequest, RecommendationResponse, RecommendationService,
    ResponseSource, Settings,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store_client::StoreService;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// campaign-recs - Hybrid Campaign Recommendation Engine
#[derive(Parser)]
#[command(name = "campaign-recs")]
#[command(
    about = "Campaign recommendations from vector similarity, graph expansion and engagement",
    long_about = None
)]
struct Cli {
    /// Path to a settings file (defaults to ./campaign-recs.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset directory for the local backend (overrides settings)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Which stores to use (overrides settings)
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Local,
    Grpc,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => BackendKind::Local,
            BackendArg::Grpc => BackendKind::Grpc,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Get campaign recommendations for a user
    Recommend {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: UserId,

        /// Number of recommendations to return (1-20)
        #[arg(long)]
        top_k: Option<usize>,

        /// Drop recommendations below this confidence
        #[arg(long)]
        min_confidence: Option<f32>,

        /// Show explanation and metadata for each recommendation
        #[arg(long)]
        explain: bool,

        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the nearest neighbor users of a user
    Similar {
        #[arg(long)]
        user_id: UserId,
    },

    /// Show campaigns reachable from a user's neighbors
    Campaigns {
        #[arg(long)]
        user_id: UserId,
    },

    /// Check every dependency
    Health,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Users to sample from (required for the grpc backend)
        #[arg(long, value_delimiter = ',')]
        users: Vec<UserId>,

        /// Call the orchestrator directly instead of the cached service
        #[arg(long)]
        bypass_cache: bool,
    },

    /// Serve the local dataset as gRPC store services
    ServeStores {
        #[arg(long, default_value = "127.0.0.1:50061")]
        listen: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings.backend.data_dir = data_dir;
    }
    if let Some(backend) = cli.backend {
        settings.backend.kind = backend.into();
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)))
        .init();

    // The local dataset is needed by a few commands even before the service
    let data_index = match settings.backend.kind {
        BackendKind::Local => Some(load_dataset(&settings).await?),
        BackendKind::Grpc => None,
    };

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            user_id,
            top_k,
            min_confidence,
            explain,
            json,
        } => {
            let service = connect_service(&settings, data_index.as_ref()).await?;
            handle_recommend(&service, user_id, top_k, min_confidence, explain, json).await?
        }
        Commands::Similar { user_id } => {
            let service = connect_service(&settings, data_index.as_ref()).await?;
            handle_similar(&service, &user_id).await
        }
        Commands::Campaigns { user_id } => {
            let service = connect_service(&settings, data_index.as_ref()).await?;
            handle_campaigns(&service, &user_id).await
        }
        Commands::Health => {
            let service = connect_service(&settings, data_index.as_ref()).await?;
            handle_health(&service).await?
        }
        Commands::Benchmark {
            requests,
            concurrent,
            top_k,
            users,
            bypass_cache,
        } => {
            let users = benchmark_users(users, data_index.as_deref())?;
            let service = connect_service(&settings, data_index.as_ref()).await?;
            handle_benchmark(Arc::new(service), users, requests, concurrent, top_k, bypass_cache).await?
        }
        Commands::ServeStores { listen } => {
            let data_index = data_index.ok_or_else(|| anyhow!("serve-stores needs the local backend"))?;
            handle_serve_stores(data_index, listen).await?
        }
    }

    Ok(())
}

/// Health-check the configured stores and build the service
async fn connect_service(settings: &Settings, data_index: Option<&Arc<DataIndex>>) -> Result<RecommendationService> {
    let backends = match data_index {
        Some(index) => Backends::in_memory(index.clone()),
        None => Backends::connect_grpc(&settings.backend).await?,
    };
    server::build_service_with(backends, settings).await
}

async fn load_dataset(settings: &Settings) -> Result<Arc<DataIndex>> {
    let data_dir = &settings.backend.data_dir;
    println!("Loading campaign dataset from {}...", data_dir.display());
    let start = Instant::now();
    let data_index = load_data_index(data_dir)
        .await
        .context("Failed to load campaign dataset")?;
    let (users, campaigns, messages) = data_index.counts();
    println!(
        "{} Loaded {} users, {} campaigns, {} messages in {:?}",
        "✓".green(),
        users,
        campaigns,
        messages,
        start.elapsed()
    );
    Ok(data_index)
}

/// Handle the 'recommend' command
async fn handle_recommend(
    service: &RecommendationService,
    user_id: UserId,
    top_k: Option<usize>,
    min_confidence: Option<f32>,
    explain: bool,
    json: bool,
) -> Result<()> {
    let mut request = RecommendationRequest::new(user_id);
    if let Some(top_k) = top_k {
        request = request.with_top_k(top_k);
    }
    if let Some(min_confidence) = min_confidence {
        request = request.with_min_confidence(min_confidence);
    }
    if !explain && !json {
        request = request.without_explanation();
    }

    let response = service.recommend(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_recommendations(&response, explain);
    }
    Ok(())
}

/// Handle the 'similar' command
async fn handle_similar(service: &RecommendationService, user_id: &str) {
    let neighbors = service.orchestrator().similar_users(user_id).await;
    print_neighbors(user_id, &neighbors);
}

/// Handle the 'campaigns' command
async fn handle_campaigns(service: &RecommendationService, user_id: &str) {
    let campaigns = service.orchestrator().campaigns_for(user_id).await;
    print_campaigns(user_id, &campaigns);
}

/// Handle the 'health' command
async fn handle_health(service: &RecommendationService) -> Result<()> {
    let report = service.health().await;
    print_health(&report);
    if !report.is_healthy() {
        bail!("one or more dependencies are unavailable");
    }
    Ok(())
}

fn benchmark_users(explicit: Vec<UserId>, data_index: Option<&DataIndex>) -> Result<Vec<UserId>> {
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    let index = data_index.ok_or_else(|| anyhow!("--users is required with the grpc backend"))?;
    let users: Vec<UserId> = index.user_ids().into_iter().cloned().collect();
    if users.is_empty() {
        bail!("dataset has no users to benchmark");
    }
    Ok(users)
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: Arc<RecommendationService>,
    users: Vec<UserId>,
    requests: usize,
    concurrent: usize,
    top_k: usize,
    bypass_cache: bool,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }

    // Pick all users up front; the thread-local rng cannot cross tasks
    let mut rng = rand::rng();
    let picks: Vec<UserId> = (0..requests)
        .filter_map(|_| users.choose(&mut rng).cloned())
        .collect();

    info!(
        "Benchmarking {} requests over {} users ({} concurrent)",
        picks.len(),
        users.len(),
        concurrent
    );

    let limit = Arc::new(Semaphore::new(concurrent.max(1)));
    let wall_clock = Instant::now();

    // Use tokio::spawn to make concurrent requests
    let mut handles = Vec::with_capacity(picks.len());
    for user in picks {
        let service = service.clone();
        let limit = limit.clone();
        handles.push(tokio::spawn(async move {
            let _permit = limit.acquire_owned().await?;
            let start = Instant::now();
            let cached = if bypass_cache {
                service.orchestrator().recommend(&user, top_k).await;
                false
            } else {
                let response = service
                    .recommend(RecommendationRequest::new(user).with_top_k(top_k))
                    .await?;
                response.source == ResponseSource::Cache
            };
            Ok::<_, anyhow::Error>((start.elapsed(), cached))
        }));
    }

    // Wait for all tasks to complete and collect timings
    let mut timings = Vec::with_capacity(handles.len());
    let mut cache_hits = 0usize;
    for handle in handles {
        let (elapsed, cached) = handle.await??;
        timings.push(elapsed);
        cache_hits += usize::from(cached);
    }
    let total_time = wall_clock.elapsed();

    let summary = LatencySummary::from_timings(&mut timings);
    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} served from cache)", timings.len(), cache_hits);
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", summary.mean);
    println!("P50 latency: {:?}", summary.p50);
    println!("P95 latency: {:?}", summary.p95);
    println!("P99 latency: {:?}", summary.p99);
    println!(
        "Throughput: {:.2} requests/second",
        timings.len() as f64 / total_time.as_secs_f64()
    );

    Ok(())
}

/// Handle the 'serve-stores' command
async fn handle_serve_stores(data_index: Arc<DataIndex>, listen: SocketAddr) -> Result<()> {
    let backends = Backends::in_memory(data_index);
    println!(
        "{} Serving vector, graph and analytics stores on {}",
        "✓".green(),
        listen.to_string().bold()
    );

    StoreService::new(backends.vector_index, backends.graph_store, backends.analytics_store)
        .into_router()
        .serve(listen)
        .await
        .context("Store server failed")?;
    Ok(())
}

/// Latency percentiles over one benchmark run
#[derive(Debug, PartialEq)]
struct LatencySummary {
    mean: Duration,
    p50: Duration,
    p95: Duration,
    p99: Duration,
}

impl LatencySummary {
    /// Sorts `timings` in place; an empty slice gives all zeros
    fn from_timings(timings: &mut [Duration]) -> Self {
        if timings.is_empty() {
            return Self {
                mean: Duration::ZERO,
                p50: Duration::ZERO,
                p95: Duration::ZERO,
                p99: Duration::ZERO,
            };
        }

        timings.sort();
        // Nearest-rank percentile
        let percentile = |p: usize| {
            let rank = (timings.len() * p).div_ceil(100).clamp(1, timings.len());
            timings[rank - 1]
        };

        Self {
            mean: timings.iter().sum::<Duration>() / timings.len() as u32,
            p50: percentile(50),
            p95: percentile(95),
            p99: percentile(99),
        }
    }
}

/// Helper function to format and print recommendations
fn print_recommendations(response: &RecommendationResponse, explain: bool) {
    let source = match response.source {
        ResponseSource::Cache => "cache".yellow(),
        ResponseSource::Hybrid => "hybrid".cyan(),
    };
    println!(
        "{} {} ({} in {:.1} ms)",
        "Recommendations for".bold().blue(),
        response.user_id.bold(),
        source,
        response.latency_ms
    );

    if response.recommendations.is_empty() {
        println!("  (no recommendations)");
        return;
    }

    for (i, rec) in response.recommendations.iter().enumerate() {
        println!(
            "{}. {} - Score: {:.3}, Confidence: {:.2}",
            (i + 1).to_string().green(),
            rec.campaign_id.bold(),
            rec.score,
            rec.confidence
        );
        if explain {
            println!("   {}", rec.explanation);
            println!(
                "   similarity {:.3} | users {} | engagement {:.3} | via {}",
                rec.metadata.similarity_score,
                rec.metadata.user_count,
                rec.metadata.engagement_frequency,
                rec.metadata.similar_users.join(", ")
            );
        }
    }
}

fn print_neighbors(user_id: &str, neighbors: &[NeighborUser]) {
    println!("{}", format!("Similar users for {}:", user_id).bold().blue());
    if neighbors.is_empty() {
        println!("  (none)");
    }
    for (i, n) in neighbors.iter().enumerate() {
        println!(
            "{}. {} - similarity {:.3} ({} hits)",
            (i + 1).to_string().green(),
            n.user_id,
            n.similarity,
            n.hit_count
        );
    }
}

fn print_campaigns(user_id: &str, campaigns: &[CampaignExpansion]) {
    println!(
        "{}",
        format!("Campaigns reached through neighbors of {}:", user_id).bold().blue()
    );
    if campaigns.is_empty() {
        println!("  (none)");
    }
    for c in campaigns {
        println!(
            "{}{} - {} users [{}]",
            "• ".cyan(),
            c.campaign_id,
            c.user_count,
            c.user_list.join(", ")
        );
    }
}

fn print_health(report: &HealthReport) {
    let status = if report.is_healthy() {
        report.status.green()
    } else {
        report.status.red()
    };
    println!("{} {} (v{})", "Status:".bold(), status, report.version);
    for (name, dependency) in &report.dependencies {
        let label = match dependency {
            server::service::DependencyStatus::Ok => "ok".green(),
            server::service::DependencyStatus::Unavailable => "unavailable".red(),
        };
        println!("{}{}: {}", "• ".cyan(), name, label);
    }
}
