use anyhow::{Context, Result};
use data_loader::DataIndex;
use std::path::PathBuf;
use std::time::Instant;

fn main() -> Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/campaigns"));

    println!("Loading campaign dataset from {}...\n", data_dir.display());

    let start = Instant::now();
    let index = DataIndex::load_from_files(&data_dir)
        .with_context(|| format!("Failed to load dataset from {}", data_dir.display()))?;
    let elapsed = start.elapsed();

    let (users, campaigns, messages) = index.counts();

    println!("=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Campaigns: {}", campaigns);
    println!("Messages: {}", messages);
    println!("Embedding dimension: {:?}", index.dimension());
    println!(
        "\nPerformance: {:.0} messages/second",
        messages as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
