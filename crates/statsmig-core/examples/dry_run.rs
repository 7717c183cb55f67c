//! Dry run - migrate an exported shard in memory and print the result
//!
//! Usage: cargo run --example dry_run -- <records.json> <repository.db>

use statsmig_core::{MemoryIndex, MigrationConfig, Migrator, Result, SqliteLookup, StatsRecord};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let records_path = args
        .next()
        .unwrap_or_else(|| "./legacy_shard.json".to_string());
    let db_path = args
        .next()
        .unwrap_or_else(|| "./repository.db".to_string());

    println!("Loading records from {}", records_path);
    let content = std::fs::read_to_string(&records_path).map_err(|e| {
        statsmig_core::MigrateError::Config {
            message: format!("Cannot read {}: {}", records_path, e),
        }
    })?;
    let records: Vec<StatsRecord> = serde_json::from_str(&content)?;

    let index = MemoryIndex::with_records(records);
    let lookup = SqliteLookup::open(db_path)?;
    let mut migrator = Migrator::new(index, lookup, MigrationConfig::default())?;
    let summary = migrator.run().await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("{}", serde_json::to_string_pretty(&migrator.index().records())?);
    Ok(())
}
