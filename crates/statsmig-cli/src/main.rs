//! Statsmig - upgrades legacy integer ids in one statistics shard.
//!
//! Run once per shard, repeatedly, until the closing report shows no legacy
//! records left. Safe to run while the repository is in use.

use anyhow::{Context, Result};
use clap::Parser;
use statsmig_core::config::MigrationDefaults;
use statsmig_core::{MigrationConfig, Migrator, ObjectKind, SolrIndex, SqliteLookup};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const BANNER: &str = "\
 * Run this once per statistics shard, and again until no records with
 * legacy ids remain. The repository can stay online meanwhile.
 * Expect roughly an hour per 1,000,000 legacy records.
 *
 * Most records are rewritten, so a shard may temporarily grow to about
 *\ttwice its size. Optimize the Solr cores once the migration is done.
 * -------------------------------------------------------------------";

#[derive(Parser, Debug)]
#[command(name = "statsmig")]
#[command(about = "Replace legacy integer ids in Solr usage statistics with UUIDs")]
#[command(after_help = "Use -n to bound the load on the server; pass a large value \
(e.g. 10000000) to process a whole shard in one go.")]
struct Args {
    /// Statistics shard to process
    #[arg(short, long, default_value = MigrationDefaults::INDEX_NAME)]
    index_name: String,

    /// Total number of records to update
    #[arg(short, long = "num-rec", default_value_t = MigrationDefaults::MAX_RECORDS)]
    num_rec: usize,

    /// Number of records submitted to Solr at once
    #[arg(short, long, default_value_t = MigrationDefaults::BATCH_SIZE)]
    batch_size: usize,

    /// Only process references to one kind of object
    #[arg(short = 't', long = "type", value_parser = parse_kind)]
    object_type: Option<ObjectKind>,

    /// URL of the statistics core
    #[arg(long, default_value = MigrationDefaults::SOLR_SERVER)]
    solr_url: String,

    /// Repository database used to resolve legacy ids
    #[arg(long)]
    database: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn migration_config(&self) -> MigrationConfig {
        MigrationConfig {
            index_name: self.index_name.clone(),
            max_records: self.num_rec,
            batch_size: self.batch_size,
            object_type: self.object_type,
            ..MigrationConfig::default()
        }
    }
}

/// Accept a kind name (`item`) or its numeric type code (`2`).
fn parse_kind(raw: &str) -> std::result::Result<ObjectKind, String> {
    let kind = ObjectKind::from_str(raw)
        .or_else(|| raw.parse::<i32>().ok().and_then(ObjectKind::from_type_code))
        .ok_or_else(|| format!("unknown object type '{}'", raw))?;
    if ObjectKind::PROCESSING_ORDER.contains(&kind) {
        Ok(kind)
    } else {
        Err(format!(
            "'{}' cannot be processed on its own; use item, bitstream, collection or community",
            kind
        ))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    println!("{}", BANNER);

    let config = args.migration_config();
    config.validate().context("Invalid options")?;

    let index = SolrIndex::new(&args.solr_url, &config.index_name)
        .with_context(|| format!("Cannot use statistics server {}", args.solr_url))?;
    println!("Connecting to {}", index.base_url());
    let lookup = SqliteLookup::open(&args.database)
        .with_context(|| format!("Cannot open repository database {}", args.database.display()))?;

    let mut migrator = Migrator::new(index, lookup, config)?;
    let summary = migrator.run().await;

    info!(
        "Processed {} records ({} by sweep) in {}",
        summary.processed, summary.swept, summary.index_name
    );
    for failure in &summary.failures {
        println!("Phase '{}' did not finish: {}", failure.phase, failure.error);
    }

    Ok(())
}
