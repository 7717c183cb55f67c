//! Statsmig Core - migrates legacy integer ids in usage statistics to UUIDs.
//!
//! Statistics records written before objects were keyed by UUID reference
//! communities, collections, items, bitstreams, people and groups by their
//! old integer ids. This crate finds those records in a Solr statistics
//! shard, resolves each id against the repository database and writes the
//! records back with UUIDs. Ids that no longer resolve are marked so that
//! later runs skip them.
//!
//! The command line front end lives in the `statsmig-cli` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use statsmig_core::{MigrationConfig, Migrator, SolrIndex, SqliteLookup};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> statsmig_core::Result<()> {
//!     let config = MigrationConfig::default();
//!     let index = SolrIndex::new("http://localhost:8080/solr/statistics", &config.index_name)?;
//!     let lookup = SqliteLookup::open("/var/lib/repository/repository.db")?;
//!
//!     let mut migrator = Migrator::new(index, lookup, config)?;
//!     let summary = migrator.run().await;
//!     println!("Migrated {} records", summary.processed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod index;
pub mod mapper;
pub mod models;
pub mod network;
pub mod persistence;
pub mod report;
pub mod resolver;

// Re-export commonly used types
pub use config::{MigrationConfig, MigrationDefaults};
pub use driver::{FailureSource, KindSummary, Migrator, PhaseFailure, RunSummary};
pub use error::{MigrateError, Result};
pub use index::{MemoryIndex, SolrIndex, StatisticsIndex};
pub use mapper::{map_field, map_record, FieldOutcome, UNMIGRATED_SUFFIX};
pub use models::{FieldKind, ObjectKey, ObjectKind, StatsRecord};
pub use persistence::{LegacyLookup, SqliteLookup};
pub use report::LegacyReport;
pub use resolver::Resolver;
