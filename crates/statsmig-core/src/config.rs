//! Centralized configuration for the statistics migrator.
//!
//! Constant holders for defaults and tuning limits, plus the per-run
//! [`MigrationConfig`] value built by the CLI.

use crate::error::{MigrateError, Result};
use crate::models::ObjectKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Defaults for a migration run.
pub struct MigrationDefaults;

impl MigrationDefaults {
    pub const INDEX_NAME: &'static str = "statistics";
    pub const MAX_RECORDS: usize = 100_000;
    pub const BATCH_SIZE: usize = 10_000;
    /// Resolver cache size above which the cache and persistence context are rebuilt.
    pub const CACHE_LIMIT: usize = 20_000;
    /// Distinct legacy ids requested per facet page.
    pub const FACET_LIMIT: usize = 1_000;
    pub const SOLR_SERVER: &'static str = "http://localhost:8080/solr/statistics";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
    pub const USER_AGENT: &'static str = "statsmig/0.1";
}

/// Resolution cache tuning.
pub struct CacheSettings;

impl CacheSettings {
    pub const TIME_TO_LIVE: Duration = Duration::from_secs(1800);
    pub const MAX_CAPACITY: u64 = 200_000;
}

/// Options for a single migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationConfig {
    /// Name of the statistics shard to process.
    pub index_name: String,
    /// Stop after this many records have been rewritten.
    pub max_records: usize,
    /// Records submitted to the index per commit.
    pub batch_size: usize,
    pub cache_limit: usize,
    pub facet_limit: usize,
    /// Restrict the run to a single object type.
    pub object_type: Option<ObjectKind>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            index_name: MigrationDefaults::INDEX_NAME.to_string(),
            max_records: MigrationDefaults::MAX_RECORDS,
            batch_size: MigrationDefaults::BATCH_SIZE,
            cache_limit: MigrationDefaults::CACHE_LIMIT,
            facet_limit: MigrationDefaults::FACET_LIMIT,
            object_type: None,
        }
    }
}

impl MigrationConfig {
    /// Reject settings that would stall the driver.
    pub fn validate(&self) -> Result<()> {
        if self.index_name.trim().is_empty() {
            return Err(MigrateError::Validation {
                field: "index_name".into(),
                message: "must not be empty".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(MigrateError::Validation {
                field: "batch_size".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.max_records == 0 {
            return Err(MigrateError::Validation {
                field: "max_records".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.facet_limit == 0 {
            return Err(MigrateError::Validation {
                field: "facet_limit".into(),
                message: "must be greater than zero".into(),
            });
        }
        if let Some(kind) = self.object_type {
            if !ObjectKind::PROCESSING_ORDER.contains(&kind) {
                return Err(MigrateError::Validation {
                    field: "object_type".into(),
                    message: format!("{} records cannot be processed by type", kind),
                });
            }
        }
        Ok(())
    }
}
