//! Access to the usage-statistics index.
//!
//! This module provides:
//! - The [`StatisticsIndex`] seam the batch driver works against
//! - A Solr implementation over HTTP
//! - An in-process implementation with commit visibility, for tests and dry runs
//! - Query builders and facet helpers

mod memory;
mod query;
mod solr;

pub use memory::MemoryIndex;
pub use query::{
    legacy_clause, legacy_query, merge_facets, parse_facet_pairs, referencing_query,
    subject_facet_queries, uid_after_filter, FacetCount, FacetEntry,
};
pub use solr::{core_url, SolrIndex};

use crate::error::Result;
use crate::models::{LegacyId, ObjectKind, StatsRecord};
use async_trait::async_trait;

/// Facet counts behind the legacy-id report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportCounts {
    /// Records matching the legacy query.
    pub num_found: u64,
    /// Buckets of the `type` field.
    pub type_facets: Vec<FacetEntry>,
    /// Buckets of the `scopeType` field.
    pub scope_type_facets: Vec<FacetEntry>,
}

/// The operations the migrator needs from a statistics shard.
///
/// Records added through [`add`](StatisticsIndex::add) are only visible to
/// queries after [`commit`](StatisticsIndex::commit).
#[async_trait]
pub trait StatisticsIndex: Send + Sync {
    /// Distinct legacy ids of `kind` still present in the shard, most-referenced first.
    async fn legacy_facets(&self, kind: ObjectKind, limit: usize) -> Result<Vec<FacetCount>>;

    /// Records referencing `legacy_id` as subject, scope, or owner of kind `kind`.
    async fn records_referencing(
        &self,
        kind: ObjectKind,
        legacy_id: LegacyId,
        rows: usize,
    ) -> Result<Vec<StatsRecord>>;

    /// Records with a legacy value in any tracked field, ordered by `uid`,
    /// starting after the `uid` given as cursor.
    async fn legacy_records(&self, after: Option<&str>, rows: usize)
        -> Result<Vec<StatsRecord>>;

    async fn report_counts(&self) -> Result<ReportCounts>;

    /// Submit rewritten records, replacing stored ones with the same `uid`.
    async fn add(&self, docs: &[StatsRecord]) -> Result<()>;

    async fn commit(&self) -> Result<()>;
}
