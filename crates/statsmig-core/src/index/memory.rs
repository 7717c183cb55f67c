//! In-process statistics index.
//!
//! Mirrors the parts of Solr the migrator relies on: queries see only
//! committed documents, and an added document replaces the stored one with
//! the same `uid`.

use super::query::{merge_facets, FacetCount, FacetEntry};
use super::{ReportCounts, StatisticsIndex};
use crate::error::{MigrateError, Result};
use crate::models::{FieldKind, LegacyId, ObjectKind, StatsRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    committed: Vec<StatsRecord>,
    pending: Vec<StatsRecord>,
    commits: usize,
    fail_commits: bool,
}

/// Statistics index held in memory.
#[derive(Default)]
pub struct MemoryIndex {
    inner: Mutex<Inner>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `records` already committed.
    pub fn with_records(records: impl IntoIterator<Item = StatsRecord>) -> Self {
        let index = Self::new();
        if let Ok(mut inner) = index.inner.lock() {
            inner.committed.extend(records);
        }
        index
    }

    /// Committed documents, in insertion order.
    pub fn records(&self) -> Vec<StatsRecord> {
        self.lock().map(|inner| inner.committed.clone()).unwrap_or_default()
    }

    pub fn record(&self, uid: &str) -> Option<StatsRecord> {
        self.records()
            .into_iter()
            .find(|record| record.uid().as_deref() == Some(uid))
    }

    pub fn commit_count(&self) -> usize {
        self.lock().map(|inner| inner.commits).unwrap_or(0)
    }

    /// Make every following commit fail, as an unreachable index would.
    pub fn fail_commits(&self, fail: bool) {
        if let Ok(mut inner) = self.lock() {
            inner.fail_commits = fail;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| MigrateError::Other("Memory index lock poisoned".to_string()))
    }
}

fn has_value(record: &StatsRecord, field: &str, wanted: &str) -> bool {
    record.strings(field).iter().any(|value| value == wanted)
}

fn type_is(record: &StatsRecord, field: &str, kind: ObjectKind) -> bool {
    has_value(record, field, &kind.type_code().to_string())
}

/// Solr's `field:* AND -(field:*-*)`: the field has values and none of
/// them contains `-`.
fn field_is_legacy(record: &StatsRecord, field: &str) -> bool {
    let values = record.strings(field);
    !values.is_empty() && values.iter().all(|value| !value.contains('-'))
}

/// Values of `field` in a record that matches the legacy clause for it.
fn legacy_values(record: &StatsRecord, field: &str) -> Vec<String> {
    if field_is_legacy(record, field) {
        record.strings(field)
    } else {
        Vec::new()
    }
}

fn is_legacy_record(record: &StatsRecord) -> bool {
    FieldKind::ALL
        .iter()
        .any(|field| field_is_legacy(record, field.name()))
}

/// Count values per distinct string, like a Solr field facet.
fn facet(values: impl Iterator<Item = String>) -> Vec<FacetEntry> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(value, count)| FacetEntry { value, count })
        .collect()
}

#[async_trait]
impl StatisticsIndex for MemoryIndex {
    async fn legacy_facets(&self, kind: ObjectKind, limit: usize) -> Result<Vec<FacetCount>> {
        let inner = self.lock()?;
        let docs = &inner.committed;

        let mut groups = vec![
            facet(
                docs.iter()
                    .filter(|r| type_is(r, "type", kind))
                    .flat_map(|r| legacy_values(r, "id")),
            ),
            facet(
                docs.iter()
                    .filter(|r| type_is(r, "scopeType", kind))
                    .flat_map(|r| legacy_values(r, "scopeId")),
            ),
        ];
        if let Some(owning) = kind.owning_field() {
            groups.push(facet(docs.iter().flat_map(|r| legacy_values(r, owning))));
        }
        Ok(merge_facets(&groups, limit))
    }

    async fn records_referencing(
        &self,
        kind: ObjectKind,
        legacy_id: LegacyId,
        rows: usize,
    ) -> Result<Vec<StatsRecord>> {
        let wanted = legacy_id.to_string();
        let inner = self.lock()?;
        Ok(inner
            .committed
            .iter()
            .filter(|r| {
                (type_is(r, "type", kind) && has_value(r, "id", &wanted))
                    || (type_is(r, "scopeType", kind) && has_value(r, "scopeId", &wanted))
                    || kind
                        .owning_field()
                        .is_some_and(|owning| has_value(r, owning, &wanted))
            })
            .take(rows)
            .cloned()
            .collect())
    }

    async fn legacy_records(
        &self,
        after: Option<&str>,
        rows: usize,
    ) -> Result<Vec<StatsRecord>> {
        let inner = self.lock()?;
        let mut matches: Vec<(String, &StatsRecord)> = inner
            .committed
            .iter()
            .filter(|r| is_legacy_record(r))
            .filter_map(|r| r.uid().map(|uid| (uid, r)))
            .filter(|(uid, _)| !matches!(after, Some(cursor) if uid.as_str() <= cursor))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches
            .into_iter()
            .take(rows)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn report_counts(&self) -> Result<ReportCounts> {
        let inner = self.lock()?;
        let legacy: Vec<&StatsRecord> = inner
            .committed
            .iter()
            .filter(|r| is_legacy_record(r))
            .collect();

        Ok(ReportCounts {
            num_found: legacy.len() as u64,
            type_facets: facet(legacy.iter().flat_map(|r| r.strings("type"))),
            scope_type_facets: facet(legacy.iter().flat_map(|r| r.strings("scopeType"))),
        })
    }

    async fn add(&self, docs: &[StatsRecord]) -> Result<()> {
        let mut inner = self.lock()?;
        inner.pending.extend(docs.iter().cloned());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.fail_commits {
            inner.pending.clear();
            return Err(MigrateError::Index {
                status: 503,
                message: "commit refused".to_string(),
            });
        }

        let pending = std::mem::take(&mut inner.pending);
        for doc in pending {
            let uid = doc.uid();
            let existing = uid.as_ref().and_then(|uid| {
                inner
                    .committed
                    .iter()
                    .position(|r| r.uid().as_ref() == Some(uid))
            });
            match existing {
                Some(pos) => inner.committed[pos] = doc,
                None => inner.committed.push(doc),
            }
        }
        inner.commits += 1;
        Ok(())
    }
}
