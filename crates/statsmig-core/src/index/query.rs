//! Query strings and facet helpers for the statistics index.

use crate::models::{FieldKind, LegacyId, ObjectKind};
use std::collections::HashMap;
use tracing::debug;

/// A raw facet bucket as returned by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetEntry {
    pub value: String,
    pub count: u64,
}

/// A distinct legacy id and how many records reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetCount {
    pub legacy_id: LegacyId,
    pub count: u64,
}

/// Matches records whose `field` still holds a value without a `-`.
pub fn legacy_clause(field: &str) -> String {
    format!("({field}:* AND -({field}:*-*))")
}

/// Matches records with a legacy value in any tracked field.
pub fn legacy_query() -> String {
    FieldKind::ALL
        .iter()
        .map(|field| legacy_clause(field.name()))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// One facet request per field that can hold ids of `kind`: `(facet field, query)`.
pub fn subject_facet_queries(kind: ObjectKind) -> Vec<(&'static str, String)> {
    let code = kind.type_code();
    let mut queries = vec![
        ("id", format!("type:{} AND {}", code, legacy_clause("id"))),
        (
            "scopeId",
            format!("scopeType:{} AND {}", code, legacy_clause("scopeId")),
        ),
    ];
    if let Some(owning) = kind.owning_field() {
        queries.push((owning, legacy_clause(owning)));
    }
    queries
}

/// Matches every record that references `legacy_id` as a `kind` object.
pub fn referencing_query(kind: ObjectKind, legacy_id: LegacyId) -> String {
    let code = kind.type_code();
    let mut clauses = vec![
        format!("(type:{code} AND id:{legacy_id})"),
        format!("(scopeType:{code} AND scopeId:{legacy_id})"),
    ];
    if let Some(owning) = kind.owning_field() {
        clauses.push(format!("{owning}:{legacy_id}"));
    }
    clauses.join(" OR ")
}

/// Filter for records whose `uid` sorts strictly after `uid`.
pub fn uid_after_filter(uid: &str) -> String {
    let escaped = uid.replace('\\', "\\\\").replace('"', "\\\"");
    format!("uid:{{\"{}\" TO *]", escaped)
}

/// Parse a flat `[value, count, value, count, ...]` facet list.
pub fn parse_facet_pairs(raw: &[serde_json::Value]) -> Vec<FacetEntry> {
    raw.chunks_exact(2)
        .filter_map(|pair| {
            let value = match &pair[0] {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let count = pair[1].as_u64()?;
            Some(FacetEntry { value, count })
        })
        .collect()
}

/// Merge facet buckets from several fields into distinct legacy ids,
/// most-referenced first.
pub fn merge_facets(groups: &[Vec<FacetEntry>], limit: usize) -> Vec<FacetCount> {
    let mut totals: HashMap<LegacyId, u64> = HashMap::new();
    for entry in groups.iter().flatten() {
        match entry.value.trim().parse::<LegacyId>() {
            Ok(legacy_id) => *totals.entry(legacy_id).or_default() += entry.count,
            Err(_) => debug!("Skipping non numeric facet value {:?}", entry.value),
        }
    }

    let mut merged: Vec<FacetCount> = totals
        .into_iter()
        .map(|(legacy_id, count)| FacetCount { legacy_id, count })
        .collect();
    merged.sort_by(|a, b| b.count.cmp(&a.count).then(a.legacy_id.cmp(&b.legacy_id)));
    merged.truncate(limit);
    merged
}
