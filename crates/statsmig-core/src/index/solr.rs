//! Solr statistics shard over HTTP.
//!
//! The migrator works on one shard at a time, so it talks to the core URL
//! directly rather than through whatever alias the application writes to.

use super::query::{
    legacy_query, merge_facets, parse_facet_pairs, referencing_query, subject_facet_queries,
    uid_after_filter, FacetCount, FacetEntry,
};
use super::{ReportCounts, StatisticsIndex};
use crate::error::{MigrateError, Result};
use crate::models::{LegacyId, ObjectKind, StatsRecord};
use crate::network::HttpClient;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

/// Sweep pages are keyed on `uid`, the one field a rewrite never touches.
const SWEEP_SORT: &str = "uid asc";

/// Derive the URL of a shard from the configured statistics server URL.
///
/// A trailing `statistics` path segment is replaced by `index_name`; any
/// other URL is used as given.
pub fn core_url(server: &str, index_name: &str) -> Result<Url> {
    let trimmed = server.trim().trim_end_matches('/');
    let core = match trimmed.strip_suffix("statistics") {
        Some(base) => format!("{}{}", base, index_name),
        None => trimmed.to_string(),
    };
    Ok(Url::parse(&format!("{}/", core))?)
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    #[serde(default)]
    response: Option<DocList>,
    #[serde(default)]
    facet_counts: Option<FacetCounts>,
}

#[derive(Debug, Deserialize)]
struct DocList {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<StatsRecord>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    #[serde(default)]
    facet_fields: HashMap<String, Vec<serde_json::Value>>,
}

impl SelectResponse {
    fn facet(&self, field: &str) -> Vec<FacetEntry> {
        self.facet_counts
            .as_ref()
            .and_then(|counts| counts.facet_fields.get(field))
            .map(|raw| parse_facet_pairs(raw))
            .unwrap_or_default()
    }

    fn into_docs(self) -> Vec<StatsRecord> {
        self.response.map(|list| list.docs).unwrap_or_default()
    }
}

/// A statistics shard served by Solr.
pub struct SolrIndex {
    client: HttpClient,
    base: Url,
}

impl SolrIndex {
    /// Connect to the shard `index_name` next to the configured statistics core.
    pub fn new(server: &str, index_name: &str) -> Result<Self> {
        Self::with_client(HttpClient::new()?, core_url(server, index_name)?)
    }

    pub fn with_client(client: HttpClient, base: Url) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(MigrateError::Config {
                message: format!("Index URL cannot be a base: {}", base),
            });
        }
        info!("Connecting to {}", base);
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn select(&self, params: Vec<(&str, String)>) -> Result<SelectResponse> {
        let mut params = params;
        params.push(("wt", "json".to_string()));
        self.client.get_json(self.endpoint("select")?, &params).await
    }

    async fn facet(&self, field: &str, query: String, limit: usize) -> Result<Vec<FacetEntry>> {
        let response = self
            .select(vec![
                ("q", query),
                ("rows", "0".to_string()),
                ("facet", "true".to_string()),
                ("facet.field", field.to_string()),
                ("facet.mincount", "1".to_string()),
                ("facet.sort", "count".to_string()),
                ("facet.limit", limit.to_string()),
            ])
            .await?;
        Ok(response.facet(field))
    }
}

#[async_trait]
impl StatisticsIndex for SolrIndex {
    async fn legacy_facets(&self, kind: ObjectKind, limit: usize) -> Result<Vec<FacetCount>> {
        let mut groups = Vec::new();
        for (field, query) in subject_facet_queries(kind) {
            groups.push(self.facet(field, query, limit).await?);
        }
        let merged = merge_facets(&groups, limit);
        debug!("{} distinct legacy {} ids in page", merged.len(), kind);
        Ok(merged)
    }

    async fn records_referencing(
        &self,
        kind: ObjectKind,
        legacy_id: LegacyId,
        rows: usize,
    ) -> Result<Vec<StatsRecord>> {
        let response = self
            .select(vec![
                ("q", referencing_query(kind, legacy_id)),
                ("rows", rows.to_string()),
            ])
            .await?;
        Ok(response.into_docs())
    }

    async fn legacy_records(
        &self,
        after: Option<&str>,
        rows: usize,
    ) -> Result<Vec<StatsRecord>> {
        let mut params = vec![
            ("q", legacy_query()),
            ("rows", rows.to_string()),
            ("sort", SWEEP_SORT.to_string()),
        ];
        if let Some(uid) = after {
            params.push(("fq", uid_after_filter(uid)));
        }
        let response = self.select(params).await?;
        Ok(response.into_docs())
    }

    async fn report_counts(&self) -> Result<ReportCounts> {
        let response = self
            .select(vec![
                ("q", legacy_query()),
                ("rows", "0".to_string()),
                ("facet", "true".to_string()),
                ("facet.field", "type".to_string()),
                ("facet.field", "scopeType".to_string()),
                ("facet.mincount", "1".to_string()),
                ("facet.limit", "-1".to_string()),
            ])
            .await?;
        Ok(ReportCounts {
            num_found: response.response.as_ref().map(|r| r.num_found).unwrap_or(0),
            type_facets: response.facet("type"),
            scope_type_facets: response.facet("scopeType"),
        })
    }

    async fn add(&self, docs: &[StatsRecord]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        self.client
            .post_json(
                self.endpoint("update")?,
                &[("wt", "json".to_string())],
                docs,
            )
            .await
    }

    async fn commit(&self) -> Result<()> {
        self.client
            .post_json(
                self.endpoint("update")?,
                &[("wt", "json".to_string())],
                &serde_json::json!({"commit": {"waitSearcher": true}}),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_core_url_replaces_statistics_suffix() {
        let url = core_url("http://localhost:8080/solr/statistics", "statistics-2016").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/solr/statistics-2016/");

        let url = core_url("http://localhost:8080/solr/statistics/", "statistics").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/solr/statistics/");
    }

    #[test]
    fn test_core_url_without_suffix_is_unchanged() {
        let url = core_url("http://solr.example.org/solr/usage", "statistics-2015").unwrap();
        assert_eq!(url.as_str(), "http://solr.example.org/solr/usage/");
    }

    #[test]
    fn test_core_url_rejects_garbage() {
        assert!(matches!(
            core_url("not a url", "statistics"),
            Err(MigrateError::Config { .. })
        ));
    }

    #[test]
    fn test_endpoints_join_under_core() {
        let index = SolrIndex::new("http://localhost:8080/solr/statistics", "statistics-2014")
            .unwrap();
        assert_eq!(
            index.endpoint("select").unwrap().as_str(),
            "http://localhost:8080/solr/statistics-2014/select"
        );
    }

    #[test]
    fn test_parse_select_response() {
        let response: SelectResponse = serde_json::from_value(json!({
            "responseHeader": {"status": 0, "QTime": 3},
            "response": {
                "numFound": 2,
                "start": 0,
                "docs": [
                    {"uid": "a", "type": 2, "id": "42", "_version_": 1},
                    {"uid": "b", "type": 0, "id": "7", "owningComm": ["1", "2"]}
                ]
            },
            "facet_counts": {
                "facet_fields": {"type": ["2", 10, "0", 3]}
            }
        }))
        .unwrap();

        assert_eq!(response.facet("type").len(), 2);
        assert!(response.facet("scopeType").is_empty());
        let docs = response.into_docs();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].strings("owningComm"), vec!["1", "2"]);
    }
}
