//! # Elasticsearch Adapter
//!
//! `DocumentStore` over the Elasticsearch REST API using a blocking reqwest
//! client. All searches across partitions go through wildcard patterns with
//! `ignore_unavailable` and `allow_no_indices`, so a pattern matching nothing
//! is an empty result rather than an error.

use crate::domain::errors::StoreError;
use crate::domain::gaps::HistogramBucket;
use crate::ports::outbound::{DocumentStore, Field, HistogramQuery, SortOrder, TermKey, TermsQuery};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{ActionRecord, BlockDelta};
use std::time::Duration;
use tracing::{debug, trace};

const SEARCH_FLAGS: &str = "ignore_unavailable=true&allow_no_indices=true";

/// Index names per `DELETE` request.
const DELETE_CHUNK: usize = 32;

/// Connection settings for the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticConfig {
    /// Base URL, e.g. `http://127.0.0.1:9200`.
    pub url: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub timeout: Duration,
}

impl ElasticConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            pass: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }
}

/// Blocking Elasticsearch client.
pub struct ElasticStore {
    client: Client,
    config: ElasticConfig,
}

impl ElasticStore {
    pub fn new(config: ElasticConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StoreError::Unavailable {
                reason: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.user {
            Some(user) => builder.basic_auth(user, self.config.pass.as_deref()),
            None => builder,
        }
    }

    /// Send a request and decode the JSON response.
    ///
    /// `target` names the index or pattern for `IndexNotFound`.
    fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, target: &str) -> Result<T, StoreError> {
        let response = self.authed(builder).send().map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::IndexNotFound {
                index: target.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Unavailable {
                reason: format!("{status}: {body}"),
            });
        }

        response.json().map_err(|e| StoreError::Malformed {
            reason: e.to_string(),
        })
    }

    fn search(&self, target: &str, flags: bool, body: Value) -> Result<SearchResponse, StoreError> {
        let path = if flags {
            format!("{target}/_search?{SEARCH_FLAGS}")
        } else {
            format!("{target}/_search")
        };
        trace!(%target, %body, "search");
        self.send(self.client.post(self.url(&path)).json(&body), target)
    }
}

fn range(field: Field, lower: u64, upper: u64) -> Value {
    let path = field.path();
    json!({ "range": { path: { "gte": lower, "lte": upper } } })
}

fn first_source<T: DeserializeOwned>(response: SearchResponse) -> Result<Option<T>, StoreError> {
    response
        .hits
        .hits
        .into_iter()
        .next()
        .map(|hit| {
            serde_json::from_value(hit.source).map_err(|e| StoreError::Malformed {
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl DocumentStore for ElasticStore {
    fn list_indices(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let path = format!("_cat/indices/{pattern}?format=json&h=index");
        let rows: Vec<CatIndex> = self.send(self.client.get(self.url(&path)), pattern)?;
        Ok(rows.into_iter().map(|row| row.index).collect())
    }

    fn extreme_delta(&self, index: &str, order: SortOrder) -> Result<Option<BlockDelta>, StoreError> {
        let order = match order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        let global = Field::DeltaGlobalBlock.path();
        let body = json!({
            "size": 1,
            "query": { "match_all": {} },
            "sort": [{ global: { "order": order } }]
        });
        first_source(self.search(index, false, body)?)
    }

    fn delta_by_global(&self, pattern: &str, block: u64) -> Result<Option<BlockDelta>, StoreError> {
        let global = Field::DeltaGlobalBlock.path();
        let body = json!({
            "size": 1,
            "query": { "term": { global: block } }
        });
        first_source(self.search(pattern, true, body)?)
    }

    fn earliest_action_by_hash(&self, pattern: &str, hash: &str) -> Result<Option<ActionRecord>, StoreError> {
        let (hash_field, block_field) = (Field::ActionHash.path(), Field::ActionEvmBlock.path());
        let body = json!({
            "size": 1,
            "query": { "term": { hash_field: hash } },
            "sort": [{ block_field: { "order": "asc" } }]
        });
        first_source(self.search(pattern, true, body)?)
    }

    fn duplicate_terms(&self, query: &TermsQuery) -> Result<Vec<TermKey>, StoreError> {
        let body = json!({
            "size": 0,
            "query": range(query.range_field, query.lower, query.upper),
            "aggs": {
                "duplicates": {
                    "terms": {
                        "field": query.key_field.path(),
                        "min_doc_count": query.min_doc_count,
                        "size": query.size
                    }
                }
            }
        });
        let response = self.search(&query.pattern, true, body)?;
        let buckets = response
            .aggregations
            .and_then(|aggs| aggs.duplicates)
            .map(|agg| agg.buckets)
            .unwrap_or_default();
        debug!(pattern = %query.pattern, lower = query.lower, upper = query.upper, found = buckets.len(), "terms scan");
        Ok(buckets.into_iter().map(|bucket| bucket.key.into()).collect())
    }

    fn histogram(&self, query: &HistogramQuery) -> Result<Vec<HistogramBucket>, StoreError> {
        let field = query.field.path();
        let body = json!({
            "size": 0,
            "query": range(query.field, query.lower, query.upper),
            "aggs": {
                "block_histogram": {
                    "histogram": {
                        "field": field,
                        "interval": query.interval.max(1),
                        "min_doc_count": 1
                    },
                    "aggs": {
                        "min_block": { "min": { "field": field } },
                        "max_block": { "max": { "field": field } }
                    }
                }
            }
        });
        let response = self.search(&query.pattern, true, body)?;
        let buckets = response
            .aggregations
            .and_then(|aggs| aggs.block_histogram)
            .map(|agg| agg.buckets)
            .unwrap_or_default();

        buckets
            .into_iter()
            .filter(|bucket| bucket.doc_count > 0)
            .map(|bucket| {
                let (Some(min), Some(max)) = (bucket.min_block.value, bucket.max_block.value) else {
                    return Err(StoreError::Malformed {
                        reason: format!("histogram bucket {} without min/max", bucket.key),
                    });
                };
                Ok(HistogramBucket {
                    key: bucket.key as u64,
                    count: bucket.doc_count,
                    min: min as u64,
                    max: max as u64,
                })
            })
            .collect()
    }

    fn delete_by_range(&mut self, pattern: &str, field: Field, gte: u64) -> Result<u64, StoreError> {
        let path = format!("{pattern}/_delete_by_query?{SEARCH_FLAGS}&refresh=true&conflicts=proceed");
        let path_field = field.path();
        let body = json!({ "query": { "range": { path_field: { "gte": gte } } } });
        let response: DeleteByQueryResponse = self.send(self.client.post(self.url(&path)).json(&body), pattern)?;
        debug!(%pattern, %field, gte, deleted = response.deleted, "delete by query");
        Ok(response.deleted)
    }

    fn delete_indices(&mut self, names: &[String]) -> Result<(), StoreError> {
        for chunk in names.chunks(DELETE_CHUNK) {
            let target = chunk.join(",");
            let path = format!("{target}?ignore_unavailable=true");
            let _: Value = self.send(self.client.delete(self.url(&path)), &target)?;
            debug!(indices = %target, "deleted indices");
        }
        Ok(())
    }
}

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Hits,
    aggregations: Option<Aggregations>,
}

#[derive(Debug, Default, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Value,
}

#[derive(Debug, Deserialize)]
struct Aggregations {
    duplicates: Option<Buckets<TermsBucket>>,
    block_histogram: Option<Buckets<HistogramAggBucket>>,
}

#[derive(Debug, Deserialize)]
struct Buckets<B> {
    buckets: Vec<B>,
}

#[derive(Debug, Deserialize)]
struct TermsBucket {
    key: RawTermKey,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTermKey {
    Number(u64),
    Text(String),
}

impl From<RawTermKey> for TermKey {
    fn from(key: RawTermKey) -> Self {
        match key {
            RawTermKey::Number(n) => TermKey::Number(n),
            RawTermKey::Text(s) => TermKey::Text(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistogramAggBucket {
    key: f64,
    doc_count: u64,
    min_block: MetricValue,
    max_block: MetricValue,
}

#[derive(Debug, Deserialize)]
struct MetricValue {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_response_decodes() {
        let raw = json!({
            "hits": { "hits": [] },
            "aggregations": {
                "block_histogram": {
                    "buckets": [
                        { "key": 100.0, "doc_count": 50, "min_block": { "value": 100.0 }, "max_block": { "value": 149.0 } },
                        { "key": 150.0, "doc_count": 0, "min_block": { "value": null }, "max_block": { "value": null } }
                    ]
                }
            }
        });
        let response: SearchResponse = serde_json::from_value(raw).unwrap();
        let buckets = response.aggregations.unwrap().block_histogram.unwrap().buckets;
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].max_block.value, Some(149.0));
        assert_eq!(buckets[1].min_block.value, None);
    }

    #[test]
    fn test_terms_keys_decode_numbers_and_hashes() {
        let raw = json!({
            "aggregations": {
                "duplicates": { "buckets": [ { "key": 150, "doc_count": 2 }, { "key": "0xab", "doc_count": 3 } ] }
            }
        });
        let response: SearchResponse = serde_json::from_value(raw).unwrap();
        let keys: Vec<TermKey> = response
            .aggregations
            .unwrap()
            .duplicates
            .unwrap()
            .buckets
            .into_iter()
            .map(|b| b.key.into())
            .collect();
        assert_eq!(keys, vec![TermKey::Number(150), TermKey::Text("0xab".into())]);
    }

    #[test]
    fn test_first_source_decodes_delta() {
        let raw = json!({
            "hits": { "hits": [ { "_source": { "block_num": 131, "@global": { "block_num": 121 } } } ] }
        });
        let response: SearchResponse = serde_json::from_value(raw).unwrap();
        let delta: Option<BlockDelta> = first_source(response).unwrap();
        assert_eq!(delta, Some(BlockDelta::new(131, 121)));
    }

    #[test]
    fn test_range_clause_uses_field_path() {
        let clause = range(Field::ActionEvmBlock, 10, 20);
        assert_eq!(clause["range"]["@raw.block"]["gte"], 10);
        assert_eq!(clause["range"]["@raw.block"]["lte"], 20);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let store = ElasticStore::new(ElasticConfig::new("http://localhost:9200/")).unwrap();
        assert_eq!(store.url("_cat/indices"), "http://localhost:9200/_cat/indices");
    }
}
