//! Nutrition index backed by an OpenSearch domain
//!
//! Queries mirror the in-memory index: a `term` query on the keyword field,
//! a `knn` query on the embedding, and a `match` query with AUTO fuzziness.

use super::index::{NutritionIndex, VectorHit};
use super::types::NutritionRecord;
use crate::abstractions::{FetchRequest, HttpFetcher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use url::form_urlencoded;

pub struct OpenSearchIndex {
    fetcher: Arc<dyn HttpFetcher>,
    endpoint: String,
    index_name: String,
}

impl OpenSearchIndex {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, endpoint: &str, index_name: &str) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index_name: index_name.to_string(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.endpoint, self.index_name)
    }

    fn document_url(&self, id: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
        format!("{}/{}/_doc/{}", self.endpoint, self.index_name, encoded)
    }

    /// Run a search and return the first hit's source and score
    async fn first_hit(&self, query: Value) -> Result<Option<(NutritionRecord, f32)>> {
        let response = self
            .fetcher
            .send(FetchRequest::post(self.search_url(), query))
            .await?;
        let Some(hit) = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .and_then(|hits| hits.first())
        else {
            return Ok(None);
        };
        let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
        let source = hit.get("_source").cloned().unwrap_or(Value::Null);
        let record: NutritionRecord =
            serde_json::from_value(source).context("Unexpected nutrition document shape")?;
        Ok(Some((record, score)))
    }
}

#[async_trait]
impl NutritionIndex for OpenSearchIndex {
    async fn find_exact(&self, name: &str) -> Result<Option<NutritionRecord>> {
        let query = json!({"query": {"term": {"ingredient_name_keyword": name.trim()}}});
        Ok(self.first_hit(query).await?.map(|(record, _)| record))
    }

    async fn find_nearest(&self, vector: &[f32]) -> Result<Option<VectorHit>> {
        let query = json!({"query": {"knn": {"embedding": {"vector": vector, "k": 1}}}});
        Ok(self
            .first_hit(query)
            .await?
            .map(|(record, score)| VectorHit { record, score }))
    }

    async fn find_fuzzy(&self, name: &str) -> Result<Option<NutritionRecord>> {
        let query = json!({
            "query": {"match": {"ingredient_name": {"query": name.trim(), "fuzziness": "AUTO"}}}
        });
        Ok(self.first_hit(query).await?.map(|(record, _)| record))
    }

    async fn index_batch(&self, records: Vec<NutritionRecord>) -> Result<usize> {
        let mut written = 0;
        for record in records {
            let id = record.document_id();
            let body = serde_json::to_value(&record)?;
            self.fetcher
                .send(FetchRequest::put(self.document_url(&id), body))
                .await
                .with_context(|| format!("Failed to index {id}"))?;
            written += 1;
        }
        debug!("Indexed {} documents into {}", written, self.index_name);
        Ok(written)
    }
}
