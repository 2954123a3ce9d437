use crate::error::{DimensionMismatch, StoreError};
use crate::models::{EmbeddingRecord, StoredCandidate};
use crate::traits::VectorStore;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;
use url::Url;
use uuid::Uuid;

/// Vector store backed by Qdrant's HTTP API. Nearest-neighbor search is
/// delegated to the backend; returned vectors are still re-checked against
/// the query dimensionality before they reach the ranker.
pub struct QdrantStore {
    client: Client,
    endpoint: Url,
    collection: String,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: Url::parse(endpoint)?,
            collection: collection.into(),
            vector_size,
        })
    }

    fn collection_url(&self, suffix: &str) -> Result<Url, StoreError> {
        let path = format!("collections/{}{suffix}", self.collection);
        Ok(self.endpoint.join(&path)?)
    }

    /// Creates the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.collection_url("")?).send().await?;
        if response.status().is_success() {
            return Ok(());
        }

        if !response.status().is_client_error() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(self.collection_url("")?)
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: format!("collection setup failed with {}", response.status()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn insert_many(&self, records: &[EmbeddingRecord]) -> Result<usize, StoreError> {
        let mut points = Vec::new();
        for record in records {
            if record.vector.len() != self.vector_size {
                warn!(
                    chunk_id = %record.chunk_id,
                    dimensions = record.vector.len(),
                    expected = self.vector_size,
                    "skipping record with unusable vector"
                );
                continue;
            }

            points.push(json!({
                "id": Uuid::new_v4().to_string(),
                "vector": record.vector,
                "payload": {
                    "chunk_id": record.chunk_id,
                    "document_id": record.document_id,
                    "segment_text": record.segment_text,
                    "created_at": record.created_at,
                },
            }));
        }

        if points.is_empty() {
            return Ok(0);
        }

        let stored = points.len();
        let mut url = self.collection_url("/points")?;
        url.set_query(Some("wait=true"));

        let response = self
            .client
            .put(url)
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(stored)
    }

    async fn candidates(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<StoredCandidate>, StoreError> {
        if query_vector.len() != self.vector_size {
            return Err(StoreError::Dimension(DimensionMismatch {
                expected: self.vector_size,
                actual: query_vector.len(),
            }));
        }

        let response = self
            .client
            .post(self.collection_url("/points/search")?)
            .json(&json!({
                "vector": query_vector,
                "limit": limit,
                "with_payload": true,
                "with_vector": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut found = Vec::new();
        for hit in hits {
            let segment_text = hit
                .pointer("/payload/segment_text")
                .and_then(Value::as_str)
                .map(str::to_string);

            let vector = hit
                .pointer("/vector")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_f64)
                        .map(|value| value as f32)
                        .collect::<Vec<f32>>()
                });

            let similarity = hit.pointer("/score").and_then(Value::as_f64);

            match (segment_text, vector) {
                (Some(segment_text), Some(vector)) if vector.len() == query_vector.len() => {
                    found.push(StoredCandidate {
                        segment_text,
                        vector,
                        similarity,
                    });
                }
                _ => {
                    warn!(backend = "qdrant", "skipping malformed search hit");
                }
            }
        }

        Ok(found)
    }
}
