use crate::error::StoreError;
use crate::models::{EmbeddingRecord, StoredCandidate};
use crate::traits::VectorStore;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

/// Exact-scan store backed by process memory. Candidates are returned
/// unscored; the ranker computes similarity locally. Supports concurrent
/// readers and a single writer without application-level locking.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn insert_many(&self, records: &[EmbeddingRecord]) -> Result<usize, StoreError> {
        let mut guard = self.records.write().await;
        guard.extend_from_slice(records);
        Ok(records.len())
    }

    async fn candidates(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<StoredCandidate>, StoreError> {
        let guard = self.records.read().await;
        let mut found = Vec::new();

        for record in guard.iter() {
            if record.vector.is_empty() || record.vector.len() != query_vector.len() {
                warn!(
                    chunk_id = %record.chunk_id,
                    dimensions = record.vector.len(),
                    "skipping record with unusable vector"
                );
                continue;
            }

            found.push(StoredCandidate {
                segment_text: record.segment_text.clone(),
                vector: record.vector.clone(),
                similarity: None,
            });

            if found.len() == limit {
                break;
            }
        }

        Ok(found)
    }
}
