use crate::error::{ProviderError, StoreError};
use crate::models::{EmbeddingRecord, StoredCandidate};
use async_trait::async_trait;

/// Text in, fixed-dimensionality vector out. A call that ran but returned
/// nothing usable must fail, not hand back an empty vector.
#[async_trait]
pub trait EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Persistence boundary for embedding records. Implementations may satisfy
/// `candidates` with an exact scan or by delegating nearest-neighbor search
/// to the backend; callers must not be able to tell the difference.
#[async_trait]
pub trait VectorStore {
    async fn insert_many(&self, records: &[EmbeddingRecord]) -> Result<usize, StoreError>;

    /// Returns up to `limit` candidates whose vectors match the query
    /// vector's dimensionality. Malformed records are skipped, never
    /// surfaced as errors.
    async fn candidates(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<StoredCandidate>, StoreError>;
}

/// Composed prompt in, free-text answer out.
#[async_trait]
pub trait GenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}
