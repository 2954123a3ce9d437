use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw text of one document, produced by the extraction step. Transient:
/// only its chunks are persisted.
#[derive(Debug, Clone)]
pub struct Document {
    pub document_id: String,
    pub source: String,
    pub text: String,
}

/// Contiguous piece of a document's text, bounded by the configured maximum
/// except when a single sentence alone exceeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// Persisted chunk-plus-vector tuple. All vectors in one store share the
/// same dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_id: String,
    pub document_id: String,
    pub segment_text: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Candidate returned by a vector store before local scoring. `similarity`
/// is only present when the backend computed its own metric.
#[derive(Debug, Clone)]
pub struct StoredCandidate {
    pub segment_text: String,
    pub vector: Vec<f32>,
    pub similarity: Option<f64>,
}

/// Ranked retrieval hit, ordered descending by similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub segment_text: String,
    pub similarity: f64,
}

/// Decision on whether the retrieved evidence can ground an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceVerdict {
    pub grounded: bool,
    pub reason: String,
    pub mean_similarity: Option<f64>,
}

/// Ingestion boundary result. `embeddings_stored < chunks_processed` means
/// some chunks were dropped after exhausting embedding retries.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestionReport {
    pub chunks_processed: usize,
    pub embeddings_stored: usize,
}

/// Query boundary result. `NotGrounded` is a valid user-facing outcome,
/// not a failure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum QueryOutcome {
    Answer {
        answer: String,
        relevant_chunks: usize,
        average_similarity: f64,
    },
    NotGrounded {
        reason: String,
        relevant_chunks: usize,
        average_similarity: Option<f64>,
    },
}

/// Tunables for the retrieval pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub chunk_max_chars: usize,
    pub similarity_threshold: f64,
    pub relevance_margin: f64,
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_max_chars: 200,
            similarity_threshold: 0.5,
            relevance_margin: 0.1,
            top_k: 5,
        }
    }
}

impl PipelineConfig {
    /// Candidate fetch size, generously above `top_k` to leave headroom for
    /// threshold filtering.
    pub fn candidate_limit(&self) -> usize {
        self.top_k.saturating_mul(5).max(100)
    }
}

/// Bounded retry with linearly increasing backoff for embedding calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}
