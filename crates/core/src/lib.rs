pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod ranking;
pub mod stores;
pub mod traits;

pub use answer::{assess, build_context, build_prompt, NO_RELEVANT_INFORMATION};
pub use chunking::chunk;
pub use embeddings::{EmbeddingEngine, OllamaEmbedder};
pub use error::{
    DimensionMismatch, EmbeddingUnavailable, IngestError, ProviderError, QueryError, StoreError,
};
pub use extractor::extract_text;
pub use generation::OllamaGenerator;
pub use ingest::{
    discover_document_files, load_document, load_folder_best_effort, FolderIngestion, SkippedFile,
};
pub use models::{
    Chunk, Document, EmbeddingRecord, IngestionReport, PipelineConfig, QueryOutcome,
    RelevanceVerdict, RetryPolicy, ScoredCandidate, StoredCandidate,
};
pub use orchestrator::AnswerCoordinator;
pub use ranking::{cosine_similarity, rank};
pub use stores::{MemoryStore, QdrantStore};
pub use traits::{EmbeddingProvider, GenerationProvider, VectorStore};
