use reqwest::StatusCode;
use thiserror::Error;

/// Failures from one call to an external provider. All variants are
/// transient from the embedding retry loop's point of view.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("provider returned {status}: {details}")]
    Status { status: StatusCode, details: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Terminal embedding failure after the retry budget is spent.
#[derive(Debug, Error)]
#[error("embedding unavailable after {attempts} attempts")]
pub struct EmbeddingUnavailable {
    pub attempts: u32,
    #[source]
    pub last: ProviderError,
}

/// Vectors of different lengths cannot be compared. Never retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("vector dimension mismatch: expected {expected}, got {actual}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Dimension(#[from] DimensionMismatch),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document extraction failed: {0}")]
    Extract(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error(transparent)]
    Embedding(#[from] EmbeddingUnavailable),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Ranking(#[from] DimensionMismatch),

    #[error("generation failed: {0}")]
    Generation(#[from] ProviderError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
