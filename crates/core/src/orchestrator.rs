use crate::answer::{assess, build_context, build_prompt};
use crate::chunking::chunk;
use crate::embeddings::EmbeddingEngine;
use crate::error::{IngestError, QueryError};
use crate::models::{
    Document, EmbeddingRecord, IngestionReport, PipelineConfig, QueryOutcome, RetryPolicy,
};
use crate::ranking::rank;
use crate::traits::{EmbeddingProvider, GenerationProvider, VectorStore};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Ties the pipeline together: chunking, retry-wrapped embedding, vector
/// persistence, ranking, the relevance gate, and answer generation.
pub struct AnswerCoordinator<P, S, G>
where
    P: EmbeddingProvider,
    S: VectorStore,
    G: GenerationProvider,
{
    embedder: Arc<EmbeddingEngine<P>>,
    store: S,
    generator: G,
    config: PipelineConfig,
}

impl<P, S, G> AnswerCoordinator<P, S, G>
where
    P: EmbeddingProvider + Send + Sync + 'static,
    S: VectorStore + Send + Sync,
    G: GenerationProvider + Send + Sync,
{
    pub fn new(provider: P, store: S, generator: G, config: PipelineConfig, retry: RetryPolicy) -> Self {
        Self {
            embedder: Arc::new(EmbeddingEngine::new(provider, retry)),
            store,
            generator,
            config,
        }
    }

    /// Chunks one document, embeds all chunks concurrently, and persists
    /// the successful ones as a single bulk insert. A chunk whose embedding
    /// retries are exhausted is dropped; the report's count mismatch is the
    /// only trace it leaves.
    pub async fn ingest(&self, document: &Document) -> Result<IngestionReport, IngestError> {
        let chunks = chunk(&document.text, self.config.chunk_max_chars);
        let chunks_processed = chunks.len();

        if chunks.is_empty() {
            info!(document_id = %document.document_id, "document produced no chunks");
            return Ok(IngestionReport {
                chunks_processed: 0,
                embeddings_stored: 0,
            });
        }

        let mut tasks = JoinSet::new();
        for piece in chunks {
            let engine = Arc::clone(&self.embedder);
            tasks.spawn(async move {
                let embedded = engine.embed(&piece.text).await;
                (piece.index, piece.text, embedded)
            });
        }

        let mut embedded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, text, Ok(vector))) => embedded.push((index, text, vector)),
                Ok((index, _, Err(error))) => {
                    warn!(chunk_index = index, %error, "chunk dropped after embedding retries");
                }
                Err(join_error) => {
                    warn!(%join_error, "embedding task did not complete");
                }
            }
        }

        embedded.sort_by_key(|(index, _, _)| *index);

        let records: Vec<EmbeddingRecord> = embedded
            .into_iter()
            .map(|(index, text, vector)| EmbeddingRecord {
                chunk_id: chunk_fingerprint(&document.document_id, index, &text),
                document_id: document.document_id.clone(),
                segment_text: text,
                vector,
                created_at: Utc::now(),
            })
            .collect();

        let embeddings_stored = if records.is_empty() {
            0
        } else {
            self.store.insert_many(&records).await?
        };

        if embeddings_stored < chunks_processed {
            warn!(
                document_id = %document.document_id,
                chunks_processed,
                embeddings_stored,
                "partial ingestion"
            );
        }
        info!(
            document_id = %document.document_id,
            chunks_processed,
            embeddings_stored,
            "document ingested"
        );

        Ok(IngestionReport {
            chunks_processed,
            embeddings_stored,
        })
    }

    /// Answers a question from the ingested evidence, or reports that the
    /// evidence is too weak to ground an answer. Generation is only invoked
    /// for grounded verdicts.
    pub async fn answer(
        &self,
        question: &str,
        filter_directive: Option<&str>,
    ) -> Result<QueryOutcome, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let query_vector = self.embedder.embed(question).await?;
        let candidates = self
            .store
            .candidates(&query_vector, self.config.candidate_limit())
            .await?;
        let ranked = rank(
            &query_vector,
            &candidates,
            self.config.similarity_threshold,
            self.config.top_k,
        )?;
        let verdict = assess(
            &ranked,
            self.config.similarity_threshold,
            self.config.relevance_margin,
        );

        if !verdict.grounded {
            info!(
                reason = %verdict.reason,
                relevant_chunks = ranked.len(),
                "relevance gate rejected the evidence"
            );
            return Ok(QueryOutcome::NotGrounded {
                reason: verdict.reason,
                relevant_chunks: ranked.len(),
                average_similarity: verdict.mean_similarity,
            });
        }

        let context = build_context(&ranked);
        let prompt = build_prompt(&context, question, filter_directive);
        let answer = self.generator.generate(&prompt).await?;

        Ok(QueryOutcome::Answer {
            answer,
            relevant_chunks: ranked.len(),
            average_similarity: verdict.mean_similarity.unwrap_or_default(),
        })
    }
}

fn chunk_fingerprint(document_id: &str, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::NO_RELEVANT_INFORMATION;
    use crate::error::ProviderError;
    use crate::stores::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Maps text onto a two-axis vector: hydraulics on x, electrics on y.
    struct AxisProvider;

    #[async_trait]
    impl EmbeddingProvider for AxisProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            let lowered = text.to_lowercase();
            let mut vector = vec![0.0f32, 0.0];
            if lowered.contains("hydraulic") {
                vector[0] = 1.0;
            }
            if lowered.contains("electrical") {
                vector[1] = 1.0;
            }
            Ok(vector)
        }
    }

    /// Fails any text containing the poison marker, succeeds otherwise.
    struct PoisonedProvider;

    #[async_trait]
    impl EmbeddingProvider for PoisonedProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            if text.contains("poison") {
                Err(ProviderError::MalformedResponse("poisoned".to_string()))
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        called: AtomicBool,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerationProvider for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.called.store(true, Ordering::SeqCst);
            self.prompts
                .lock()
                .expect("prompt lock")
                .push(prompt.to_string());
            Ok("generated answer".to_string())
        }
    }

    fn coordinator<P: EmbeddingProvider + Send + Sync + 'static>(
        provider: P,
        config: PipelineConfig,
    ) -> AnswerCoordinator<P, MemoryStore, RecordingGenerator> {
        AnswerCoordinator::new(
            provider,
            MemoryStore::new(),
            RecordingGenerator::default(),
            config,
            RetryPolicy {
                max_attempts: 1,
                base_delay: std::time::Duration::ZERO,
            },
        )
    }

    fn document(text: &str) -> Document {
        Document {
            document_id: "doc-1".to_string(),
            source: "manual.txt".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn small_document_yields_one_chunk_and_one_record() {
        let pipeline = coordinator(AxisProvider, PipelineConfig::default());
        let report = pipeline
            .ingest(&document(
                "The hydraulic pump ran. The pressure held. The seal stayed dry.",
            ))
            .await
            .expect("ingest should succeed");

        assert_eq!(report.chunks_processed, 1);
        assert_eq!(report.embeddings_stored, 1);
        assert_eq!(pipeline.store.len().await, 1);
    }

    #[tokio::test]
    async fn empty_document_is_a_zero_report_not_an_error() {
        let pipeline = coordinator(AxisProvider, PipelineConfig::default());
        let report = pipeline
            .ingest(&document("   \n  "))
            .await
            .expect("ingest should succeed");

        assert_eq!(report.chunks_processed, 0);
        assert_eq!(report.embeddings_stored, 0);
    }

    #[tokio::test]
    async fn failed_chunk_is_dropped_without_aborting_the_document() {
        let config = PipelineConfig {
            chunk_max_chars: 40,
            ..PipelineConfig::default()
        };
        let pipeline = coordinator(PoisonedProvider, config);
        let report = pipeline
            .ingest(&document(
                "The first sentence is perfectly fine here. The second sentence carries poison throughout.",
            ))
            .await
            .expect("ingest should succeed");

        assert_eq!(report.chunks_processed, 2);
        assert_eq!(report.embeddings_stored, 1);
    }

    #[tokio::test]
    async fn grounded_question_gets_a_generated_answer() {
        let pipeline = coordinator(AxisProvider, PipelineConfig::default());
        pipeline
            .ingest(&document("The hydraulic system uses a gear pump."))
            .await
            .expect("ingest should succeed");

        let outcome = pipeline
            .answer("How does the hydraulic system work?", None)
            .await
            .expect("answer should succeed");

        match outcome {
            QueryOutcome::Answer {
                answer,
                relevant_chunks,
                average_similarity,
            } => {
                assert_eq!(answer, "generated answer");
                assert_eq!(relevant_chunks, 1);
                assert!((average_similarity - 1.0).abs() < 1e-6);
            }
            other => panic!("expected an answer, got {other:?}"),
        }

        let prompts = pipeline.generator.prompts.lock().expect("prompt lock");
        assert!(prompts[0].contains("The hydraulic system uses a gear pump."));
    }

    #[tokio::test]
    async fn unrelated_question_is_not_grounded_and_skips_generation() {
        let pipeline = coordinator(AxisProvider, PipelineConfig::default());
        pipeline
            .ingest(&document("The hydraulic system uses a gear pump."))
            .await
            .expect("ingest should succeed");

        let outcome = pipeline
            .answer("Tell me about the electrical cabinet.", None)
            .await
            .expect("answer should succeed");

        match outcome {
            QueryOutcome::NotGrounded { reason, relevant_chunks, .. } => {
                assert_eq!(reason, NO_RELEVANT_INFORMATION);
                assert_eq!(relevant_chunks, 0);
            }
            other => panic!("expected a not-grounded outcome, got {other:?}"),
        }
        assert!(!pipeline.generator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn blank_question_is_a_client_error() {
        let pipeline = coordinator(AxisProvider, PipelineConfig::default());
        let error = pipeline
            .answer("  ", None)
            .await
            .expect_err("blank question should be rejected");

        assert!(matches!(error, QueryError::EmptyQuestion));
    }

    #[tokio::test]
    async fn filter_directive_reaches_the_prompt() {
        let pipeline = coordinator(AxisProvider, PipelineConfig::default());
        pipeline
            .ingest(&document("The hydraulic system uses a gear pump."))
            .await
            .expect("ingest should succeed");

        pipeline
            .answer(
                "How does the hydraulic pump behave?",
                Some("Answer as a failure analyst."),
            )
            .await
            .expect("answer should succeed");

        let prompts = pipeline.generator.prompts.lock().expect("prompt lock");
        assert!(prompts[0].starts_with("Answer as a failure analyst."));
    }

    #[test]
    fn chunk_fingerprint_is_stable_and_content_sensitive() {
        let first = chunk_fingerprint("doc-1", 0, "text");
        let second = chunk_fingerprint("doc-1", 0, "text");
        let different = chunk_fingerprint("doc-1", 1, "text");

        assert_eq!(first, second);
        assert_ne!(first, different);
    }
}
