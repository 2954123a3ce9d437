use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_qa_core::{
    load_document, load_folder_best_effort, AnswerCoordinator, OllamaEmbedder, OllamaGenerator,
    PipelineConfig, QdrantStore, QueryOutcome, RetryPolicy,
};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Ollama base URL used for both embeddings and generation
    #[arg(long, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model served by Ollama
    #[arg(long, default_value = "mxbai-embed-large")]
    embedding_model: String,

    /// Generation model served by Ollama
    #[arg(long, default_value = "llama3.1")]
    generation_model: String,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "document_embeddings")]
    qdrant_collection: String,

    /// Vector dimensionality of the embedding model
    #[arg(long, default_value = "1024")]
    vector_size: usize,

    /// Maximum characters per chunk
    #[arg(long, default_value = "200")]
    chunk_max_chars: usize,

    /// Minimum similarity for a candidate to count as evidence
    #[arg(long, default_value = "0.5")]
    similarity_threshold: f64,

    /// Extra margin the mean similarity must clear before generation runs
    #[arg(long, default_value = "0.1")]
    relevance_margin: f64,

    /// Number of evidence chunks handed to generation
    #[arg(long, default_value = "5")]
    top_k: usize,

    /// Seconds before an external call is treated as failed
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document file, or a folder of documents, into the vector store.
    Ingest {
        /// A .pdf/.txt/.md file, or a folder searched recursively.
        #[arg(long)]
        path: String,
    },
    /// Ask a question grounded in the ingested documents.
    Ask {
        /// Question text
        #[arg(long)]
        question: String,
        /// Directive prepended to the generation instructions, e.g. a domain framing.
        #[arg(long)]
        filter: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout_secs);

    let embedder = OllamaEmbedder::new(&cli.ollama_url, &cli.embedding_model, timeout)
        .context("embedding client setup failed")?;
    let generator = OllamaGenerator::new(&cli.ollama_url, &cli.generation_model, timeout)
        .context("generation client setup failed")?;
    let store = QdrantStore::new(&cli.qdrant_url, &cli.qdrant_collection, cli.vector_size, timeout)
        .context("vector store setup failed")?;
    store
        .ensure_collection()
        .await
        .context("vector store collection setup failed")?;

    let config = PipelineConfig {
        chunk_max_chars: cli.chunk_max_chars,
        similarity_threshold: cli.similarity_threshold,
        relevance_margin: cli.relevance_margin,
        top_k: cli.top_k,
    };
    let coordinator =
        AnswerCoordinator::new(embedder, store, generator, config, RetryPolicy::default());

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-qa boot"
    );

    match cli.command {
        Command::Ingest { path } => {
            let path = Path::new(&path);
            let documents = if path.is_dir() {
                let batch = load_folder_best_effort(path)
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                for skipped in &batch.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                }
                batch.documents
            } else {
                vec![load_document(path).map_err(|error| anyhow::anyhow!(error.to_string()))?]
            };

            let mut chunks_processed = 0;
            let mut embeddings_stored = 0;
            for document in &documents {
                let report = coordinator
                    .ingest(document)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                chunks_processed += report.chunks_processed;
                embeddings_stored += report.embeddings_stored;
            }

            println!(
                "{} document(s): {} chunk(s) processed, {} embedding(s) stored at {}",
                documents.len(),
                chunks_processed,
                embeddings_stored,
                Utc::now().to_rfc3339()
            );
            if embeddings_stored < chunks_processed {
                println!(
                    "warning: {} chunk(s) were dropped after embedding retries",
                    chunks_processed - embeddings_stored
                );
            }
        }
        Command::Ask { question, filter } => {
            let outcome = coordinator
                .answer(&question, filter.as_deref())
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            match outcome {
                QueryOutcome::Answer {
                    answer,
                    relevant_chunks,
                    average_similarity,
                } => {
                    println!("{answer}");
                    println!();
                    println!(
                        "evidence: {relevant_chunks} chunk(s), mean similarity {average_similarity:.3}"
                    );
                }
                QueryOutcome::NotGrounded {
                    reason,
                    relevant_chunks,
                    average_similarity,
                } => {
                    println!("I don't have information about this.");
                    match average_similarity {
                        Some(mean) => println!(
                            "({reason}; {relevant_chunks} candidate(s), mean similarity {mean:.3})"
                        ),
                        None => println!("({reason})"),
                    }
                }
            }
        }
    }

    Ok(())
}
