use crate::error::IngestError;
use crate::extractor::extract_text;
use crate::models::Document;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Recursively lists ingestible files under `folder`, sorted for
/// reproducible ingestion order.
pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Reads one file into a `Document` ready for the pipeline.
pub fn load_document(path: &Path) -> Result<Document, IngestError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

    let checksum = digest_file(path)?;
    let text = extract_text(path)?;
    debug!(source = name, %checksum, "document loaded");

    Ok(Document {
        document_id: Uuid::new_v4().to_string(),
        source: name.to_string(),
        text,
    })
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct FolderIngestion {
    pub documents: Vec<Document>,
    pub skipped_files: Vec<SkippedFile>,
}

/// Loads every ingestible file under `folder`, skipping unreadable ones
/// with a reason instead of aborting the whole batch.
pub fn load_folder_best_effort(folder: &Path) -> Result<FolderIngestion, IngestError> {
    let files = discover_document_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no ingestible files found in {}",
            folder.display()
        )));
    }

    let mut documents = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        match load_document(&path) {
            Ok(document) => documents.push(document),
            Err(error) => skipped_files.push(SkippedFile {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(FolderIngestion {
        documents,
        skipped_files,
    })
}
