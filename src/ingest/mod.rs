//! Document ingestion: PDF pages -> token windows -> embeddings -> vector index.

mod chunker;
mod pdf;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use chunker::TokenChunker;
pub use pdf::{number_pages, read_pdf_pages, PdfError};

use crate::core::config::IngestConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::{RagStore, StoredChunk};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based
    pub page: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub source: String,
    pub page: u32,
    pub chunk_index: usize,
    pub text: String,
}

impl From<ChunkRecord> for StoredChunk {
    fn from(record: ChunkRecord) -> Self {
        StoredChunk {
            chunk_id: record.chunk_id,
            content: record.text,
            source: record.source,
            page: Some(record.page),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
    /// Files that could not be read.
    pub skipped: Vec<String>,
}

/// Replaces NUL bytes, collapses whitespace runs to one space and trims.
pub fn clean_text(text: &str) -> String {
    text.replace('\0', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic id for the `index`-th chunk of `page` in `source`.
pub fn chunk_id(source: &str, page: u32, index: usize) -> String {
    let digest = Sha256::digest(format!("{}-{}-{}", source, page, index).as_bytes());
    hex::encode(digest)
}

pub fn build_chunks(source: &str, pages: &[PageText], chunker: &TokenChunker) -> Vec<ChunkRecord> {
    let mut records = Vec::new();
    for page in pages {
        for (index, chunk) in chunker.split(&page.text).into_iter().enumerate() {
            let text = clean_text(&chunk);
            if text.is_empty() {
                continue;
            }
            records.push(ChunkRecord {
                chunk_id: chunk_id(source, page.page, index),
                source: source.to_string(),
                page: page.page,
                chunk_index: index,
                text,
            });
        }
    }
    records
}

pub struct Ingestor {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RagStore>,
    chunker: TokenChunker,
    docs_dir: PathBuf,
    embedding_model: String,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RagStore>,
        docs_dir: PathBuf,
        embedding_model: impl Into<String>,
        config: &IngestConfig,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            provider,
            store,
            chunker: TokenChunker::new(config.max_tokens, config.overlap)?,
            docs_dir,
            embedding_model: embedding_model.into(),
            batch_size: config.batch_size.max(1),
        })
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Ingests every `*.pdf` in the documents directory.
    pub async fn run(&self) -> Result<IngestReport, ApiError> {
        std::fs::create_dir_all(&self.docs_dir).map_err(ApiError::internal)?;

        let pdf_files = list_pdf_files(&self.docs_dir)?;
        if pdf_files.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "No PDF files found in {}",
                self.docs_dir.display()
            )));
        }

        self.ensure_embedding_model().await?;

        let mut report = IngestReport {
            files: pdf_files.len(),
            ..IngestReport::default()
        };
        let mut records = Vec::new();

        for path in &pdf_files {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            let read_path = path.clone();
            let pages = tokio::task::spawn_blocking(move || read_pdf_pages(&read_path))
                .await
                .map_err(ApiError::internal)?;

            match pages {
                Ok(pages) => {
                    tracing::debug!("{}: {} pages with text", filename, pages.len());
                    report.pages += pages.len();
                    records.extend(build_chunks(&filename, &pages, &self.chunker));
                }
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", filename, err);
                    report.skipped.push(filename);
                }
            }
        }

        report.chunks = self.store_chunks(records).await?;
        tracing::info!(
            "Ingested {} chunks from {} PDFs",
            report.chunks,
            report.files - report.skipped.len()
        );
        Ok(report)
    }

    /// Ingests already-extracted pages for one source document.
    pub async fn ingest_pages(&self, source: &str, pages: &[PageText]) -> Result<usize, ApiError> {
        self.ensure_embedding_model().await?;
        let records = build_chunks(source, pages, &self.chunker);
        self.store_chunks(records).await
    }

    async fn ensure_embedding_model(&self) -> Result<(), ApiError> {
        let current = self.store.embedding_model().await?;
        if current.as_deref() != Some(self.embedding_model.as_str()) {
            tracing::info!(
                "Embedding model changed ({:?} -> {}); resetting index",
                current,
                self.embedding_model
            );
            self.store.reset(&self.embedding_model).await?;
        }
        Ok(())
    }

    async fn store_chunks(&self, records: Vec<ChunkRecord>) -> Result<usize, ApiError> {
        let total = records.len();

        for batch in records.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
            let embeddings = self.provider.embed(&texts, &self.embedding_model).await?;
            if embeddings.len() != batch.len() {
                return Err(ApiError::Upstream(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let items = batch
                .iter()
                .cloned()
                .map(StoredChunk::from)
                .zip(embeddings)
                .collect();
            self.store.upsert_batch(items).await?;
        }

        Ok(total)
    }
}

fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, ApiError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(ApiError::internal)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
