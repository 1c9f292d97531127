//! Vector index abstraction for support-document chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document chunk with its citation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Deterministic chunk identifier (see `ingest::chunk_id`).
    pub chunk_id: String,
    pub content: String,
    /// File name the chunk was extracted from.
    pub source: String,
    /// 1-based PDF page, when known.
    pub page: Option<u32>,
}

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk: StoredChunk,
    /// Cosine distance (lower = better).
    pub distance: f32,
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert or replace chunks keyed by `chunk_id`.
    async fn upsert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError>;

    /// Up to `limit` chunks closest to `query_embedding`, ascending by distance.
    async fn query(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<ChunkHit>, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;

    /// Embedding model the stored vectors were produced with, if recorded.
    async fn embedding_model(&self) -> Result<Option<String>, ApiError>;

    /// Drop every chunk and record the embedding model used from now on.
    async fn reset(&self, embedding_model: &str) -> Result<(), ApiError>;
}
