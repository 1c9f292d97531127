//! Query-side retrieval: embed, search, apply the not-found threshold.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context_builder::{is_answer_found, Citation};
use super::store::{ChunkHit, RagStore};
use crate::core::config::RetrievalConfig;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

/// Reported as `best_distance` when the index returned nothing.
pub const NO_MATCH_DISTANCE: f32 = 999.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub distance: f32,
}

/// Payload returned to the model by the `search_docs` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocsOutput {
    pub question: String,
    pub best_distance: f32,
    pub not_found_threshold: f32,
    pub found: bool,
    pub chunks: Vec<RetrievedChunk>,
    pub citations: Vec<Citation>,
}

#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn RagStore>,
    embedding_model: String,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn RagStore>,
        embedding_model: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            provider,
            store,
            embedding_model: embedding_model.into(),
            config,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.config.not_found_distance
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self
            .provider
            .embed(&[query.to_string()], &self.embedding_model)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Upstream("Embedding provider returned no vector".to_string()))
    }

    /// Nearest chunks for `query`, closest first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ChunkHit>, ApiError> {
        let embedding = self.embed_query(query).await?;
        let mut hits = self.store.query(&embedding, k).await?;
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(hits)
    }

    pub async fn search_docs(&self, question: &str) -> Result<SearchDocsOutput, ApiError> {
        let hits = self.retrieve(question, self.config.top_k).await?;
        let threshold = self.threshold();
        let best_distance = hits.first().map(|h| h.distance).unwrap_or(NO_MATCH_DISTANCE);
        let found = is_answer_found(&hits, threshold);

        tracing::info!(
            "search_docs: {} hits, best distance {:.3}, found={}",
            hits.len(),
            best_distance,
            found
        );

        Ok(SearchDocsOutput {
            question: question.to_string(),
            best_distance,
            not_found_threshold: threshold,
            found,
            citations: hits.iter().map(Citation::from).collect(),
            chunks: hits
                .into_iter()
                .map(|hit| RetrievedChunk {
                    text: hit.chunk.content,
                    source: Some(hit.chunk.source),
                    page: hit.chunk.page,
                    distance: hit.distance,
                })
                .collect(),
        })
    }
}
