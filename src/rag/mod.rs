//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `RagStore` / `SqliteRagStore`: the persisted vector index
//! - `Retriever`: query embedding, nearest-neighbour search and the not-found threshold
//! - context and citation formatting for prompts and answers

mod context_builder;
mod retrieval;
mod sqlite;
mod store;

pub use context_builder::{build_context, format_citations, is_answer_found, Citation};
pub use retrieval::{RetrievedChunk, Retriever, SearchDocsOutput, NO_MATCH_DISTANCE};
pub use sqlite::SqliteRagStore;
pub use store::{ChunkHit, RagStore, StoredChunk};
