//! Support-document index in SQLite.
//!
//! One row per chunk scoped by collection; vectors are ranked in process by
//! cosine distance.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkHit, RagStore, StoredChunk};
use crate::core::errors::ApiError;
use crate::vector_math::rank_ascending_by_distance;

pub struct SqliteRagStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteRagStore {
    pub async fn open(db_path: PathBuf, collection: &str) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self {
            pool,
            collection: collection.to_string(),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                page INTEGER,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rag_collection ON rag_chunks(collection)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn meta_key(&self) -> String {
        format!("{}:embedding_model", self.collection)
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let page: Option<i64> = row.get("page");
        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            page: page.and_then(|p| u32::try_from(p).ok()),
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn upsert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks (chunk_id, collection, content, source, page, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&self.collection)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(chunk.page.map(i64::from))
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        tracing::debug!("Upserted {} chunks into {}", items.len(), self.collection);
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkHit>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, page, embedding
             FROM rag_chunks
             WHERE collection = ?1",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let (chunks, embeddings): (Vec<StoredChunk>, Vec<Vec<f32>>) = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Option<Vec<u8>> = row.get("embedding");
                let embedding_bytes = embedding_bytes.filter(|bytes| !bytes.is_empty())?;
                Some((Self::row_to_chunk(row), Self::deserialize_embedding(&embedding_bytes)))
            })
            .unzip();

        let hits = rank_ascending_by_distance(query_embedding, &embeddings)
            .into_iter()
            .take(limit)
            .map(|(idx, distance)| ChunkHit {
                chunk: chunks[idx].clone(),
                distance,
            })
            .collect();

        Ok(hits)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = ?1")
            .bind(self.meta_key())
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn reset(&self, embedding_model: &str) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM rag_chunks WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (key, value, updated_at)
             VALUES (?1, ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(self.meta_key())
        .bind(embedding_model)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        tracing::info!(
            "Reset collection {} for embedding model {}",
            self.collection,
            embedding_model
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir, collection: &str) -> SqliteRagStore {
        SqliteRagStore::open(dir.path().join("vectorstore/rag.db"), collection)
            .await
            .unwrap()
    }

    fn make_chunk(id: &str, content: &str, page: Option<u32>) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: "manual.pdf".to_string(),
            page,
        }
    }

    #[tokio::test]
    async fn upsert_and_query_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "support_docs").await;

        store
            .upsert_batch(vec![
                (make_chunk("far", "tires", Some(2)), vec![0.0, 1.0]),
                (make_chunk("near", "battery", Some(1)), vec![1.0, 0.0]),
                (make_chunk("mid", "both", None), vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.chunk_id.as_str()).collect();

        assert_eq!(ids, vec!["near", "mid"]);
        assert!(hits[0].distance.abs() < 1e-5);
        assert_eq!(hits[0].chunk.page, Some(1));
        assert_eq!(hits[1].chunk.page, None);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "support_docs").await;

        store
            .upsert_batch(vec![(make_chunk("c1", "old", Some(1)), vec![1.0])])
            .await
            .unwrap();
        store
            .upsert_batch(vec![(make_chunk("c1", "new", Some(1)), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.query(&[1.0], 5).await.unwrap();
        assert_eq!(hits[0].chunk.content, "new");
    }

    #[tokio::test]
    async fn zero_limit_and_empty_store_return_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir, "support_docs").await;

        assert!(store.query(&[1.0], 5).await.unwrap().is_empty());

        store
            .upsert_batch(vec![(make_chunk("c1", "x", None), vec![1.0])])
            .await
            .unwrap();
        assert!(store.query(&[1.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_are_isolated_and_reset_records_model() {
        let dir = tempfile::tempdir().unwrap();
        let docs = test_store(&dir, "support_docs").await;
        let other = test_store(&dir, "other").await;

        docs.upsert_batch(vec![(make_chunk("a", "x", None), vec![1.0])])
            .await
            .unwrap();
        other
            .upsert_batch(vec![(make_chunk("b", "y", None), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(docs.embedding_model().await.unwrap(), None);
        docs.reset("text-embedding-3-small").await.unwrap();

        assert_eq!(docs.count().await.unwrap(), 0);
        assert_eq!(other.count().await.unwrap(), 1);
        assert_eq!(
            docs.embedding_model().await.unwrap().as_deref(),
            Some("text-embedding-3-small")
        );
        assert_eq!(other.embedding_model().await.unwrap(), None);
    }
}
