//! Note-embedding store implementation.
//!
//! Exclusively owns the `note_embedding` table. Rows are write-once except
//! for the soft-delete fields; retirement is always a soft delete so the
//! table keeps an audit trail and avoids concurrent-update races on a
//! single physical row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use notarium_core::{defaults, Error, NoteEmbedding, NoteEmbeddingStore, Result, SemanticHit};

/// PostgreSQL implementation of [`NoteEmbeddingStore`].
#[derive(Clone)]
pub struct PgNoteEmbeddingRepository {
    pool: PgPool,
}

impl PgNoteEmbeddingRepository {
    /// Create a new PgNoteEmbeddingRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteEmbeddingStore for PgNoteEmbeddingRepository {
    async fn create(&self, embedding: &NoteEmbedding) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.create_tx(&mut tx, embedding).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_by_note(&self, note_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.delete_by_note_tx(&mut tx, note_id, now).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_by_notebook(&self, notebook_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.delete_by_notebook_tx(&mut tx, notebook_id, now).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn search(&self, query: &Vector, limit: i64) -> Result<Vec<SemanticHit>> {
        if limit <= 0 {
            return Err(Error::InvalidInput(format!(
                "search limit must be positive, got {}",
                limit
            )));
        }

        let rows = sqlx::query(
            "SELECT note_id, 1.0 - (embedding_value <=> $1) AS score
             FROM note_embedding
             WHERE is_deleted = false
             ORDER BY embedding_value <=> $1
             LIMIT $2",
        )
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let hits: Vec<SemanticHit> = rows
            .into_iter()
            .map(|row| SemanticHit {
                note_id: row.get("note_id"),
                score: row.get::<f64, _>("score") as f32,
            })
            .collect();

        debug!(
            subsystem = "db",
            component = "embeddings",
            op = "search",
            result_count = hits.len(),
            "Semantic search complete"
        );
        Ok(hits)
    }
}

// Transaction-aware variants so the pipeline can compose retire-then-insert
// atomically with other writes.
impl PgNoteEmbeddingRepository {
    /// Search with the default result limit.
    pub async fn search_default(&self, query: &Vector) -> Result<Vec<SemanticHit>> {
        self.search(query, defaults::SEARCH_LIMIT).await
    }

    /// Insert a new row within an existing transaction.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        embedding: &NoteEmbedding,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO note_embedding
                 (id, note_id, document, embedding_value, created_at, updated_at, deleted_at, is_deleted)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(embedding.id)
        .bind(embedding.note_id)
        .bind(&embedding.document)
        .bind(&embedding.embedding_value)
        .bind(embedding.created_at)
        .bind(embedding.updated_at)
        .bind(embedding.deleted_at)
        .bind(embedding.is_deleted)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Soft-delete all currently-live rows for a note within an existing
    /// transaction. A note with no live rows is a no-op success.
    pub async fn delete_by_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE note_embedding
             SET is_deleted = true, deleted_at = $1
             WHERE note_id = $2 AND is_deleted = false",
        )
        .bind(now)
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Cascade soft-delete within an existing transaction.
    ///
    /// Joins against the note's current notebook ownership at call time:
    /// notes already moved to another notebook are unaffected.
    pub async fn delete_by_notebook_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        notebook_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE note_embedding
             SET is_deleted = true, deleted_at = $1
             WHERE is_deleted = false
               AND note_id IN (
                   SELECT id FROM note
                   WHERE notebook_id = $2 AND is_deleted = false
               )",
        )
        .bind(now)
        .bind(notebook_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// All embedding rows for a note, live and retired, newest first.
    pub async fn get_for_note(&self, note_id: Uuid) -> Result<Vec<NoteEmbedding>> {
        let rows = sqlx::query(
            "SELECT id, note_id, document, embedding_value, created_at, updated_at, deleted_at, is_deleted
             FROM note_embedding
             WHERE note_id = $1
             ORDER BY id DESC",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let embeddings = rows
            .into_iter()
            .map(|row| NoteEmbedding {
                id: row.get("id"),
                note_id: row.get("note_id"),
                document: row.get("document"),
                embedding_value: row.get("embedding_value"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                deleted_at: row.get("deleted_at"),
                is_deleted: row.get("is_deleted"),
            })
            .collect();

        Ok(embeddings)
    }

    /// Count of live rows for a note. At most 1 when the pipeline's
    /// invariant holds.
    pub async fn live_count(&self, note_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count
             FROM note_embedding
             WHERE note_id = $1 AND is_deleted = false",
        )
        .bind(note_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("count"))
    }
}
