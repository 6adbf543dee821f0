//! Embedding ingestion pipeline.
//!
//! Processes one note-changed event end to end: load the note and its
//! parent notebook, render the canonical document, embed it, then retire
//! the old embedding and insert the new one in a single transaction.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use notarium_core::{
    render_document, EmbeddingBackend, EmbeddingTask, Error, NoteEmbedding, NoteReader,
    NotebookReader, Result,
};
use notarium_db::Database;

/// Seam between the consumer loop and the pipeline, so the loop can be
/// tested against a stub.
#[async_trait]
pub trait NoteIngestor: Send + Sync {
    /// Recompute and atomically replace the embedding for a note.
    async fn ingest(&self, note_id: Uuid) -> Result<()>;
}

/// The production pipeline over PostgreSQL and an embedding backend.
pub struct IngestPipeline {
    db: Database,
    backend: Arc<dyn EmbeddingBackend>,
}

impl IngestPipeline {
    /// Create a pipeline over the given database and embedding backend.
    pub fn new(db: Database, backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { db, backend }
    }
}

#[async_trait]
impl NoteIngestor for IngestPipeline {
    /// Any step failure aborts the run without partial commits; retry is
    /// the consumer's concern, not the pipeline's.
    ///
    /// Overlapping runs for the same note are not mutually excluded beyond
    /// the transaction boundary: each independently retires-then-inserts
    /// and the last commit wins, with no ordering guarantee relative to
    /// edit recency. This is an accepted, bounded inconsistency window —
    /// the bus redelivers on failure and a later edit event reconverges
    /// the index.
    #[instrument(skip(self), fields(subsystem = "consumer", component = "pipeline", op = "ingest", note_id = %note_id))]
    async fn ingest(&self, note_id: Uuid) -> Result<()> {
        let start = Instant::now();

        let note = self.db.notes.get_by_id(note_id).await?;
        let notebook = self.db.notebooks.get_by_id(note.notebook_id).await?;

        let document = render_document(&note, &notebook);
        let vector = self
            .backend
            .embed(&document, EmbeddingTask::RetrievalDocument)
            .await?;
        let embedding = NoteEmbedding::new(note.id, document, vector);

        // Retire-then-insert shares one transaction: if the insert fails
        // the rollback leaves the prior live row untouched, so the note is
        // never committed to zero live embeddings.
        let mut tx = self.db.pool.begin().await.map_err(Error::Database)?;
        self.db
            .embeddings
            .delete_by_note_tx(&mut tx, note.id, Utc::now())
            .await?;
        self.db.embeddings.create_tx(&mut tx, &embedding).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            model = self.backend.model_name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Note embedding replaced"
        );
        Ok(())
    }
}
