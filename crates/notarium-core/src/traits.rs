//! Trait definitions for the pipeline's seams.
//!
//! The ingestion pipeline depends on these traits rather than concrete
//! implementations so the storage layer and embedding provider can be
//! swapped (or mocked) independently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Note, Notebook, NoteEmbedding, SemanticHit};
use crate::{Result, Vector};

/// Read-only access to notes (external collaborator).
#[async_trait]
pub trait NoteReader: Send + Sync {
    /// Fetch a note by id.
    ///
    /// Returns [`crate::Error::NoteNotFound`] if the note does not exist or
    /// is soft-deleted.
    async fn get_by_id(&self, note_id: Uuid) -> Result<Note>;
}

/// Read-only access to notebooks (external collaborator).
#[async_trait]
pub trait NotebookReader: Send + Sync {
    /// Fetch a notebook by id.
    ///
    /// Returns [`crate::Error::NotebookNotFound`] if absent or soft-deleted.
    async fn get_by_id(&self, notebook_id: Uuid) -> Result<Notebook>;
}

/// Persistent store of note embeddings.
///
/// The store exclusively owns the `note_embedding` table. Rows are never
/// physically removed; retirement is always a soft delete. Implementations
/// additionally expose `_tx` variants of the mutators so the pipeline can
/// compose retire-then-insert atomically (see `notarium-db`).
#[async_trait]
pub trait NoteEmbeddingStore: Send + Sync {
    /// Insert a new row. Never mutates an existing row.
    async fn create(&self, embedding: &NoteEmbedding) -> Result<()>;

    /// Soft-delete all currently-live rows for `note_id`.
    ///
    /// Idempotent: a note with no live rows is a no-op success.
    async fn delete_by_note(&self, note_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Soft-delete all currently-live rows belonging to notes under
    /// `notebook_id`. The cascade joins against the note's current notebook
    /// ownership at call time; notes already moved elsewhere are unaffected.
    async fn delete_by_notebook(&self, notebook_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Return up to `limit` live note ids ordered by ascending cosine
    /// distance to `query`. `limit` must be positive.
    async fn search(&self, query: &Vector, limit: i64) -> Result<Vec<SemanticHit>>;
}

/// Task-type hint passed to the embedding provider.
///
/// Retrieval indexing and query-time embedding use different hints so the
/// provider can apply asymmetric projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Embedding a document for the retrieval index.
    RetrievalDocument,
    /// Embedding a search query.
    RetrievalQuery,
}

impl EmbeddingTask {
    /// Provider wire name for the task type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Backend that turns a text document into a fixed-length vector.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single document with the given task-type hint.
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vector>;

    /// Expected dimension of returned vectors. Constant for the process
    /// lifetime (provider contract).
    fn dimension(&self) -> usize;

    /// Model name being used.
    fn model_name(&self) -> &str;
}
