//! Note and notebook repositories.
//!
//! The ingestion pipeline only reads these tables; the CRUD service that
//! owns them lives outside this workspace. The insert helpers exist for the
//! deletion cascade tests and fixtures.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use notarium_core::{Error, Note, Notebook, NoteReader, NotebookReader, Result};

/// PostgreSQL implementation of [`NoteReader`].
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a note row (fixture/test support).
    pub async fn insert(&self, note: &Note) -> Result<()> {
        sqlx::query(
            "INSERT INTO note (id, title, content, notebook_id, created_at, updated_at, is_deleted)
             VALUES ($1, $2, $3, $4, $5, $6, false)",
        )
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.notebook_id)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Soft-delete a note row (fixture/test support for the cascade path).
    pub async fn soft_delete(&self, note_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE note SET is_deleted = true, deleted_at = now() WHERE id = $1",
        )
        .bind(note_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl NoteReader for PgNoteRepository {
    async fn get_by_id(&self, note_id: Uuid) -> Result<Note> {
        let row = sqlx::query(
            "SELECT id, title, content, notebook_id, created_at, updated_at
             FROM note
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(note_id))?;

        Ok(Note {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            notebook_id: row.get("notebook_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

/// PostgreSQL implementation of [`NotebookReader`].
#[derive(Clone)]
pub struct PgNotebookRepository {
    pool: PgPool,
}

impl PgNotebookRepository {
    /// Create a new PgNotebookRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a notebook row (fixture/test support).
    pub async fn insert(&self, notebook: &Notebook) -> Result<()> {
        sqlx::query(
            "INSERT INTO notebook (id, name, created_at, updated_at, is_deleted)
             VALUES ($1, $2, $3, $4, false)",
        )
        .bind(notebook.id)
        .bind(&notebook.name)
        .bind(notebook.created_at)
        .bind(notebook.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl NotebookReader for PgNotebookRepository {
    async fn get_by_id(&self, notebook_id: Uuid) -> Result<Notebook> {
        let row = sqlx::query(
            "SELECT id, name, created_at, updated_at
             FROM notebook
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(notebook_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NotebookNotFound(notebook_id))?;

        Ok(Notebook {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}
