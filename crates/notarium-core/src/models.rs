//! Core data models for the notarium embedding pipeline.

use chrono::{DateTime, SecondsFormat, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uuid_utils::new_v7;

/// A note as read by the ingestion pipeline.
///
/// Notes are owned by the note CRUD service; the pipeline only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub notebook_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A notebook (parent container of notes), read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A stored note embedding row.
///
/// Rows are write-once: created only by the ingestion pipeline after a
/// successful provider call, and retired only by soft delete. For any
/// `note_id` at most one row has `is_deleted = false` at a time; the
/// delete-then-insert transaction in the pipeline enforces this, not a
/// uniqueness constraint.
#[derive(Debug, Clone)]
pub struct NoteEmbedding {
    pub id: Uuid,
    pub note_id: Uuid,
    /// The exact text that was embedded, kept for traceability and
    /// re-embedding decisions.
    pub document: String,
    pub embedding_value: Vector,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

impl NoteEmbedding {
    /// Build a fresh live embedding row for a note.
    pub fn new(note_id: Uuid, document: String, embedding_value: Vector) -> Self {
        Self {
            id: new_v7(),
            note_id,
            document,
            embedding_value,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
            is_deleted: false,
        }
    }
}

/// A semantic search result: a live note id with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHit {
    pub note_id: Uuid,
    /// Cosine similarity in `[−1, 1]`; hits are ordered by descending score
    /// (equivalently ascending cosine distance).
    pub score: f32,
}

/// Wire payload of a note-changed event: `{"note_id": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteChangedEvent {
    pub note_id: Uuid,
}

/// Placeholder used for the updated-at line when a note was never updated.
const NEVER_UPDATED: &str = "-";

fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render the canonical document for a note.
///
/// The output is deterministic: two renders of unchanged inputs are
/// byte-identical. This is the exact text handed to the embedding provider
/// and stored in `NoteEmbedding::document`.
pub fn render_document(note: &Note, notebook: &Notebook) -> String {
    let updated_at = note
        .updated_at
        .as_ref()
        .map(rfc3339)
        .unwrap_or_else(|| NEVER_UPDATED.to_string());

    format!(
        "Note Title: {}\nNotebook Title: {}\n\n{}\n\nCreated At: {}\nUpdated At: {}",
        note.title,
        notebook.name,
        note.content,
        rfc3339(&note.created_at),
        updated_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixture() -> (Note, Notebook) {
        let created = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let notebook = Notebook {
            id: Uuid::new_v4(),
            name: "Research".to_string(),
            created_at: created,
            updated_at: None,
        };
        let note = Note {
            id: Uuid::new_v4(),
            title: "Vector indexes".to_string(),
            content: "HNSW beats IVFFlat at high recall.".to_string(),
            notebook_id: notebook.id,
            created_at: created,
            updated_at: None,
        };
        (note, notebook)
    }

    #[test]
    fn test_render_document_shape() {
        let (note, notebook) = fixture();
        let doc = render_document(&note, &notebook);
        assert_eq!(
            doc,
            "Note Title: Vector indexes\nNotebook Title: Research\n\n\
             HNSW beats IVFFlat at high recall.\n\n\
             Created At: 2026-03-14T09:26:53Z\nUpdated At: -"
        );
    }

    #[test]
    fn test_render_document_is_deterministic() {
        let (note, notebook) = fixture();
        assert_eq!(
            render_document(&note, &notebook),
            render_document(&note, &notebook)
        );
    }

    #[test]
    fn test_render_document_with_updated_at() {
        let (mut note, notebook) = fixture();
        note.updated_at = Some(Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap());
        let doc = render_document(&note, &notebook);
        assert!(doc.ends_with("Updated At: 2026-03-15T10:00:00Z"));
        assert!(!doc.contains("Updated At: -"));
    }

    #[test]
    fn test_note_embedding_new_is_live() {
        let vector = Vector::from(vec![0.1, 0.2, 0.3]);
        let note_id = Uuid::new_v4();
        let e = NoteEmbedding::new(note_id, "doc".to_string(), vector);
        assert_eq!(e.note_id, note_id);
        assert!(!e.is_deleted);
        assert!(e.deleted_at.is_none());
        assert!(e.updated_at.is_none());
        assert_eq!(e.id.get_version_num(), 7);
    }

    #[test]
    fn test_note_changed_event_wire_shape() {
        let event = NoteChangedEvent {
            note_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"note_id":"00000000-0000-0000-0000-000000000000"}"#
        );
        let back: NoteChangedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_note_changed_event_rejects_missing_field() {
        let res = serde_json::from_str::<NoteChangedEvent>("{}");
        assert!(res.is_err());
    }
}
