//! Centralized default constants for the notarium system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Gemini).
pub const EMBED_MODEL: &str = "gemini-embedding-001";

/// Default embedding vector dimension for gemini-embedding-001.
pub const EMBED_DIMENSION: usize = 768;

/// Default base URL for the Gemini API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// SEARCH
// =============================================================================

/// Default number of results for semantic search.
pub const SEARCH_LIMIT: i64 = 5;

// =============================================================================
// MESSAGING
// =============================================================================

/// Topic carrying note-changed events.
pub const NOTE_CHANGED_TOPIC: &str = "note.changed";

/// Default redelivery limit before a message is dropped (dead-lettered).
/// `None` at the bus level means redeliver forever.
pub const BUS_MAX_REDELIVERIES: u32 = 25;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of connections in the pool.
pub const POOL_MAX_CONNECTIONS: u32 = 10;

/// Default connection timeout in seconds.
pub const POOL_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 600;
