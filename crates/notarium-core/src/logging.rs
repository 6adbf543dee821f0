//! Structured logging field name constants for notarium.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, message will be redelivered |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |

/// Subsystem originating the log event.
/// Values: "db", "inference", "consumer", "bus"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "gemini", "pipeline", "consumer"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "ingest", "embed", "search", "delete_by_note"
pub const OPERATION: &str = "op";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Notebook UUID being operated on.
pub const NOTEBOOK_ID: &str = "notebook_id";

/// Topic a message was received from.
pub const TOPIC: &str = "topic";

/// Delivery attempt number for a bus message (1-based).
pub const ATTEMPT: &str = "attempt";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Model name used for embedding.
pub const MODEL: &str = "model";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
