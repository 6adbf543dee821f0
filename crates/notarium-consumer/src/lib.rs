//! # notarium-consumer
//!
//! Background consumer that keeps the semantic-search index consistent with
//! note content.
//!
//! This crate provides:
//! - The ingestion pipeline: note + notebook → canonical document →
//!   embedding → atomic retire-then-insert
//! - The event-consumer loop with ack/nack policy and panic containment
//!
//! ## Example
//!
//! ```ignore
//! use notarium_consumer::{Consumer, ConsumerConfig, IngestPipeline};
//! use notarium_core::MessageBus;
//! use notarium_db::Database;
//! use notarium_inference::GeminiBackend;
//! use std::sync::Arc;
//!
//! let db = Database::connect("postgres://...").await?;
//! let backend = Arc::new(GeminiBackend::from_env()?);
//! let bus = MessageBus::new();
//!
//! let pipeline = Arc::new(IngestPipeline::new(db, backend));
//! let handle = Consumer::new(bus.clone(), pipeline, ConsumerConfig::from_env()).start()?;
//!
//! // ... publish note-changed events on the bus ...
//!
//! handle.shutdown().await?;
//! ```

pub mod consumer;
pub mod pipeline;

// Re-export core types and the database facade for the outer service
pub use notarium_core::*;
pub use notarium_db::Database;

pub use consumer::{Consumer, ConsumerConfig, ConsumerHandle};
pub use pipeline::{IngestPipeline, NoteIngestor};
