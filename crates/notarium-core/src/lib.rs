//! # notarium-core
//!
//! Core types, traits, and abstractions for the notarium embedding pipeline.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other notarium crates depend on: the error taxonomy, the note and
//! embedding entities, the canonical document renderer, the repository and
//! backend traits, and the in-process message bus.

pub mod bus;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use bus::{BusConfig, Delivery, MessageBus, Subscription};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;

/// Embedding vector type shared with the pgvector storage layer.
pub use pgvector::Vector;
