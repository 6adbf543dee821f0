//! # notarium-inference
//!
//! Embedding provider backends for notarium.
//!
//! This crate provides:
//! - The Gemini `embedContent` backend (default)
//! - A deterministic mock backend for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use notarium_inference::GeminiBackend;
//! use notarium_core::{EmbeddingBackend, EmbeddingTask};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = GeminiBackend::from_env().unwrap();
//!     let vector = backend
//!         .embed("some document", EmbeddingTask::RetrievalDocument)
//!         .await
//!         .unwrap();
//! }
//! ```

pub mod gemini;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use notarium_core::*;

pub use gemini::GeminiBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingBackend;
