//! Deterministic mock embedding backend for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use notarium_core::{EmbeddingBackend, EmbeddingTask, Error, Result, Vector};

/// Mock backend producing deterministic vectors derived from the input text.
///
/// The same text always embeds to the same vector, which makes idempotence
/// assertions trivial. A failure message can be injected to simulate
/// provider outages.
pub struct MockEmbeddingBackend {
    dimension: usize,
    fail_with: Mutex<Option<String>>,
    calls: Mutex<Vec<(String, EmbeddingTask)>>,
}

impl MockEmbeddingBackend {
    /// Create a mock backend producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_with: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent `embed` call fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.lock().unwrap() = Some(message.into());
    }

    /// Restore normal operation after `fail_with`.
    pub fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    /// Recorded `(text, task)` calls, in order.
    pub fn calls(&self) -> Vec<(String, EmbeddingTask)> {
        self.calls.lock().unwrap().clone()
    }

    fn vector_for(&self, text: &str) -> Vector {
        // FNV-1a over the text seeds a tiny LCG; stable across runs.
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in text.bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        let mut state = hash | 1;
        let values: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (u32::MAX as f32)) * 2.0 - 1.0
            })
            .collect();
        Vector::from(values)
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vector> {
        self.calls.lock().unwrap().push((text.to_string(), task));
        if let Some(msg) = self.fail_with.lock().unwrap().clone() {
            return Err(Error::Embedding(msg));
        }
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let backend = MockEmbeddingBackend::new(8);
        let a = backend
            .embed("stable", EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        let b = backend
            .embed("stable", EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
        assert_eq!(a.as_slice().len(), 8);
    }

    #[tokio::test]
    async fn test_different_text_different_vector() {
        let backend = MockEmbeddingBackend::new(8);
        let a = backend
            .embed("one", EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        let b = backend
            .embed("two", EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MockEmbeddingBackend::new(4);
        backend.fail_with("simulated outage");
        let err = backend
            .embed("doc", EmbeddingTask::RetrievalDocument)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));

        backend.succeed();
        assert!(backend
            .embed("doc", EmbeddingTask::RetrievalDocument)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_records_calls() {
        let backend = MockEmbeddingBackend::new(4);
        backend
            .embed("doc", EmbeddingTask::RetrievalDocument)
            .await
            .unwrap();
        backend
            .embed("query", EmbeddingTask::RetrievalQuery)
            .await
            .unwrap();
        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("doc".to_string(), EmbeddingTask::RetrievalDocument));
        assert_eq!(calls[1], ("query".to_string(), EmbeddingTask::RetrievalQuery));
    }
}
