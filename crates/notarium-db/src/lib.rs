//! # notarium-db
//!
//! PostgreSQL + pgvector persistence layer for notarium.
//!
//! This crate provides:
//! - Connection pool management
//! - Read repositories for notes and notebooks
//! - The note-embedding store (soft-delete semantics, vector search)
//!
//! ## Example
//!
//! ```rust,ignore
//! use notarium_db::Database;
//! use notarium_core::NoteEmbeddingStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/notarium").await?;
//!     let hits = db.embeddings.search(&query_vector, 5).await?;
//!     Ok(())
//! }
//! ```

pub mod embeddings;
pub mod notes;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use notarium_core::*;

pub use embeddings::PgNoteEmbeddingRepository;
pub use notes::{PgNoteRepository, PgNotebookRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::PgPool,
    /// Note read repository.
    pub notes: PgNoteRepository,
    /// Notebook read repository.
    pub notebooks: PgNotebookRepository,
    /// Note-embedding store.
    pub embeddings: PgNoteEmbeddingRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            notebooks: PgNotebookRepository::new(pool.clone()),
            embeddings: PgNoteEmbeddingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
