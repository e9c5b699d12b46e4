//! # folio-db
//!
//! PostgreSQL database layer for folio.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, categories, notes, and sessions
//! - The filesystem blob store behind image uploads
//! - Embedded schema migrations (behind the `migrations` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_db::{CreateNote, Database, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/folio").await?;
//!
//!     let note_id = db.notes.create(user_id, CreateNote {
//!         title: "Hello".to_string(),
//!         content: "<p>world</p>".to_string(),
//!         category_id: None,
//!     }).await?;
//!
//!     println!("Created note: {}", note_id);
//!     Ok(())
//! }
//! ```

pub mod categories;
pub mod notes;
pub mod pool;
pub mod sessions;
pub mod storage;
pub mod users;

// Re-export core types
pub use folio_core::*;

// Re-export repository implementations
pub use categories::PgCategoryRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use sessions::PgSessionRepository;
pub use storage::{validate_key, BlobStore, FilesystemStore};
pub use users::PgUserRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// User repository, performing the login upsert.
    pub users: PgUserRepository,
    /// Category repository for user-scoped CRUD.
    pub categories: PgCategoryRepository,
    /// Note repository for user-scoped CRUD.
    pub notes: PgNoteRepository,
    /// Session repository backing cookie authentication.
    pub sessions: PgSessionRepository,
    /// Owner open id for cloning (used by Clone impl to reconfigure users).
    owner_open_id: Option<String>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            categories: PgCategoryRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            owner_open_id: None,
            pool,
        }
    }

    /// Configure the owner identity whose logins are granted the admin role.
    pub fn with_owner_open_id(mut self, open_id: Option<String>) -> Self {
        self.users = PgUserRepository::new(self.pool.clone()).with_owner(open_id.clone());
        self.owner_open_id = open_id;
        self
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
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            users: PgUserRepository::new(self.pool.clone())
                .with_owner(self.owner_open_id.clone()),
            categories: PgCategoryRepository::new(self.pool.clone()),
            notes: PgNoteRepository::new(self.pool.clone()),
            sessions: PgSessionRepository::new(self.pool.clone()),
            owner_open_id: self.owner_open_id.clone(),
        }
    }
}
