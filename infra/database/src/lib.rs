//! # Database Infrastructure
//!
//! Storage for posts and comments behind two repository traits, with an
//! in-process backend and a [SurrealDB](https://surrealdb.com) backend.
//!
//! ## Key Features
//! - **Two backends**: [`MemoryStore`] for tests and single-node runs, [`SurrealStore`]
//!   for `mem://`, `rocksdb://`, `ws://` and `http://` via the `any` engine.
//! - **Keyset windows**: every listing is newest first, bounded by an exclusive
//!   `after` id and overfetched by one row.
//! - **Builder Pattern**: Fluent API for choosing a backend, session and credentials.
//!
//! ## Example
//!
//! ```rust
//! use parley_database::{CommentRepository, Database, DatabaseError, PostRepository};
//! use parley_domain::models::{LoadKey, NewComment, NewPost};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder().memory().init().await?;
//!
//!     let post = PostRepository::insert(
//!         &db,
//!         NewPost { title: "Hello".into(), text: "World".into(), closed: false },
//!     )
//!     .await?;
//!     CommentRepository::insert(
//!         &db,
//!         NewComment { text: "First".into(), article_id: post.id, parent_id: None },
//!     )
//!     .await?;
//!
//!     let batch = CommentRepository::get_many(&db, &[LoadKey::article(post.id, 10)]).await?;
//!     assert_eq!(batch.rows.item_count(), 1);
//!     Ok(())
//! }
//! ```

mod error;
mod memory;
mod repository;
mod surreal;

pub use error::{DatabaseError, DatabaseErrorExt};
pub use memory::MemoryStore;
pub use repository::{CommentRepository, PostRepository};
pub use surreal::SurrealStore;

use parley_domain::config::{DatabaseConfig, StorageBackend};
use parley_domain::models::{
    Comment, CommentBatch, CommentId, LoadKey, NewComment, NewPost, Post, PostId, PostsQuery,
};
use tracing::{info, instrument};

/// Storage handle shared by every request. Cloning is cheap.
#[derive(Debug, Clone)]
pub enum Database {
    Memory(MemoryStore),
    Surreal(SurrealStore),
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    #[must_use]
    pub const fn backend(&self) -> StorageBackend {
        match self {
            Self::Memory(_) => StorageBackend::Memory,
            Self::Surreal(_) => StorageBackend::Surreal,
        }
    }

    /// Checks that the backend answers.
    ///
    /// # Errors
    /// [`DatabaseError::Surreal`] when the `SurrealDB` engine is unreachable.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Surreal(store) => store.ping().await,
        }
    }
}

impl From<MemoryStore> for Database {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<SurrealStore> for Database {
    fn from(store: SurrealStore) -> Self {
        Self::Surreal(store)
    }
}

impl PostRepository for Database {
    async fn get(&self, id: PostId) -> Result<Post, DatabaseError> {
        match self {
            Self::Memory(store) => PostRepository::get(store, id).await,
            Self::Surreal(store) => PostRepository::get(store, id).await,
        }
    }

    async fn get_many(&self, query: PostsQuery) -> Result<Vec<Post>, DatabaseError> {
        match self {
            Self::Memory(store) => PostRepository::get_many(store, query).await,
            Self::Surreal(store) => PostRepository::get_many(store, query).await,
        }
    }

    async fn insert(&self, post: NewPost) -> Result<Post, DatabaseError> {
        match self {
            Self::Memory(store) => PostRepository::insert(store, post).await,
            Self::Surreal(store) => PostRepository::insert(store, post).await,
        }
    }
}

impl CommentRepository for Database {
    async fn get(&self, id: CommentId) -> Result<Comment, DatabaseError> {
        match self {
            Self::Memory(store) => CommentRepository::get(store, id).await,
            Self::Surreal(store) => CommentRepository::get(store, id).await,
        }
    }

    async fn get_many(&self, keys: &[LoadKey]) -> Result<CommentBatch, DatabaseError> {
        match self {
            Self::Memory(store) => CommentRepository::get_many(store, keys).await,
            Self::Surreal(store) => CommentRepository::get_many(store, keys).await,
        }
    }

    async fn insert(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        match self {
            Self::Memory(store) => CommentRepository::insert(store, comment).await,
            Self::Surreal(store) => CommentRepository::insert(store, comment).await,
        }
    }
}

/// A fluent builder for choosing and initializing a storage backend.
///
/// `SurrealDB` needs the connection URL, namespace and database name upfront;
/// the in-memory backend needs nothing.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    memory: bool,
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the in-process backend. Connection settings are ignored.
    pub const fn memory(mut self) -> Self {
        self.memory = true;
        self
    }

    /// Sets the `SurrealDB` connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name.
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Add root credentials to the connection.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Applies the `[database]` configuration section.
    pub fn config(self, config: &DatabaseConfig) -> Self {
        let builder = match config.backend {
            StorageBackend::Memory => self.memory(),
            StorageBackend::Surreal => self
                .url(&config.url)
                .session(&config.namespace, &config.database),
        };
        match &config.credentials {
            Some(credentials) => builder.auth(&credentials.username, &credentials.password),
            None => builder,
        }
    }

    /// Consumes the builder and initializes the selected backend.
    ///
    /// For `SurrealDB` this runs the full connection lifecycle: engine start,
    /// up to 3 health checks with exponential backoff (starting at 500ms),
    /// optional root sign-in, session activation and schema bootstrap.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if required parameters are missing.
    /// * [`DatabaseError::Connection`] if the engine fails to start or remains unhealthy.
    /// * [`DatabaseError::Auth`] if the provided credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation or the schema bootstrap fails.
    #[instrument(skip(self), fields(memory = self.memory, url = self.url, ns = self.ns, db = self.db))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        if self.memory {
            info!("Using in-memory storage");
            return Ok(Database::Memory(MemoryStore::new()));
        }

        let url = self.url.ok_or(DatabaseError::Validation {
            message: "URL is required".into(),
            context: None,
        })?;
        let ns = self.ns.ok_or(DatabaseError::Validation {
            message: "Namespace is required".into(),
            context: None,
        })?;
        let db = self.db.ok_or(DatabaseError::Validation {
            message: "Database is required".into(),
            context: None,
        })?;

        let store = SurrealStore::connect(&url, &ns, &db, self.auth).await?;
        Ok(Database::Surreal(store))
    }
}
