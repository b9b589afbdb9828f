use parley_database::{CommentRepository, Database, DatabaseError};
use parley_domain::models::{BatchRequest, CommentBatch};
use parley_loader::BatchFetcher;
use tracing::instrument;

/// Feeds the request-scoped loader from storage: one bulk query per uniform batch.
#[derive(Debug, Clone)]
pub struct CommentFetcher {
    database: Database,
}

impl CommentFetcher {
    #[must_use]
    pub const fn new(database: Database) -> Self {
        Self { database }
    }
}

impl BatchFetcher for CommentFetcher {
    type Error = DatabaseError;

    #[instrument(skip_all, fields(batch = request.len()))]
    async fn fetch(&self, request: &BatchRequest) -> Result<CommentBatch, Self::Error> {
        CommentRepository::get_many(&self.database, request).await
    }
}
