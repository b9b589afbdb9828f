use crate::DatabaseError;
use parley_domain::models::{
    Comment, CommentBatch, CommentId, LoadKey, NewComment, NewPost, Post, PostId, PostsQuery,
};
use std::future::Future;

/// Post storage.
pub trait PostRepository: Send + Sync {
    /// # Errors
    /// [`DatabaseError::NotFound`] for an unknown id.
    fn get(&self, id: PostId) -> impl Future<Output = Result<Post, DatabaseError>> + Send;

    /// Posts below `query.after`, newest first, at most `query.first + 1` of them.
    ///
    /// # Errors
    /// [`DatabaseError::NotFound`] when nothing matches.
    fn get_many(
        &self,
        query: PostsQuery,
    ) -> impl Future<Output = Result<Vec<Post>, DatabaseError>> + Send;

    /// Assigns the next post id and stamps the creation time.
    fn insert(&self, post: NewPost) -> impl Future<Output = Result<Post, DatabaseError>> + Send;
}

/// Comment storage.
pub trait CommentRepository: Send + Sync {
    /// # Errors
    /// [`DatabaseError::NotFound`] for an unknown id.
    fn get(&self, id: CommentId) -> impl Future<Output = Result<Comment, DatabaseError>> + Send;

    /// One group per key, each newest first and at most `first + 1` long.
    ///
    /// Article keys match top-level comments only, parent keys match direct replies.
    ///
    /// # Errors
    /// [`DatabaseError::Query`] when the keys mix discriminants.
    fn get_many(
        &self,
        keys: &[LoadKey],
    ) -> impl Future<Output = Result<CommentBatch, DatabaseError>> + Send;

    /// Assigns the next comment id and stamps the creation time.
    ///
    /// Does not check the owning post; callers validate it first.
    fn insert(
        &self,
        comment: NewComment,
    ) -> impl Future<Output = Result<Comment, DatabaseError>> + Send;
}
