use crate::error::DiscussionError;
use crate::fetcher::CommentFetcher;
use crate::thread::{Thread, ThreadQuery};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parley_database::{CommentRepository, Database, DatabaseError, PostRepository};
use parley_domain::QueryError;
use parley_domain::config::{ApiConfig, LoaderConfig, PaginationConfig};
use parley_domain::models::{
    Comment, CommentId, CommentsQuery, Edge, LoadKey, NewComment, NewPost, Page, Post, PostId,
    PostsQuery,
};
use parley_events::{Subscription, SubscriptionRegistry};
use parley_loader::{Coalescer, demultiplex, paginate};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument};

/// The request-scoped comment loader.
pub type Loader = Coalescer<CommentFetcher>;

/// One request's loader, cancelled when the scope is dropped.
#[derive(Debug)]
pub struct RequestScope {
    loader: Loader,
    _guard: DropGuard,
}

impl RequestScope {
    #[must_use]
    pub const fn loader(&self) -> &Loader {
        &self.loader
    }
}

/// Discussion operations over storage, the loader and live subscriptions.
#[derive(Debug, Clone)]
pub struct DiscussionService {
    database: Database,
    subscriptions: SubscriptionRegistry,
    loader: LoaderConfig,
    pagination: PaginationConfig,
}

impl DiscussionService {
    #[must_use]
    pub fn new(database: Database, subscriptions: SubscriptionRegistry, config: &ApiConfig) -> Self {
        Self { database, subscriptions, loader: config.loader, pagination: config.pagination }
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    #[must_use]
    pub const fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    #[must_use]
    pub const fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// A loader cancelled together with `scope`.
    #[must_use]
    pub fn loader(&self, scope: &CancellationToken) -> Loader {
        Coalescer::with_parent(CommentFetcher::new(self.database.clone()), self.loader, scope)
    }

    /// A loader that lives exactly as long as the returned scope.
    #[must_use]
    pub fn scope(&self) -> RequestScope {
        let token = CancellationToken::new();
        RequestScope { loader: self.loader(&token), _guard: token.drop_guard() }
    }

    /// `first`, or the configured default.
    #[must_use]
    pub fn first_or_default(&self, first: Option<u32>) -> u32 {
        first.unwrap_or(self.pagination.default_first)
    }

    fn check_first(&self, first: u32) -> Result<u32, QueryError> {
        if first > self.pagination.max_first {
            return Err(QueryError::FirstOutOfRange {
                first,
                max: self.pagination.max_first,
                context: None,
            });
        }
        Ok(first)
    }

    /// Posts newest first.
    ///
    /// # Errors
    /// [`DiscussionError::NotFound`] when the window is empty.
    #[instrument(skip(self))]
    pub async fn posts(&self, query: PostsQuery) -> Result<Page<Post>, DiscussionError> {
        self.check_first(query.first)?;
        let posts = PostRepository::get_many(&self.database, query).await?;
        paginate(posts, query.first).ok_or_else(|| DiscussionError::not_found("no posts found"))
    }

    /// # Errors
    /// [`DiscussionError::Database`] with a not-found source for an unknown id.
    pub async fn post(&self, id: PostId) -> Result<Post, DiscussionError> {
        Ok(PostRepository::get(&self.database, id).await?)
    }

    /// # Errors
    /// [`DiscussionError::Database`] with a not-found source for an unknown id.
    pub async fn comment(&self, id: CommentId) -> Result<Comment, DiscussionError> {
        Ok(CommentRepository::get(&self.database, id).await?)
    }

    /// One comment listing straight from storage, bypassing the loader.
    ///
    /// # Errors
    /// [`DiscussionError::Query`] for an invalid query, not-found for an empty window.
    #[instrument(skip(self))]
    pub async fn comments(&self, query: CommentsQuery) -> Result<Page<Comment>, DiscussionError> {
        let key = query.into_key(&self.pagination)?;
        let keys = [key];
        let batch = CommentRepository::get_many(&self.database, &keys).await?;

        let slot = demultiplex(&keys, batch)
            .map_err(|e| DiscussionError::Internal {
                message: e.to_string().into(),
                context: Some("Storage returned a malformed batch".into()),
            })?
            .pop()
            .ok_or(DiscussionError::Internal { message: "empty slot list".into(), context: None })?;

        paginate(slot?, key.first).ok_or_else(|| {
            DiscussionError::not_found(format!("no comments found for {}", key.target))
        })
    }

    /// One comment listing through the batching loader.
    ///
    /// # Errors
    /// [`DiscussionError::Query`] when `first` is above the limit, otherwise the
    /// loader's outcome for this key.
    pub async fn load(
        &self,
        loader: &Loader,
        key: LoadKey,
    ) -> Result<Page<Comment>, DiscussionError> {
        self.check_first(key.first)?;
        Ok(loader.load_page(key).await?)
    }

    /// Direct replies of `comment_id` through the loader.
    ///
    /// # Errors
    /// As [`DiscussionService::load`].
    pub async fn replies(
        &self,
        loader: &Loader,
        comment_id: CommentId,
        first: u32,
        after: Option<CommentId>,
    ) -> Result<Page<Comment>, DiscussionError> {
        self.load(loader, LoadKey::parent(comment_id, first).after(after)).await
    }

    /// Top-level comments of a post with replies resolved `query.depth` levels deep.
    ///
    /// Every level is requested concurrently, so the loader fetches each level
    /// of the tree in one batch.
    ///
    /// # Errors
    /// Not-found when the post has no top-level comments in the window; any
    /// fetch failure aborts the whole tree.
    #[instrument(skip(self, loader), fields(post_id = query.post_id))]
    pub async fn thread(
        &self,
        loader: &Loader,
        query: ThreadQuery,
    ) -> Result<Page<Thread>, DiscussionError> {
        let key = LoadKey::article(query.post_id, query.first).after(query.after);
        let top = self.load(loader, key).await?;
        self.expand(loader, top, query.depth, query.replies_first).await
    }

    fn expand<'a>(
        &'a self,
        loader: &'a Loader,
        page: Page<Comment>,
        depth: u32,
        first: u32,
    ) -> BoxFuture<'a, Result<Page<Thread>, DiscussionError>> {
        async move {
            if depth == 0 {
                return Ok(page.map(Thread::leaf));
            }

            let ids: Vec<CommentId> = page.nodes().map(|comment| comment.id).collect();
            let replies =
                join_all(ids.into_iter().map(|id| self.subtree(loader, id, depth - 1, first))).await;

            let Page { edges, page_info } = page;
            let edges = edges
                .into_iter()
                .zip(replies)
                .map(|(edge, replies)| {
                    let node = Thread { comment: edge.node, replies: replies? };
                    Ok(Edge { cursor: edge.cursor, node })
                })
                .collect::<Result<Vec<_>, DiscussionError>>()?;

            Ok(Page { edges, page_info })
        }
        .boxed()
    }

    async fn subtree(
        &self,
        loader: &Loader,
        id: CommentId,
        depth: u32,
        first: u32,
    ) -> Result<Option<Page<Thread>>, DiscussionError> {
        match loader.load_page(LoadKey::parent(id, first)).await {
            Ok(page) => self.expand(loader, page, depth, first).await.map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// # Errors
    /// [`DiscussionError::Validation`] for a blank title or text.
    #[instrument(skip_all)]
    pub async fn create_post(&self, post: NewPost) -> Result<Post, DiscussionError> {
        if post.title.trim().is_empty() || post.text.trim().is_empty() {
            return Err(DiscussionError::validation("post title and text must not be empty"));
        }
        let post = PostRepository::insert(&self.database, post).await?;
        info!(post_id = post.id, closed = post.closed, "Post created");
        Ok(post)
    }

    /// Stores a comment and notifies the post's live subscribers before returning.
    ///
    /// # Errors
    /// * [`DiscussionError::Validation`] for blank text, an unknown post, or a
    ///   parent that does not exist on the same post.
    /// * [`DiscussionError::PostClosed`] when the post is closed.
    #[instrument(skip_all, fields(post_id = comment.article_id, parent_id = comment.parent_id))]
    pub async fn create_comment(&self, comment: NewComment) -> Result<Comment, DiscussionError> {
        if comment.text.trim().is_empty() {
            return Err(DiscussionError::validation("comment text must not be empty"));
        }

        let post = PostRepository::get(&self.database, comment.article_id).await.map_err(|e| {
            missing_as_validation(e, "couldn't get required post with provided id")
        })?;
        if post.closed {
            let context = Some(format!("post {}", post.id).into());
            return Err(DiscussionError::PostClosed { context });
        }

        if let Some(parent_id) = comment.parent_id {
            let parent = CommentRepository::get(&self.database, parent_id).await.map_err(|e| {
                missing_as_validation(e, "couldn't get parent comment with provided id")
            })?;
            if parent.article_id != post.id {
                return Err(DiscussionError::validation("parent comment belongs to another post"));
            }
        }

        let comment = CommentRepository::insert(&self.database, comment).await?;
        let delivered = self.subscriptions.publish(&comment);
        debug!(comment_id = comment.id, delivered, "Comment created");
        Ok(comment)
    }

    /// Registers a live subscription for new comments on `post_id`, removed when
    /// `ctx` is cancelled or the subscription is dropped.
    ///
    /// # Errors
    /// Not-found for an unknown post, [`DiscussionError::Subscription`] after shutdown.
    pub async fn subscribe(
        &self,
        post_id: PostId,
        ctx: &CancellationToken,
    ) -> Result<Subscription, DiscussionError> {
        let post = self.post(post_id).await?;
        Ok(self.subscriptions.subscribe(post.id, ctx)?)
    }
}

fn missing_as_validation(err: DatabaseError, message: &'static str) -> DiscussionError {
    if err.is_not_found() { DiscussionError::validation(message) } else { err.into() }
}
