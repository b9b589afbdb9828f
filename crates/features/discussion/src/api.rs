//! HTTP surface of the discussion slice.

use crate::error::{DiscussionError, ErrorBody};
use crate::thread::{Thread, ThreadQuery};
use crate::Discussion;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, stream};
use parley_derive::{api_handler, api_model};
use parley_domain::constants::{COMMENT_EVENT, DISCUSSION_TAG};
use parley_domain::models::{
    Comment, CommentId, CommentsQuery, NewComment, NewPost, Page, Post, PostId, PostsQuery,
};
use parley_kernel::server::ApiState;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Keyset window of a listing.
#[api_model(rename_all = "snake_case")]
#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page size, defaults to `pagination.default_first`
    pub first: Option<u32>,
    /// Exclusive upper bound on the id, usually the previous page's `endCursor`
    pub after: Option<i64>,
}

#[api_model(rename_all = "snake_case")]
#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThreadParams {
    pub first: Option<u32>,
    pub after: Option<CommentId>,
    /// Reply levels to resolve, default 3, at most 8
    pub depth: Option<u32>,
    /// Page size of every reply list
    pub replies_first: Option<u32>,
}

/// Exactly one of `post_id` and `parent_id` selects the listing.
#[api_model(rename_all = "snake_case")]
#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommentsParams {
    pub post_id: Option<PostId>,
    pub parent_id: Option<CommentId>,
    pub first: Option<u32>,
    pub after: Option<CommentId>,
}

fn discussion(state: &ApiState) -> Result<&Discussion, DiscussionError> {
    state.try_get_slice::<Discussion>().map_err(|e| DiscussionError::Internal {
        message: e.to_string().into(),
        context: Some("Discussion slice is not registered".into()),
    })
}

#[api_handler(
    get,
    path = "/posts",
    params(PageParams),
    responses(
        (status = OK, description = "Posts, newest first", body = Page<Post>),
        (status = BAD_REQUEST, description = "Page size above the limit", body = ErrorBody),
        (status = NOT_FOUND, description = "Empty window", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn list_posts(
    State(state): State<ApiState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Post>>, DiscussionError> {
    let service = &discussion(&state)?.service;
    let query = PostsQuery { first: service.first_or_default(params.first), after: params.after };
    Ok(Json(service.posts(query).await?))
}

#[api_handler(
    post,
    path = "/posts",
    request_body = NewPost,
    responses(
        (status = CREATED, description = "Post stored", body = Post),
        (status = BAD_REQUEST, description = "Blank title or text", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn create_post(
    State(state): State<ApiState>,
    Json(post): Json<NewPost>,
) -> Result<impl IntoResponse, DiscussionError> {
    let post = discussion(&state)?.service.create_post(post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[api_handler(
    get,
    path = "/posts/{id}",
    params(("id" = PostId, Path, description = "Post id")),
    responses(
        (status = OK, body = Post),
        (status = NOT_FOUND, description = "Unknown post", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn get_post(
    State(state): State<ApiState>,
    Path(id): Path<PostId>,
) -> Result<Json<Post>, DiscussionError> {
    Ok(Json(discussion(&state)?.service.post(id).await?))
}

#[api_handler(
    get,
    path = "/posts/{id}/comments",
    params(("id" = PostId, Path, description = "Post id"), ThreadParams),
    responses(
        (status = OK, description = "Top-level comments with nested replies", body = Page<Thread>),
        (status = BAD_REQUEST, description = "Page size above the limit", body = ErrorBody),
        (status = NOT_FOUND, description = "No top-level comments in the window", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn post_thread(
    State(state): State<ApiState>,
    Path(post_id): Path<PostId>,
    Query(params): Query<ThreadParams>,
) -> Result<Json<Page<Thread>>, DiscussionError> {
    let service = &discussion(&state)?.service;
    let query = ThreadQuery::new(
        post_id,
        params.first,
        params.after,
        params.depth,
        params.replies_first,
        service.pagination(),
    )?;

    let scope = service.scope();
    let thread = service.thread(scope.loader(), query).await?;
    Ok(Json(thread))
}

#[api_handler(
    get,
    path = "/posts/{id}/subscribe",
    params(("id" = PostId, Path, description = "Post id")),
    responses(
        (status = OK, description = "One `comment` event per new comment", content_type = "text/event-stream", body = Comment),
        (status = NOT_FOUND, description = "Unknown post", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Server is shutting down", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn subscribe(
    State(state): State<ApiState>,
    Path(post_id): Path<PostId>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, DiscussionError> {
    let scope = CancellationToken::new();
    let subscription = discussion(&state)?.service.subscribe(post_id, &scope).await?;
    debug!(post_id, subscription = subscription.id(), "Live stream opened");

    // The guard cancels the subscription once the client goes away and the stream is dropped.
    let guard = scope.drop_guard();
    let events = stream::unfold((subscription, guard), |(mut subscription, guard)| async move {
        let comment = subscription.recv().await?;
        let event = Event::default()
            .event(COMMENT_EVENT)
            .id(comment.id.to_string())
            .json_data(&*comment);
        Some((event, (subscription, guard)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[api_handler(
    get,
    path = "/comments",
    params(CommentsParams),
    responses(
        (status = OK, description = "Comments, newest first", body = Page<Comment>),
        (status = BAD_REQUEST, description = "Neither or both targets, or page size above the limit", body = ErrorBody),
        (status = NOT_FOUND, description = "Empty window", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn list_comments(
    State(state): State<ApiState>,
    Query(params): Query<CommentsParams>,
) -> Result<Json<Page<Comment>>, DiscussionError> {
    let service = &discussion(&state)?.service;
    let query = CommentsQuery {
        post_id: params.post_id,
        parent_id: params.parent_id,
        first: service.first_or_default(params.first),
        after: params.after,
    };
    Ok(Json(service.comments(query).await?))
}

#[api_handler(
    post,
    path = "/comments",
    request_body = NewComment,
    responses(
        (status = CREATED, description = "Comment stored and published", body = Comment),
        (status = BAD_REQUEST, description = "Blank text, unknown post or parent", body = ErrorBody),
        (status = FORBIDDEN, description = "Post closed to add comments", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn create_comment(
    State(state): State<ApiState>,
    Json(comment): Json<NewComment>,
) -> Result<impl IntoResponse, DiscussionError> {
    let comment = discussion(&state)?.service.create_comment(comment).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[api_handler(
    get,
    path = "/comments/{id}",
    params(("id" = CommentId, Path, description = "Comment id")),
    responses(
        (status = OK, body = Comment),
        (status = NOT_FOUND, description = "Unknown comment", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn get_comment(
    State(state): State<ApiState>,
    Path(id): Path<CommentId>,
) -> Result<Json<Comment>, DiscussionError> {
    Ok(Json(discussion(&state)?.service.comment(id).await?))
}

#[api_handler(
    get,
    path = "/comments/{id}/replies",
    params(("id" = CommentId, Path, description = "Parent comment id"), PageParams),
    responses(
        (status = OK, description = "Direct replies, newest first", body = Page<Comment>),
        (status = BAD_REQUEST, description = "Page size above the limit", body = ErrorBody),
        (status = NOT_FOUND, description = "No replies in the window", body = ErrorBody),
    ),
    tag = DISCUSSION_TAG,
)]
async fn comment_replies(
    State(state): State<ApiState>,
    Path(id): Path<CommentId>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Comment>>, DiscussionError> {
    let service = &discussion(&state)?.service;
    let scope = service.scope();
    let first = service.first_or_default(params.first);
    Ok(Json(service.replies(scope.loader(), id, first, params.after).await?))
}

/// Every discussion route, merged into the server's `OpenApiRouter`.
pub fn discussion_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(list_posts, create_post))
        .routes(routes!(get_post))
        .routes(routes!(post_thread))
        .routes(routes!(subscribe))
        .routes(routes!(list_comments, create_comment))
        .routes(routes!(get_comment))
        .routes(routes!(comment_replies))
}
