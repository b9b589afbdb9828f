use parley_domain::QueryError;
use parley_domain::config::PaginationConfig;
use parley_domain::models::{Comment, CommentId, Cursor, Page, PostId};
use serde::{Deserialize, Serialize};

/// Reply levels resolved below top-level comments when none is requested.
pub const DEFAULT_DEPTH: u32 = 3;
/// Deepest tree a single request may ask for.
pub const MAX_DEPTH: u32 = 8;

/// A comment together with (a page of) its replies.
///
/// `replies` is absent at the depth limit and for comments without replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "server", schema(no_recursion))]
    pub replies: Option<Page<Thread>>,
}

impl Thread {
    #[must_use]
    pub const fn leaf(comment: Comment) -> Self {
        Self { comment, replies: None }
    }

    /// Ids of this node and all loaded descendants, depth first.
    #[must_use]
    pub fn ids(&self) -> Vec<CommentId> {
        let mut ids = vec![self.comment.id];
        if let Some(replies) = &self.replies {
            ids.extend(replies.nodes().flat_map(Self::ids));
        }
        ids
    }
}

impl Cursor for Thread {
    fn cursor(&self) -> i64 {
        self.comment.id
    }
}

/// A validated tree request rooted at one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadQuery {
    pub post_id: PostId,
    /// Page size of top-level comments.
    pub first: u32,
    pub after: Option<CommentId>,
    /// Reply levels to resolve below the top level.
    pub depth: u32,
    /// Page size of every reply list.
    pub replies_first: u32,
}

impl ThreadQuery {
    /// Fills defaults from `limits` and checks every bound.
    ///
    /// # Errors
    /// [`QueryError::FirstOutOfRange`] when either page size exceeds the limit.
    /// A `depth` above [`MAX_DEPTH`] is clamped.
    pub fn new(
        post_id: PostId,
        first: Option<u32>,
        after: Option<CommentId>,
        depth: Option<u32>,
        replies_first: Option<u32>,
        limits: &PaginationConfig,
    ) -> Result<Self, QueryError> {
        let check = |first: Option<u32>| {
            let first = first.unwrap_or(limits.default_first);
            if first > limits.max_first {
                return Err(QueryError::FirstOutOfRange {
                    first,
                    max: limits.max_first,
                    context: None,
                });
            }
            Ok(first)
        };

        Ok(Self {
            post_id,
            first: check(first)?,
            after,
            depth: depth.unwrap_or(DEFAULT_DEPTH).min(MAX_DEPTH),
            replies_first: check(replies_first)?,
        })
    }
}
