use super::load::{Discriminant, LoadKey, LoadTarget};
use super::page::Cursor;
use super::post::PostId;
use crate::config::PaginationConfig;
use crate::error::QueryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CommentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    /// Owning post.
    pub article_id: PostId,
    /// Set iff this comment replies to another comment.
    pub parent_id: Option<CommentId>,
    #[serde(with = "chrono::serde::ts_seconds")]
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// The group this comment belongs to when listed under `discriminant`.
    ///
    /// Replies never belong to an article group, top-level comments never
    /// belong to a parent group.
    #[must_use]
    pub const fn group(&self, discriminant: Discriminant) -> Option<LoadTarget> {
        match (discriminant, self.parent_id) {
            (Discriminant::Article, None) => Some(LoadTarget::Article(self.article_id)),
            (Discriminant::Parent, Some(parent)) => Some(LoadTarget::Parent(parent)),
            _ => None,
        }
    }
}

impl Cursor for Comment {
    fn cursor(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub text: String,
    pub article_id: PostId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

/// Wire form of a comment lookup. Exactly one of `post_id` and `parent_id`
/// must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams))]
pub struct CommentsQuery {
    pub post_id: Option<PostId>,
    pub parent_id: Option<CommentId>,
    pub first: u32,
    pub after: Option<CommentId>,
}

impl CommentsQuery {
    /// Validates the query against `limits` and produces its load key.
    ///
    /// # Errors
    /// Fails when neither or both targets are set, or `first` exceeds `limits.max_first`.
    pub fn into_key(self, limits: &PaginationConfig) -> Result<LoadKey, QueryError> {
        let target = match (self.post_id, self.parent_id) {
            (Some(post_id), None) => LoadTarget::Article(post_id),
            (None, Some(parent_id)) => LoadTarget::Parent(parent_id),
            (None, None) => return Err(QueryError::MissingTarget { context: None }),
            (Some(_), Some(_)) => return Err(QueryError::AmbiguousTarget { context: None }),
        };
        if self.first > limits.max_first {
            return Err(QueryError::FirstOutOfRange {
                first: self.first,
                max: limits.max_first,
                context: None,
            });
        }
        Ok(LoadKey { target, after: self.after, first: self.first })
    }
}

impl TryFrom<CommentsQuery> for LoadKey {
    type Error = QueryError;

    fn try_from(query: CommentsQuery) -> Result<Self, Self::Error> {
        query.into_key(&PaginationConfig::default())
    }
}
