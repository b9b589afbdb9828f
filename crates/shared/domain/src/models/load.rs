use super::comment::CommentId;
use super::post::PostId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a comment lookup is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum LoadTarget {
    /// Top-level comments of a post.
    Article(PostId),
    /// Direct replies to a comment.
    Parent(CommentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discriminant {
    Article,
    Parent,
}

impl LoadTarget {
    #[must_use]
    pub const fn discriminant(&self) -> Discriminant {
        match self {
            Self::Article(_) => Discriminant::Article,
            Self::Parent(_) => Discriminant::Parent,
        }
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Article(id) | Self::Parent(id) => *id,
        }
    }
}

impl fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Article(id) => write!(f, "article:{id}"),
            Self::Parent(id) => write!(f, "parent:{id}"),
        }
    }
}

/// One logical comment lookup plus its keyset window.
///
/// `after` is an exclusive upper bound: only ids strictly below it qualify.
/// Storage returns at most `first + 1` items so the extra one signals a next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadKey {
    pub target: LoadTarget,
    pub after: Option<i64>,
    pub first: u32,
}

impl LoadKey {
    #[must_use]
    pub const fn article(post_id: PostId, first: u32) -> Self {
        Self { target: LoadTarget::Article(post_id), after: None, first }
    }

    #[must_use]
    pub const fn parent(comment_id: CommentId, first: u32) -> Self {
        Self { target: LoadTarget::Parent(comment_id), after: None, first }
    }

    #[must_use]
    pub const fn after(mut self, after: Option<i64>) -> Self {
        self.after = after;
        self
    }

    #[must_use]
    pub const fn discriminant(&self) -> Discriminant {
        self.target.discriminant()
    }

    /// Number of rows storage should return for this key (page size plus sentinel).
    #[must_use]
    pub const fn overfetch(&self) -> usize {
        self.first as usize + 1
    }

    /// Whether `id` falls inside the keyset window.
    #[must_use]
    pub fn admits(&self, id: i64) -> bool {
        self.after.is_none_or(|after| id < after)
    }
}
