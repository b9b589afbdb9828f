use super::page::Cursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PostId = i64;

/// A discussion thread root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub text: String,
    /// Closed posts reject new comments.
    pub closed: bool,
    /// Unix seconds on the wire.
    #[serde(with = "chrono::serde::ts_seconds")]
    #[cfg_attr(feature = "server", schema(value_type = i64))]
    pub created_at: DateTime<Utc>,
}

impl Cursor for Post {
    fn cursor(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub closed: bool,
}

/// Direct post listing, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::IntoParams))]
pub struct PostsQuery {
    pub first: u32,
    /// Exclusive upper bound on the post id.
    pub after: Option<PostId>,
}
