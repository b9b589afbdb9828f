//! Shared string constants (`OpenAPI` tags, SSE event names).

pub const SYSTEM_TAG: &str = "system";
pub const DISCUSSION_TAG: &str = "discussion";

/// SSE event name of a newly created comment.
pub const COMMENT_EVENT: &str = "comment";
