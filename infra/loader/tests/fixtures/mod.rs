#![allow(dead_code, unreachable_pub)]

use chrono::Utc;
use parking_lot::Mutex;
use parley_domain::models::{BatchRequest, Comment, CommentBatch, CommentGroup, LoadKey};
use parley_loader::BatchFetcher;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
#[error("storage offline")]
pub struct Offline;

#[must_use]
pub fn comment(id: i64, article_id: i64, parent_id: Option<i64>) -> Comment {
    Comment { id, text: format!("comment {id}"), article_id, parent_id, created_at: Utc::now() }
}

/// Post 10 with top-level comments 101..=103 and reply 104 under 101.
#[must_use]
pub fn thread() -> Vec<Comment> {
    vec![
        comment(101, 10, None),
        comment(102, 10, None),
        comment(103, 10, None),
        comment(104, 10, Some(101)),
    ]
}

/// In-memory fetcher that records every request it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingFetcher {
    pub comments: Arc<Vec<Comment>>,
    pub requests: Arc<Mutex<Vec<BatchRequest>>>,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl RecordingFetcher {
    #[must_use]
    pub fn new(comments: Vec<Comment>) -> Self {
        Self { comments: Arc::new(comments), ..Self::default() }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().clone()
    }

    fn group(&self, key: &LoadKey) -> Vec<Comment> {
        let mut items: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.group(key.discriminant()) == Some(key.target) && key.admits(c.id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.id.cmp(&a.id));
        items.truncate(key.overfetch());
        items
    }
}

impl BatchFetcher for RecordingFetcher {
    type Error = Offline;

    async fn fetch(&self, request: &BatchRequest) -> Result<CommentBatch, Self::Error> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Offline);
        }
        Ok(CommentBatch::grouped(
            request
                .iter()
                .map(|key| CommentGroup { target: key.target, items: self.group(key) })
                .collect(),
        ))
    }
}

/// Never answers; used to observe cancellation.
#[derive(Debug, Clone, Copy)]
pub struct StalledFetcher;

impl BatchFetcher for StalledFetcher {
    type Error = Offline;

    async fn fetch(&self, _request: &BatchRequest) -> Result<CommentBatch, Self::Error> {
        std::future::pending().await
    }
}
