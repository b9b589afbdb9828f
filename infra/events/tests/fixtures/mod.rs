#![allow(dead_code, unreachable_pub)]

use chrono::Utc;
use parley_domain::models::Comment;
use parley_events::SubscriptionRegistry;
use std::time::Duration;

#[must_use]
pub fn comment(id: i64, article_id: i64) -> Comment {
    Comment { id, text: format!("comment {id}"), article_id, parent_id: None, created_at: Utc::now() }
}

/// Waits until background cleanup brings `post_id` down to `expected` subscribers.
///
/// # Panics
/// If cleanup does not happen within a second.
pub async fn wait_for_count(registry: &SubscriptionRegistry, post_id: i64, expected: usize) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while registry.subscriber_count(post_id) != expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("subscriber cleanup timed out");
}
