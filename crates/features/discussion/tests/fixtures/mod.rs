#![allow(dead_code)]

use parley_database::Database;
use parley_discussion::DiscussionService;
use parley_domain::config::ApiConfig;
use parley_domain::models::{Comment, CommentId, NewComment, NewPost, Page, Post, PostId};
use parley_events::SubscriptionRegistry;

/// A service over a fresh in-memory store.
pub async fn service() -> DiscussionService {
    service_with(ApiConfig::default()).await
}

pub async fn service_with(config: ApiConfig) -> DiscussionService {
    let database = Database::builder().memory().init().await.expect("memory backend");
    let subscriptions = SubscriptionRegistry::new(config.subscriptions).expect("registry");
    DiscussionService::new(database, subscriptions, &config)
}

pub async fn post(service: &DiscussionService, title: &str, closed: bool) -> Post {
    service
        .create_post(NewPost { title: title.into(), text: format!("{title} body"), closed })
        .await
        .expect("create post")
}

pub async fn comment(
    service: &DiscussionService,
    article_id: PostId,
    parent_id: Option<CommentId>,
) -> Comment {
    service
        .create_comment(NewComment { text: "reply".into(), article_id, parent_id })
        .await
        .expect("create comment")
}

/// Post with top-level comments `c1 < c2 < c3` and `r` replying to `c1`.
pub struct Discussion {
    pub post: Post,
    pub c1: Comment,
    pub c2: Comment,
    pub c3: Comment,
    pub r: Comment,
}

pub async fn discussion(service: &DiscussionService) -> Discussion {
    let post = post(service, "first", false).await;
    let c1 = comment(service, post.id, None).await;
    let c2 = comment(service, post.id, None).await;
    let c3 = comment(service, post.id, None).await;
    let r = comment(service, post.id, Some(c1.id)).await;
    Discussion { post, c1, c2, c3, r }
}

pub fn ids<T: parley_domain::models::Cursor>(page: &Page<T>) -> Vec<i64> {
    page.nodes().map(parley_domain::models::Cursor::cursor).collect()
}
