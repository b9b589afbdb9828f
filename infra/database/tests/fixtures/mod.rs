use parley_database::{CommentRepository, Database, PostRepository};
use parley_domain::models::{Comment, NewComment, NewPost, Post};

/// Both backends, each freshly initialized and empty.
pub async fn backends() -> Vec<Database> {
    let memory = Database::builder().memory().init().await.expect("memory backend");
    let surreal = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");
    vec![memory, surreal]
}

pub async fn post(db: &Database, title: &str, closed: bool) -> Post {
    PostRepository::insert(db, NewPost { title: title.into(), text: format!("{title} body"), closed })
        .await
        .expect("insert post")
}

pub async fn comment(db: &Database, article_id: i64, parent_id: Option<i64>) -> Comment {
    CommentRepository::insert(
        db,
        NewComment { text: "reply".into(), article_id, parent_id },
    )
    .await
    .expect("insert comment")
}

pub fn ids<'a>(items: impl IntoIterator<Item = &'a Comment>) -> Vec<i64> {
    items.into_iter().map(|c| c.id).collect()
}
