use crate::repository::{CommentRepository, PostRepository};
use crate::{DatabaseError, DatabaseErrorExt};
use chrono::{DateTime, Utc};
use parley_domain::models::{
    BatchRows, Comment, CommentBatch, CommentGroup, CommentId, KeyFailure, LoadKey, LoadTarget,
    NewComment, NewPost, Post, PostId, PostsQuery, uniform_discriminant,
};
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use surrealdb::types::SurrealValue;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = include_str!("schema.surql");

const POST_FIELDS: &str = "num, title, body, closed, created_at";
const COMMENT_FIELDS: &str = "num, body, article, parent, created_at";

#[derive(Debug, SurrealValue)]
struct PostRecord {
    num: i64,
    title: String,
    body: String,
    closed: bool,
    created_at: i64,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.num,
            title: record.title,
            text: record.body,
            closed: record.closed,
            created_at: from_millis(record.created_at),
        }
    }
}

#[derive(Debug, SurrealValue)]
struct CommentRecord {
    num: i64,
    body: String,
    article: i64,
    parent: Option<i64>,
    created_at: i64,
}

impl From<CommentRecord> for Comment {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.num,
            text: record.body,
            article_id: record.article,
            parent_id: record.parent,
            created_at: from_millis(record.created_at),
        }
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// One `SELECT` per key; statement `i` answers `keys[i]`.
fn batch_statements(keys: &[LoadKey]) -> String {
    let mut sql = String::new();
    for (i, key) in keys.iter().enumerate() {
        let filter = match key.target {
            LoadTarget::Article(_) => format!("article = $k{i} AND top_level = true"),
            LoadTarget::Parent(_) => format!("parent = $k{i}"),
        };
        let after = if key.after.is_some() { format!(" AND num < $a{i}") } else { String::new() };
        sql.push_str(&format!(
            "SELECT {COMMENT_FIELDS} FROM comment WHERE {filter}{after} ORDER BY num DESC LIMIT {};\n",
            key.overfetch(),
        ));
    }
    sql
}

/// `SurrealDB` storage over the `any` engine (`mem://`, `rocksdb://`, `ws://`, `http://`).
#[derive(Debug, Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Connects, waits for the engine to report healthy, signs in, activates the
    /// session and bootstraps the schema.
    ///
    /// # Errors
    /// * [`DatabaseError::Connection`] if the engine fails to start or remains unhealthy.
    /// * [`DatabaseError::Auth`] if the credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation or the schema bootstrap fails.
    #[instrument(skip(auth))]
    pub async fn connect(
        url: &str,
        ns: &str,
        db: &str,
        auth: Option<(String, String)>,
    ) -> Result<Self, DatabaseError> {
        let instance = connect(url).await.map_err(|e| DatabaseError::Connection {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        let mut delay = Duration::from_millis(500);
        for attempt in 1..=3 {
            if instance.health().await.is_ok() {
                break;
            }
            if attempt == 3 {
                return Err(DatabaseError::Connection {
                    message: "Unhealthy after retries".into(),
                    context: Some(url.to_owned().into()),
                });
            }
            warn!(attempt, ?delay, "Database not ready, retrying...");
            tokio::time::sleep(delay).await;
            delay *= 2;
        }

        if let Some((username, password)) = auth {
            instance.signin(Root { username, password }).await.map_err(|e| {
                DatabaseError::Auth {
                    message: e.to_string().into(),
                    context: Some(url.to_owned().into()),
                }
            })?;
        }

        instance.use_ns(ns).use_db(db).await.context("Activating session")?;

        let version =
            instance.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(namespace = %ns, database = %db, %version, "SurrealDB connection established");

        let store = Self { db: instance };
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<(), DatabaseError> {
        self.db
            .query(SCHEMA)
            .await
            .context("Bootstrapping schema")?
            .check()
            .map_err(surrealdb::Error::from)?;
        debug!("Schema is up to date");
        Ok(())
    }

    /// # Errors
    /// [`DatabaseError::Surreal`] when the engine does not answer.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.db.health().await.context("Health check")?;
        Ok(())
    }
}

impl PostRepository for SurrealStore {
    #[instrument(skip(self))]
    async fn get(&self, id: PostId) -> Result<Post, DatabaseError> {
        let records = self
            .db
            .query(format!("SELECT {POST_FIELDS} FROM post WHERE num = $num LIMIT 1"))
            .bind(("num", id))
            .await
            .context("Loading post")?
            .take::<Vec<PostRecord>>(0)
            .context("Parsing post")?;

        records
            .into_iter()
            .next()
            .map(Post::from)
            .ok_or_else(|| DatabaseError::not_found(format!("post {id}")))
    }

    #[instrument(skip(self))]
    async fn get_many(&self, query: PostsQuery) -> Result<Vec<Post>, DatabaseError> {
        let filter = if query.after.is_some() { "WHERE num < $after " } else { "" };
        let sql = format!(
            "SELECT {POST_FIELDS} FROM post {filter}ORDER BY num DESC LIMIT {}",
            query.first as usize + 1,
        );

        let mut request = self.db.query(sql);
        if let Some(after) = query.after {
            request = request.bind(("after", after));
        }
        let records = request
            .await
            .context("Listing posts")?
            .take::<Vec<PostRecord>>(0)
            .context("Parsing posts")?;

        if records.is_empty() {
            return Err(DatabaseError::not_found("no posts in range"));
        }
        Ok(records.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self, post))]
    async fn insert(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let record = self
            .db
            .query(format!(
                "CREATE ONLY post CONTENT {{
                    num: (UPSERT ONLY counter:post SET value = (value OR 0) + 1 RETURN VALUE value),
                    title: $title,
                    body: $body,
                    closed: $closed,
                    created_at: $created_at,
                }} RETURN {POST_FIELDS};"
            ))
            .bind(("title", post.title))
            .bind(("body", post.text))
            .bind(("closed", post.closed))
            .bind(("created_at", Utc::now().timestamp_millis()))
            .await
            .context("Creating post")?
            .take::<Option<PostRecord>>(0)
            .context("Parsing created post")?
            .ok_or(DatabaseError::Internal {
                message: "CREATE returned no record".into(),
                context: Some("Creating post".into()),
            })?;

        debug!(post_id = record.num, "Post stored");
        Ok(record.into())
    }
}

impl CommentRepository for SurrealStore {
    #[instrument(skip(self))]
    async fn get(&self, id: CommentId) -> Result<Comment, DatabaseError> {
        let records = self
            .db
            .query(format!("SELECT {COMMENT_FIELDS} FROM comment WHERE num = $num LIMIT 1"))
            .bind(("num", id))
            .await
            .context("Loading comment")?
            .take::<Vec<CommentRecord>>(0)
            .context("Parsing comment")?;

        records
            .into_iter()
            .next()
            .map(Comment::from)
            .ok_or_else(|| DatabaseError::not_found(format!("comment {id}")))
    }

    #[instrument(skip_all, fields(keys = keys.len()))]
    async fn get_many(&self, keys: &[LoadKey]) -> Result<CommentBatch, DatabaseError> {
        if uniform_discriminant(keys)?.is_none() {
            return Ok(CommentBatch::grouped(Vec::new()));
        }

        let mut request = self.db.query(batch_statements(keys));
        for (i, key) in keys.iter().enumerate() {
            request = request.bind((format!("k{i}"), key.target.id()));
            if let Some(after) = key.after {
                request = request.bind((format!("a{i}"), after));
            }
        }
        let mut response = request.await.context("Loading comment batch")?;

        let mut groups = Vec::with_capacity(keys.len());
        let mut failures = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            match response.take::<Vec<CommentRecord>>(i) {
                Ok(records) => groups.push(CommentGroup {
                    target: key.target,
                    items: records.into_iter().map(Comment::from).collect(),
                }),
                Err(err) => {
                    warn!(target_key = %key.target, error = %err, "Batch statement failed");
                    failures.push(KeyFailure { target: key.target, reason: err.to_string() });
                },
            }
        }

        Ok(CommentBatch { rows: BatchRows::Grouped(groups), failures })
    }

    #[instrument(skip(self, comment), fields(post_id = comment.article_id))]
    async fn insert(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        let record = self
            .db
            .query(format!(
                "CREATE ONLY comment CONTENT {{
                    num: (UPSERT ONLY counter:comment SET value = (value OR 0) + 1 RETURN VALUE value),
                    body: $body,
                    article: $article,
                    parent: $parent,
                    top_level: $top_level,
                    created_at: $created_at,
                }} RETURN {COMMENT_FIELDS};"
            ))
            .bind(("body", comment.text))
            .bind(("article", comment.article_id))
            .bind(("parent", comment.parent_id))
            .bind(("top_level", comment.parent_id.is_none()))
            .bind(("created_at", Utc::now().timestamp_millis()))
            .await
            .context("Creating comment")?
            .take::<Option<CommentRecord>>(0)
            .context("Parsing created comment")?
            .ok_or(DatabaseError::Internal {
                message: "CREATE returned no record".into(),
                context: Some("Creating comment".into()),
            })?;

        debug!(comment_id = record.num, "Comment stored");
        Ok(record.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_statements_follow_key_order() {
        let keys = [LoadKey::parent(101, 2).after(Some(150)), LoadKey::parent(102, 0)];
        let sql = batch_statements(&keys);
        let lines: Vec<&str> = sql.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("parent = $k0 AND num < $a0"));
        assert!(lines[0].ends_with("LIMIT 3;"));
        assert!(lines[1].contains("parent = $k1 ORDER BY"));
        assert!(lines[1].ends_with("LIMIT 1;"));
    }

    #[test]
    fn article_statements_select_top_level_only() {
        let sql = batch_statements(&[LoadKey::article(10, 5)]);
        assert!(sql.contains("article = $k0 AND top_level = true"));
    }
}
