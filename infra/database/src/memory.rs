use crate::repository::{CommentRepository, PostRepository};
use crate::DatabaseError;
use chrono::Utc;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use parley_domain::models::{
    Comment, CommentBatch, CommentId, LoadKey, LoadTarget, NewComment, NewPost, Post, PostId,
    PostsQuery, uniform_discriminant,
};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct MemoryState {
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    /// Top-level comments per post.
    by_article: FxHashMap<PostId, BTreeSet<CommentId>>,
    /// Direct replies per comment.
    by_parent: FxHashMap<CommentId, BTreeSet<CommentId>>,
    last_post: PostId,
    last_comment: CommentId,
}

impl MemoryState {
    fn index(&self, target: LoadTarget) -> Option<&BTreeSet<CommentId>> {
        match target {
            LoadTarget::Article(id) => self.by_article.get(&id),
            LoadTarget::Parent(id) => self.by_parent.get(&id),
        }
    }
}

/// Process-local storage.
///
/// Batched lookups come back as one flat stream, each key's rows contiguous and
/// newest first, the same shape a windowed SQL query would produce.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ids strictly below `after`, newest first.
fn below(ids: &BTreeSet<i64>, after: Option<i64>) -> impl Iterator<Item = &i64> {
    let upper = after.map_or(Bound::Unbounded, Bound::Excluded);
    ids.range((Bound::Unbounded, upper)).rev()
}

impl PostRepository for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, id: PostId) -> Result<Post, DatabaseError> {
        self.state
            .read()
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("post {id}")))
    }

    #[instrument(skip(self))]
    async fn get_many(&self, query: PostsQuery) -> Result<Vec<Post>, DatabaseError> {
        let upper = query.after.map_or(Bound::Unbounded, Bound::Excluded);
        let posts: Vec<Post> = self
            .state
            .read()
            .posts
            .range((Bound::Unbounded, upper))
            .rev()
            .take(query.first as usize + 1)
            .map(|(_, post)| post.clone())
            .collect();

        if posts.is_empty() {
            return Err(DatabaseError::not_found("no posts in range"));
        }
        Ok(posts)
    }

    #[instrument(skip(self, post))]
    async fn insert(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let mut state = self.state.write();
        state.last_post += 1;
        let post = Post {
            id: state.last_post,
            title: post.title,
            text: post.text,
            closed: post.closed,
            created_at: Utc::now(),
        };
        state.posts.insert(post.id, post.clone());
        debug!(post_id = post.id, "Post stored");
        Ok(post)
    }
}

impl CommentRepository for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, id: CommentId) -> Result<Comment, DatabaseError> {
        self.state
            .read()
            .comments
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("comment {id}")))
    }

    #[instrument(skip_all, fields(keys = keys.len()))]
    async fn get_many(&self, keys: &[LoadKey]) -> Result<CommentBatch, DatabaseError> {
        uniform_discriminant(keys)?;

        let state = self.state.read();
        let mut rows = Vec::new();
        for key in keys {
            let Some(ids) = state.index(key.target) else { continue };
            rows.extend(
                below(ids, key.after)
                    .take(key.overfetch())
                    .filter_map(|id| state.comments.get(id))
                    .cloned(),
            );
        }
        Ok(CommentBatch::flat(rows))
    }

    #[instrument(skip(self, comment), fields(post_id = comment.article_id))]
    async fn insert(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        let mut state = self.state.write();
        state.last_comment += 1;
        let comment = Comment {
            id: state.last_comment,
            text: comment.text,
            article_id: comment.article_id,
            parent_id: comment.parent_id,
            created_at: Utc::now(),
        };

        let index = match comment.parent_id {
            Some(parent) => state.by_parent.entry(parent).or_default(),
            None => state.by_article.entry(comment.article_id).or_default(),
        };
        index.insert(comment.id);
        state.comments.insert(comment.id, comment.clone());
        debug!(comment_id = comment.id, "Comment stored");
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_is_exclusive_and_descending() {
        let ids: BTreeSet<i64> = [1, 3, 5, 7].into_iter().collect();
        assert_eq!(below(&ids, None).copied().collect::<Vec<_>>(), vec![7, 5, 3, 1]);
        assert_eq!(below(&ids, Some(5)).copied().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(below(&ids, Some(1)).count(), 0);
    }
}
