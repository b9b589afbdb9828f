pub mod fixtures;

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use parley_database::*;
    use parley_domain::models::{BatchRows, Comment, LoadKey, LoadTarget, PostsQuery};
    use std::collections::HashMap;

    fn by_target(rows: BatchRows) -> HashMap<LoadTarget, Vec<i64>> {
        let mut groups: HashMap<LoadTarget, Vec<i64>> = HashMap::new();
        match rows {
            BatchRows::Grouped(list) => {
                for group in list {
                    groups.entry(group.target).or_default().extend(ids(&group.items));
                }
            },
            BatchRows::Flat(rows) => {
                for row in rows {
                    let target = row
                        .parent_id
                        .map_or(LoadTarget::Article(row.article_id), LoadTarget::Parent);
                    groups.entry(target).or_default().push(row.id);
                }
            },
        }
        groups
    }

    fn post_ids(posts: &[parley_domain::models::Post]) -> Vec<i64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn connect_in_memory_and_health_check() {
        let db = Database::builder()
            .url("mem://")
            .session("test_ns", "test_db")
            .init()
            .await
            .expect("connect to mem://");

        assert_eq!(db.backend(), parley_domain::config::StorageBackend::Surreal);
        db.ping().await.expect("health check");
    }

    #[tokio::test]
    async fn missing_parameters_fail_validation() {
        let err = Database::builder().init().await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { .. }));
    }

    #[tokio::test]
    async fn config_selects_memory_backend() {
        let config = parley_domain::config::DatabaseConfig::default();
        let db = Database::builder().config(&config).init().await.unwrap();
        assert!(matches!(db, Database::Memory(_)));
    }

    #[tokio::test]
    async fn post_listing_walks_keyset_pages() {
        for db in backends().await {
            for n in 1..=5 {
                post(&db, &format!("post {n}"), false).await;
            }

            let first = PostRepository::get_many(&db, PostsQuery { first: 2, after: None }).await.unwrap();
            assert_eq!(post_ids(&first), vec![5, 4, 3]);

            let second =
                PostRepository::get_many(&db, PostsQuery { first: 2, after: Some(4) }).await.unwrap();
            assert_eq!(post_ids(&second), vec![3, 2, 1]);

            let last =
                PostRepository::get_many(&db, PostsQuery { first: 2, after: Some(2) }).await.unwrap();
            assert_eq!(post_ids(&last), vec![1]);

            let past_end = PostRepository::get_many(&db, PostsQuery { first: 2, after: Some(1) }).await;
            assert!(past_end.unwrap_err().is_not_found());
        }
    }

    #[tokio::test]
    async fn post_round_trips_fields() {
        for db in backends().await {
            let created = post(&db, "closed thread", true).await;
            let loaded = PostRepository::get(&db, created.id).await.unwrap();

            assert_eq!(loaded.id, created.id);
            assert_eq!(loaded.title, "closed thread");
            assert_eq!(loaded.text, "closed thread body");
            assert!(loaded.closed);
            assert_eq!(loaded.created_at.timestamp(), created.created_at.timestamp());
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        for db in backends().await {
            assert!(PostRepository::get(&db, 42).await.unwrap_err().is_not_found());
            assert!(CommentRepository::get(&db, 42).await.unwrap_err().is_not_found());
        }
    }

    #[tokio::test]
    async fn article_keys_return_top_level_comments_only() {
        for db in backends().await {
            let article = post(&db, "thread", false).await.id;
            let a = comment(&db, article, None).await;
            let b = comment(&db, article, None).await;
            let c = comment(&db, article, None).await;
            let reply = comment(&db, article, Some(a.id)).await;

            let batch = CommentRepository::get_many(&db, &[LoadKey::article(article, 2)]).await.unwrap();
            assert!(batch.failures.is_empty());
            let groups = by_target(batch.rows);
            assert_eq!(groups[&LoadTarget::Article(article)], vec![c.id, b.id, a.id]);

            let replies =
                CommentRepository::get_many(&db, &[LoadKey::parent(a.id, 2)]).await.unwrap();
            assert_eq!(by_target(replies.rows)[&LoadTarget::Parent(a.id)], vec![reply.id]);

            let loaded: Comment = CommentRepository::get(&db, reply.id).await.unwrap();
            assert_eq!(loaded.parent_id, Some(a.id));
            assert_eq!(loaded.article_id, article);
        }
    }

    #[tokio::test]
    async fn batch_honours_each_key_window() {
        for db in backends().await {
            let article = post(&db, "thread", false).await.id;
            let left = comment(&db, article, None).await.id;
            let right = comment(&db, article, None).await.id;

            let mut left_replies = Vec::new();
            let mut right_replies = Vec::new();
            for _ in 0..4 {
                left_replies.push(comment(&db, article, Some(left)).await.id);
                right_replies.push(comment(&db, article, Some(right)).await.id);
            }

            let keys = [
                LoadKey::parent(left, 1),
                LoadKey::parent(right, 5).after(Some(right_replies[3])),
            ];
            let batch = CommentRepository::get_many(&db, &keys).await.unwrap();
            let groups = by_target(batch.rows);

            assert_eq!(groups[&LoadTarget::Parent(left)], vec![left_replies[3], left_replies[2]]);
            assert_eq!(
                groups[&LoadTarget::Parent(right)],
                vec![right_replies[2], right_replies[1], right_replies[0]],
            );
        }
    }

    #[tokio::test]
    async fn mixed_discriminants_are_rejected() {
        for db in backends().await {
            let keys = [LoadKey::article(1, 2), LoadKey::parent(1, 2)];
            let err = CommentRepository::get_many(&db, &keys).await.unwrap_err();
            assert!(matches!(err, DatabaseError::Query { .. }));
        }
    }

    #[tokio::test]
    async fn empty_groups_come_back_empty() {
        for db in backends().await {
            let batch =
                CommentRepository::get_many(&db, &[LoadKey::parent(999, 3)]).await.unwrap();
            assert_eq!(batch.rows.item_count(), 0);
            assert!(batch.failures.is_empty());
        }
    }
}
