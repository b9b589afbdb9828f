#![cfg(feature = "server")]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use futures::StreamExt;
use parley_database::Database;
use parley_discussion::Discussion;
use parley_discussion::api::discussion_router;
use parley_domain::config::ApiConfig;
use parley_domain::models::NewComment;
use parley_events::SubscriptionRegistry;
use parley_kernel::server::ApiState;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> (Router, ApiState) {
    let config = ApiConfig::default();
    let database = Database::builder().memory().init().await.expect("memory backend");
    let subscriptions = SubscriptionRegistry::new(config.subscriptions).expect("registry");
    let slice = parley_discussion::init(&config, &database, &subscriptions).expect("slice");

    let state = ApiState::builder()
        .config(config)
        .db(database)
        .subscriptions(subscriptions)
        .register_slice(slice)
        .build()
        .expect("state");
    let (router, _) = discussion_router().with_state(state.clone()).split_for_parts();
    (router, state)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn create_post(router: &Router, closed: bool) -> i64 {
    let body = json!({ "title": "Hello", "text": "World", "closed": closed });
    let (status, post) = send(router, Method::POST, "/posts", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    post["id"].as_i64().unwrap()
}

async fn create_comment(router: &Router, post_id: i64, parent_id: Option<i64>) -> (StatusCode, Value) {
    let body = json!({ "text": "hi", "articleId": post_id, "parentId": parent_id });
    send(router, Method::POST, "/comments", Some(body)).await
}

#[tokio::test]
async fn posts_round_trip_over_http() {
    let (router, _) = app().await;
    let id = create_post(&router, false).await;

    let (status, post) = send(&router, Method::GET, &format!("/posts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["title"], "Hello");
    assert_eq!(post["closed"], false);
    assert!(post["createdAt"].is_i64());

    let (status, page) = send(&router, Method::GET, "/posts?first=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["edges"][0]["node"]["id"], id);
    assert_eq!(page["pageInfo"]["hasNextPage"], false);
}

#[tokio::test]
async fn unknown_post_is_404_with_json_body() {
    let (router, _) = app().await;
    let (status, body) = send(&router, Method::GET, "/posts/404", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn comment_rules_map_to_status_codes() {
    let (router, _) = app().await;

    let (status, body) = create_comment(&router, 404, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "couldn't get required post with provided id");

    let closed = create_post(&router, true).await;
    let (status, body) = create_comment(&router, closed, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], format!("post closed to add comments (post {closed})"));

    let open = create_post(&router, false).await;
    let (status, comment) = create_comment(&router, open, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["articleId"], open);
    assert!(comment.get("parentId").is_some_and(Value::is_null));
}

#[tokio::test]
async fn thread_nests_replies() {
    let (router, _) = app().await;
    let post = create_post(&router, false).await;
    let (_, top) = create_comment(&router, post, None).await;
    let top = top["id"].as_i64().unwrap();
    let (_, reply) = create_comment(&router, post, Some(top)).await;

    let (status, thread) =
        send(&router, Method::GET, &format!("/posts/{post}/comments?depth=1"), None).await;
    assert_eq!(status, StatusCode::OK);

    let node = &thread["edges"][0]["node"];
    assert_eq!(node["id"], top);
    assert_eq!(node["replies"]["edges"][0]["node"]["id"], reply["id"]);
    assert!(node["replies"]["edges"][0]["node"].get("replies").is_none());

    let (status, replies) =
        send(&router, Method::GET, &format!("/comments/{top}/replies?first=5"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replies["edges"][0]["cursor"], reply["id"]);
}

#[tokio::test]
async fn invalid_listings_are_bad_requests() {
    let (router, _) = app().await;

    let (status, _) = send(&router, Method::GET, "/comments?post_id=1&parent_id=2", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, Method::GET, "/comments", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, Method::GET, "/posts?first=1000", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn subscribe_streams_new_comments() {
    let (router, state) = app().await;
    let post = create_post(&router, false).await;

    let request =
        Request::builder().uri(format!("/posts/{post}/subscribe")).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(state.subscriptions.subscriber_count(post), 1);

    let service = &state.get_slice::<Discussion>().unwrap().service;
    let comment = service
        .create_comment(NewComment { text: "live".into(), article_id: post, parent_id: None })
        .await
        .unwrap();

    let mut frames = response.into_body().into_data_stream();
    let frame = frames.next().await.unwrap().unwrap();
    let frame = String::from_utf8(frame.to_vec()).unwrap();
    assert!(frame.contains("event: comment"));
    assert!(frame.contains(&format!("id: {}", comment.id)));
    assert!(frame.contains("\"text\":\"live\""));
}

#[tokio::test]
async fn subscribe_to_unknown_post_is_404() {
    let (router, state) = app().await;
    let (status, _) = send(&router, Method::GET, "/posts/404/subscribe", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(state.subscriptions.total(), 0);
}
