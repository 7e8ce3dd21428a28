//! HTTP surface tests
//!
//! Drives the full router over in-memory stores, covering identity, status
//! mapping, the post, comment, user, and upload routes, and the live event
//! stream.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum_test::TestServer;
use futures::StreamExt;
use murmur_core::{Author, BlobStore, Comment, Post, PostDraft, UploadTicket, User};
use murmur_runtime::memory::{InMemoryBlobStore, InMemoryTableStore};
use murmur_runtime::{
    CascadeConfig, CommentService, EventBroker, PostLifecycleCoordinator, UploadService,
    UserService,
};
use murmur_web::handlers::users::MeResponse;
use murmur_web::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const ADA: &str = "u-ada";
const GRACE: &str = "u-grace";

fn state() -> AppState {
    state_with_blobs(Arc::new(InMemoryBlobStore::new()))
}

fn state_with_blobs(blobs: Arc<InMemoryBlobStore>) -> AppState {
    murmur_testing::init_tracing();
    let table = Arc::new(InMemoryTableStore::new());
    let broker = EventBroker::new(16);
    let coordinator = PostLifecycleCoordinator::new(
        table.clone(),
        blobs.clone(),
        broker.clone(),
        CascadeConfig::default(),
    );
    let comments = CommentService::new(table.clone());
    let users = UserService::new(table);
    let uploads = UploadService::new(blobs);
    AppState::new(coordinator, comments, users, uploads, broker)
}

fn server(state: AppState) -> TestServer {
    TestServer::new(build_router(state)).unwrap()
}

fn user_id(id: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static(id),
    )
}

async fn create_post(server: &TestServer, as_user: &'static str, text: &str) -> Post {
    let (name, value) = user_id(as_user);
    let response = server
        .post("/posts")
        .add_header(name, value)
        .json(&json!({ "text": text }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Post>()
}

#[tokio::test]
async fn health_and_readiness() {
    let server = server(state());

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");

    let ready = server.get("/ready").await.json::<Value>();
    assert_eq!(ready, json!({ "status": "ready", "subscribers": 0 }));
}

#[tokio::test]
async fn create_requires_identity() {
    let server = server(state());

    let response = server.post("/posts").json(&json!({ "text": "hi" })).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn created_posts_appear_in_timeline_and_user_listing() {
    let server = server(state());
    let first = create_post(&server, ADA, "first").await;
    let second = create_post(&server, GRACE, "second").await;

    assert_eq!(first.user_id, ADA);
    assert_eq!(first.user_name, ADA);

    let timeline = server.get("/posts").await.json::<Vec<Post>>();
    assert_eq!(timeline.len(), 2);
    assert!(timeline.contains(&first));
    assert!(timeline.contains(&second));

    let ada_posts = server.get(&format!("/posts/{ADA}")).await.json::<Vec<Post>>();
    assert_eq!(ada_posts, vec![first]);
}

#[tokio::test]
async fn empty_post_is_unprocessable() {
    let server = server(state());
    let (name, value) = user_id(ADA);

    let response = server
        .post("/posts")
        .add_header(name, value)
        .json(&json!({ "text": "\u{200B} ", "image": "" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn whitespace_only_comment_is_unprocessable() {
    let server = server(state());
    let post = create_post(&server, ADA, "thread").await;
    let (name, value) = user_id(GRACE);

    let response = server
        .post(&format!("/posts/{}/comments", post.id))
        .add_header(name, value)
        .json(&json!({ "text": " \u{FEFF}\n " }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_image_is_unprocessable() {
    let server = server(state());
    let (name, value) = user_id(ADA);

    let response = server
        .post("/posts")
        .add_header(name, value)
        .json(&json!({ "text": "look", "image": "missing.png" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cannot_edit_or_delete_another_users_post() {
    let server = server(state());
    let post = create_post(&server, ADA, "mine").await;
    let (name, value) = user_id(GRACE);

    let path = format!("/users/{ADA}/posts/{}", post.id);
    let response = server
        .put(&path)
        .add_header(name.clone(), value.clone())
        .json(&json!({ "text": "hijacked" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = server.delete(&path).add_header(name, value).await;
    response.assert_status(StatusCode::FORBIDDEN);

    assert_eq!(server.get("/posts").await.json::<Vec<Post>>(), vec![post]);
}

#[tokio::test]
async fn update_marks_post_edited() {
    let server = server(state());
    let post = create_post(&server, ADA, "draft").await;
    let (name, value) = user_id(ADA);

    let response = server
        .put(&format!("/users/{ADA}/posts/{}", post.id))
        .add_header(name, value)
        .json(&PostDraft {
            text: "final".to_string(),
            image: String::new(),
        })
        .await;

    response.assert_status_ok();
    let updated = response.json::<Post>();
    assert_eq!(updated.text, "final");
    assert_eq!(updated.timestamp, post.timestamp);
    assert!(updated.edited.is_some());
}

#[tokio::test]
async fn delete_unknown_post_is_not_found() {
    let server = server(state());
    let (name, value) = user_id(ADA);

    let response = server
        .delete(&format!("/users/{ADA}/posts/nope"))
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let server = server(state());
    let post = create_post(&server, ADA, "thread").await;
    let comments_path = format!("/posts/{}/comments", post.id);

    for i in 0..30 {
        let (name, value) = user_id(GRACE);
        server
            .post(&comments_path)
            .add_header(name, value)
            .json(&json!({ "text": format!("reply {i}") }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    assert_eq!(server.get(&comments_path).await.json::<Vec<Comment>>().len(), 30);

    let (name, value) = user_id(ADA);
    server
        .delete(&format!("/users/{ADA}/posts/{}", post.id))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(server.get(&comments_path).await.json::<Vec<Comment>>().is_empty());
    assert!(server.get("/posts").await.json::<Vec<Post>>().is_empty());
}

#[tokio::test]
async fn comment_lifecycle_enforces_ownership() {
    let server = server(state());
    let post = create_post(&server, ADA, "thread").await;
    let (grace, grace_value) = user_id(GRACE);
    let (ada, ada_value) = user_id(ADA);

    let comment = server
        .post(&format!("/posts/{}/comments", post.id))
        .add_header(grace.clone(), grace_value.clone())
        .add_header(
            HeaderName::from_static("x-user-name"),
            HeaderValue::from_static("Grace"),
        )
        .json(&json!({ "text": "nice" }))
        .await
        .json::<Comment>();
    assert_eq!(comment.user_name, "Grace");

    let path = format!("/users/{GRACE}/posts/{}/comments/{}", post.id, comment.id);

    // Ada cannot act under Grace's path
    server
        .put(&path)
        .add_header(ada, ada_value)
        .json(&json!({ "text": "edited by ada" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .put(&path)
        .add_header(grace.clone(), grace_value.clone())
        .json(&json!({ "text": "very nice" }))
        .await;
    response.assert_status_ok();
    let updated = response.json::<Comment>();
    assert_eq!(updated.text, "very nice");
    assert!(updated.edited.is_some());

    server
        .put(&path)
        .add_header(grace.clone(), grace_value.clone())
        .json(&json!({ "text": "" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .delete(&path)
        .add_header(grace.clone(), grace_value.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .delete(&path)
        .add_header(grace, grace_value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploaded_image_can_be_posted_and_is_removed_with_the_post() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let server = server(state_with_blobs(blobs.clone()));
    let (name, value) = user_id(ADA);

    server
        .post("/presign")
        .json(&json!({ "file_name": "cat.png", "file_type": "image/png" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = server
        .post("/presign")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "file_name": "cat.png", "file_type": "image/png" }))
        .await;
    response.assert_status_ok();
    let ticket = response.json::<UploadTicket>();
    assert!(ticket.key.ends_with("_cat.png"));
    assert!(blobs.exists(&ticket.key).await.unwrap());

    let response = server
        .post("/posts")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "text": "", "image": ticket.key }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let post = response.json::<Post>();
    assert_eq!(post.image, ticket.key);

    server
        .delete(&format!("/users/{ADA}/posts/{}", post.id))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(!blobs.exists(&ticket.key).await.unwrap());
    assert!(server.get("/posts").await.json::<Vec<Post>>().is_empty());
}

#[tokio::test]
async fn non_image_upload_is_unprocessable() {
    let server = server(state());
    let (name, value) = user_id(ADA);

    let response = server
        .post("/presign")
        .add_header(name, value)
        .json(&json!({ "file_name": "notes.pdf", "file_type": "application/pdf" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

async fn register(server: &TestServer, as_user: &'static str, display: &str) -> User {
    let (name, value) = user_id(as_user);
    let response = server
        .post("/users")
        .add_header(name, value)
        .json(&json!({ "name": display, "email": format!("{as_user}@example.com") }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<User>()
}

#[tokio::test]
async fn registration_and_lookup() {
    let server = server(state());
    let (name, value) = user_id(ADA);

    server
        .post("/users")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "name": "   " }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .post("/users")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "id": GRACE, "name": "Not Grace" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let ada = register(&server, ADA, "Ada").await;
    assert_eq!(ada.id, ADA);
    assert_eq!(ada.email, "u-ada@example.com");
    register(&server, GRACE, "Grace").await;

    let fetched = server.get(&format!("/users/{ADA}")).await.json::<User>();
    assert_eq!(fetched, ada);

    let names: Vec<String> = server
        .get("/users")
        .await
        .json::<Vec<User>>()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);

    let response = server.get("/users/u-nobody").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");

    server.get("/me").await.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn follow_graph_round_trip() {
    let server = server(state());
    register(&server, ADA, "Ada").await;
    register(&server, GRACE, "Grace").await;
    let (name, value) = user_id(ADA);

    server
        .post("/users/follow")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "following_id": "u-nobody" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .post("/users/follow")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "following_id": ADA }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .post("/users/follow")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "following_id": GRACE }))
        .await
        .assert_status(StatusCode::CREATED);

    let me = server
        .get("/me")
        .add_header(name.clone(), value.clone())
        .await
        .json::<MeResponse>();
    assert_eq!(me, MeResponse {
        id: ADA.to_string(),
        name: "Ada".to_string(),
        following: vec![GRACE.to_string()],
    });
    assert_eq!(
        server.get(&format!("/users/{ADA}/following")).await.json::<Vec<String>>(),
        vec![GRACE.to_string()]
    );

    server
        .delete("/users/unfollow")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "unfollowing_id": GRACE }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .delete("/users/unfollow")
        .add_header(name, value)
        .json(&json!({ "unfollowing_id": GRACE }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert!(
        server
            .get(&format!("/users/{ADA}/following"))
            .await
            .json::<Vec<String>>()
            .is_empty()
    );
}

#[tokio::test]
async fn responses_carry_correlation_id() {
    let server = server(state());
    let response = server.get("/health").await;
    assert!(response.headers().contains_key("x-correlation-id"));
}

async fn next_frame(body: &mut axum::body::BodyDataStream) -> String {
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .expect("timed out waiting for an SSE frame")
        .expect("stream ended")
        .unwrap();
    String::from_utf8(chunk.to_vec()).unwrap()
}

#[tokio::test]
async fn event_stream_delivers_lifecycle_events_and_unsubscribes_on_disconnect() {
    let state = state();
    let app = build_router(state.clone());

    let response = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        HeaderValue::from_static("text/event-stream")
    );
    assert_eq!(state.broker.subscriber_count().await, 1);

    let mut body = response.into_body().into_data_stream();
    let post = state
        .coordinator
        .create_post(&Author::new(ADA, "Ada"), PostDraft {
            text: "live".to_string(),
            image: String::new(),
        })
        .await
        .unwrap();
    state.coordinator.delete_post(ADA, &post.id).await.unwrap();

    let mut received = String::new();
    while !received.contains("event: delete_post") {
        received.push_str(&next_frame(&mut body).await);
    }
    assert!(received.contains("event: new_post\n"));
    assert!(received.contains(&format!("data: {{\"id\":\"{}\"}}\n", post.id)));
    assert!(received.find("new_post") < received.find("delete_post"));

    drop(body);
    assert_eq!(state.broker.subscriber_count().await, 0);
}
