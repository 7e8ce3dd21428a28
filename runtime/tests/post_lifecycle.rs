//! Integration tests for the post lifecycle coordinator
//!
//! Every test drives the coordinator against a scripted table store whose
//! operation log is shared with the blob store, so the exact order of
//! persistence steps can be asserted alongside the events viewers receive.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use murmur_core::environment::Clock;
use murmur_core::{EventKind, FeedError, Post, PostDraft, RecordKey};
use murmur_runtime::{CascadeConfig, EventBroker, PostLifecycleCoordinator, Subscription};
use murmur_testing::fixtures::{self, ada};
use murmur_testing::{
    BatchRule, Operation, RecordingSleeper, ScriptedBlobStore, ScriptedTableStore, test_clock,
};
use std::sync::Arc;

const POST_ID: &str = "p-1";

struct Harness {
    table: Arc<ScriptedTableStore>,
    blobs: Arc<ScriptedBlobStore>,
    broker: EventBroker,
    coordinator: PostLifecycleCoordinator,
    sleeper: Arc<RecordingSleeper>,
}

fn harness() -> Harness {
    murmur_testing::init_tracing();
    let table = Arc::new(ScriptedTableStore::new());
    let blobs = Arc::new(table.blob_store());
    let broker = EventBroker::new(8);
    let sleeper = Arc::new(RecordingSleeper::new());
    let coordinator = PostLifecycleCoordinator::new(
        table.clone(),
        blobs.clone(),
        broker.clone(),
        CascadeConfig::default(),
    )
    .with_clock(Arc::new(test_clock()))
    .with_sleeper(sleeper.clone());

    Harness {
        table,
        blobs,
        broker,
        coordinator,
        sleeper,
    }
}

fn seed_post_with_comments(h: &Harness, image: &str, comments: usize) -> Post {
    let author = ada();
    let post = fixtures::post(&author, POST_ID, "hello", image);
    h.table.seed_post(&post);
    h.table
        .seed_comments(&fixtures::comments(POST_ID, &author, comments));
    post
}

/// Wait until every previously published event has been dispatched, then
/// assert nothing reached `viewer`.
async fn assert_nothing_published(h: &Harness, viewer: &mut Subscription) {
    h.broker.subscriber_count().await;
    assert!(viewer.try_recv().is_none(), "unexpected event published");
}

#[tokio::test]
async fn delete_runs_cascade_then_blob_then_record_then_publishes() {
    let h = harness();
    let post = seed_post_with_comments(&h, "img.png", 30);
    h.blobs.insert("img.png");
    let mut viewer = h.broker.subscribe();

    let deleted = h.coordinator.delete_post(&post.user_id, POST_ID).await.unwrap();
    assert_eq!(deleted, post);

    let post_key = post.key();
    let operations = h.table.operations();
    let position = |wanted: &Operation| operations.iter().position(|op| op == wanted).unwrap();

    let fetched = position(&Operation::Get(post_key.clone()));
    let last_batch = operations
        .iter()
        .rposition(|op| matches!(op, Operation::BatchDelete(_)))
        .unwrap();
    let blob_deleted = position(&Operation::BlobDelete("img.png".to_string()));
    let record_deleted = position(&Operation::Delete(post_key.clone()));

    assert!(fetched < last_batch);
    assert!(last_batch < blob_deleted);
    assert!(blob_deleted < record_deleted);
    assert_eq!(record_deleted, operations.len() - 1);

    let event = viewer.recv().await.unwrap();
    assert_eq!(event.name(), EventKind::DeletePost.as_str());
    assert_eq!(event.payload_str().unwrap(), r#"{"id":"p-1"}"#);

    // by the time the event is observable, the post and its comments are gone
    assert!(h.table.is_empty());
    assert!(!h.blobs.contains("img.png"));
}

#[tokio::test]
async fn exhausted_cascade_leaves_post_intact_and_publishes_nothing() {
    let h = harness();
    let post = seed_post_with_comments(&h, "img.png", 5);
    h.blobs.insert("img.png");
    h.table.set_default_rule(BatchRule::RejectLast(1));
    let mut viewer = h.broker.subscribe();

    let err = h
        .coordinator
        .delete_post(&post.user_id, POST_ID)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FeedError::RetryExhausted {
            outstanding: 1,
            retries: 5
        }
    );
    assert_eq!(h.sleeper.sleeps().len(), 5);
    assert!(h.table.contains(&post.key()));
    assert!(h.blobs.contains("img.png"));
    assert!(!h.table.operations().iter().any(|op| matches!(
        op,
        Operation::Delete(_) | Operation::BlobDelete(_)
    )));
    assert_nothing_published(&h, &mut viewer).await;

    // a retried delete re-enumerates the leftover comment and finishes
    h.table.set_default_rule(BatchRule::AcceptAll);
    h.coordinator.delete_post(&post.user_id, POST_ID).await.unwrap();

    assert!(h.table.is_empty());
    assert_eq!(viewer.recv().await.unwrap().name(), "delete_post");
}

#[tokio::test]
async fn missing_image_blob_does_not_block_delete() {
    let h = harness();
    let post = seed_post_with_comments(&h, "already-gone.png", 2);
    let mut viewer = h.broker.subscribe();

    h.coordinator.delete_post(&post.user_id, POST_ID).await.unwrap();

    assert!(!h.table.contains(&post.key()));
    assert_eq!(viewer.recv().await.unwrap().name(), "delete_post");
}

#[tokio::test]
async fn blob_store_outage_aborts_before_record_delete() {
    let h = harness();
    let post = seed_post_with_comments(&h, "img.png", 2);
    h.blobs.insert("img.png");
    h.blobs.set_unavailable(true);
    let mut viewer = h.broker.subscribe();

    let err = h
        .coordinator
        .delete_post(&post.user_id, POST_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::UpstreamUnavailable(_)));
    assert!(h.table.contains(&post.key()));
    assert_nothing_published(&h, &mut viewer).await;
}

#[tokio::test]
async fn delete_of_unknown_post_touches_nothing_else() {
    let h = harness();
    let mut viewer = h.broker.subscribe();

    let err = h.coordinator.delete_post("u-ada", "nope").await.unwrap_err();

    assert_eq!(err, FeedError::not_found("post", "nope"));
    assert_eq!(
        h.table.operations(),
        vec![Operation::Get(RecordKey::post("u-ada", "nope"))]
    );
    assert_nothing_published(&h, &mut viewer).await;
}

#[tokio::test]
async fn create_publishes_full_record_after_persisting() {
    let h = harness();
    let mut viewer = h.broker.subscribe();

    let post = h
        .coordinator
        .create_post(
            &ada(),
            PostDraft {
                text: "first\u{200B} post".to_string(),
                image: String::new(),
            },
        )
        .await
        .unwrap();

    assert_eq!(post.text, "first post");
    assert_eq!(post.timestamp, test_clock().now());
    assert_eq!(h.table.operations(), vec![Operation::Put(post.key())]);

    let event = viewer.recv().await.unwrap();
    assert_eq!(event.name(), "new_post");
    let published: Post = serde_json::from_slice(event.payload()).unwrap();
    assert_eq!(published, post);
}

#[tokio::test]
async fn update_publishes_edited_record() {
    let h = harness();
    let post = seed_post_with_comments(&h, "", 0);
    let mut viewer = h.broker.subscribe();

    let updated = h
        .coordinator
        .update_post(
            &post.user_id,
            POST_ID,
            PostDraft {
                text: "edited".to_string(),
                image: String::new(),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.text, "edited");
    assert!(updated.edited.is_some());

    let event = viewer.recv().await.unwrap();
    assert_eq!(event.name(), "update_post");
    let published: Post = serde_json::from_slice(event.payload()).unwrap();
    assert_eq!(published, updated);
}

#[tokio::test]
async fn rejected_create_is_not_persisted_or_published() {
    let h = harness();
    let mut viewer = h.broker.subscribe();

    let err = h
        .coordinator
        .create_post(&ada(), PostDraft::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::Validation(_)));
    assert!(h.table.operations().is_empty());
    assert_nothing_published(&h, &mut viewer).await;
}

#[tokio::test]
async fn failed_create_write_publishes_nothing() {
    let h = harness();
    h.table.set_rejecting_puts(true);
    let mut viewer = h.broker.subscribe();

    let err = h
        .coordinator
        .create_post(
            &ada(),
            PostDraft {
                text: "lost".to_string(),
                image: String::new(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::UpstreamUnavailable(_)));
    assert!(h.table.is_empty());
    assert_nothing_published(&h, &mut viewer).await;
}

#[tokio::test]
async fn failed_update_write_keeps_old_image_and_publishes_nothing() {
    let h = harness();
    h.blobs.insert("old.png");
    h.blobs.insert("new.png");
    let post = seed_post_with_comments(&h, "old.png", 0);
    h.table.set_rejecting_puts(true);
    let mut viewer = h.broker.subscribe();

    let err = h
        .coordinator
        .update_post(
            &post.user_id,
            POST_ID,
            PostDraft {
                text: "edited".to_string(),
                image: "new.png".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::UpstreamUnavailable(_)));
    assert!(h.blobs.contains("old.png"));
    assert!(
        !h.table
            .operations()
            .contains(&Operation::BlobDelete("old.png".to_string()))
    );
    assert_nothing_published(&h, &mut viewer).await;
}
