//! Integration tests for cascade deletes against a scripted table store
//!
//! Each test scripts how the store answers batch calls and then checks the
//! exact call sizes, backoff schedule, and final store contents.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use murmur_core::StoreError;
use murmur_runtime::{CascadeConfig, CascadeDeleteEngine, CascadeError};
use murmur_testing::fixtures::{self, ada};
use murmur_testing::{BatchRule, RecordingSleeper, ScriptedTableStore};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const POST_ID: &str = "p-1";

fn seeded(comment_count: usize) -> (Arc<ScriptedTableStore>, Vec<murmur_core::Comment>) {
    let table = Arc::new(ScriptedTableStore::new());
    let author = ada();
    let comments = fixtures::comments(POST_ID, &author, comment_count);
    table.seed_post(&fixtures::post(&author, POST_ID, "parent", ""));
    table.seed_comments(&comments);
    (table, comments)
}

fn engine(table: &Arc<ScriptedTableStore>) -> (CascadeDeleteEngine, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    (CascadeDeleteEngine::new(table.clone(), sleeper.clone()), sleeper)
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

#[tokio::test]
async fn sixty_comments_with_three_rejected_on_first_call() {
    let (table, comments) = seeded(60);
    table.script([BatchRule::RejectLast(3)]);
    let (engine, sleeper) = engine(&table);

    let report = engine
        .delete_children(POST_ID, &CascadeConfig::default())
        .await
        .unwrap();

    assert_eq!(table.batch_sizes(), vec![25, 25, 10, 3]);
    assert_eq!(report.enumerated, 60);
    assert_eq!(report.batches, 3);
    assert_eq!(report.retry_batches, 1);
    assert!(sleeper.sleeps().is_empty());

    for comment in &comments {
        assert_eq!(table.delete_count(&comment.key()), 1);
    }
    // only the parent post is left
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn one_item_always_unprocessed_exhausts_after_five_backoffs() {
    let (table, comments) = seeded(3);
    table.set_default_rule(BatchRule::RejectLast(1));
    let (engine, sleeper) = engine(&table);

    let err = engine
        .delete_children(POST_ID, &CascadeConfig::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CascadeError::RetryExhausted {
            outstanding: 1,
            retries: 5
        }
    );
    assert_eq!(sleeper.sleeps(), millis(&[100, 200, 400, 800, 1600]));
    assert_eq!(table.batch_sizes(), vec![3, 1, 1, 1, 1, 1]);
    assert!(table.contains(&comments[2].key()));
    assert!(!table.contains(&comments[0].key()));
}

#[tokio::test]
async fn backoff_saturates_at_max_backoff() {
    let (table, _) = seeded(1);
    table.set_default_rule(BatchRule::RejectAll);
    let (engine, sleeper) = engine(&table);

    let config = CascadeConfig::builder()
        .max_retries(5)
        .initial_backoff(Duration::from_secs(1))
        .max_backoff(Duration::from_millis(2500))
        .build();

    let err = engine.delete_children(POST_ID, &config).await.unwrap_err();

    assert!(matches!(err, CascadeError::RetryExhausted { outstanding: 1, .. }));
    assert_eq!(sleeper.sleeps(), millis(&[1000, 2000, 2500, 2500, 2500]));
}

#[tokio::test]
async fn clean_retry_round_resets_the_attempt_counter() {
    let (table, _) = seeded(50);
    table.script([
        BatchRule::RejectAll,
        BatchRule::RejectAll,
        BatchRule::RejectLast(1),
        BatchRule::AcceptAll,
        BatchRule::RejectAll,
    ]);
    let (engine, sleeper) = engine(&table);
    let config = CascadeConfig::builder().max_retries(2).build();

    let report = engine.delete_children(POST_ID, &config).await.unwrap();

    // without the reset the fifth call would be the second consecutive failure
    assert_eq!(sleeper.sleeps(), millis(&[100, 100]));
    assert_eq!(table.batch_sizes(), vec![25, 25, 25, 25, 1, 1]);
    assert_eq!(report.retry_batches, 4);
    assert_eq!(report.backoffs, 2);
    assert_eq!(table.len(), 1);
}

#[tokio::test]
async fn zero_retries_fails_on_first_partial_batch() {
    let (table, _) = seeded(10);
    table.script([BatchRule::RejectLast(4)]);
    let (engine, sleeper) = engine(&table);
    let config = CascadeConfig::builder().max_retries(0).build();

    let err = engine.delete_children(POST_ID, &config).await.unwrap_err();

    assert_eq!(
        err,
        CascadeError::RetryExhausted {
            outstanding: 4,
            retries: 0
        }
    );
    assert!(sleeper.sleeps().is_empty());
    assert_eq!(table.batch_sizes(), vec![10]);
}

#[tokio::test]
async fn outright_batch_failure_aborts_without_retry() {
    let (table, comments) = seeded(60);
    table.script([BatchRule::AcceptAll, BatchRule::Fail("throttled".to_string())]);
    let (engine, sleeper) = engine(&table);

    let err = engine
        .delete_children(POST_ID, &CascadeConfig::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CascadeError::Upstream(StoreError::Unavailable("throttled".to_string()))
    );
    assert_eq!(table.batch_sizes(), vec![25, 25]);
    assert!(sleeper.sleeps().is_empty());
    assert!(!table.contains(&comments[0].key()));
    assert!(table.contains(&comments[59].key()));
}

#[tokio::test]
async fn batch_size_is_clamped_to_the_store_ceiling() {
    let (table, _) = seeded(60);
    let (engine, _) = engine(&table);
    let config = CascadeConfig::builder().batch_size(100).build();

    engine.delete_children(POST_ID, &config).await.unwrap();

    assert_eq!(table.batch_sizes(), vec![25, 25, 10]);
}

#[tokio::test]
async fn listing_precedes_every_batch() {
    let (table, _) = seeded(30);
    let (engine, _) = engine(&table);

    engine
        .delete_children(POST_ID, &CascadeConfig::default())
        .await
        .unwrap();

    let operations = table.operations();
    assert!(matches!(
        operations.first(),
        Some(murmur_testing::Operation::Query { sort_prefix, .. }) if sort_prefix == "comment#"
    ));
    assert_eq!(
        operations
            .iter()
            .filter(|op| matches!(op, murmur_testing::Operation::Query { .. }))
            .count(),
        1
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_comment_deleted_exactly_once(
        count in fixtures::comment_count(),
        (batch_size, max_retries) in fixtures::batch_size_and_retries(),
        rejections in fixtures::rejection_script(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let (table, comments) = seeded(count);
        // fewer failing rounds than the budget, so the store eventually accepts everything
        let budget = usize::try_from(max_retries).unwrap() - 1;
        table.script(rejections.into_iter().take(budget).map(BatchRule::RejectLast));
        let (engine, sleeper) = engine(&table);
        let config = CascadeConfig::builder()
            .batch_size(batch_size)
            .max_retries(max_retries)
            .build();

        let report = runtime
            .block_on(engine.delete_children(POST_ID, &config))
            .unwrap();

        prop_assert_eq!(report.enumerated, count);
        prop_assert!(sleeper.sleeps().len() <= budget);
        prop_assert!(table.batch_sizes().iter().all(|&size| size <= batch_size));
        for comment in &comments {
            prop_assert_eq!(table.delete_count(&comment.key()), 1);
        }
        prop_assert_eq!(table.len(), 1);
    }
}
