//! BatchWaiter polling loop driven by a fake clock

mod common;

use common::*;
use embedding_batch::error::JobError;
use embedding_batch::models::BatchStatus;
use embedding_batch::pipeline::{BatchWaiter, WaitOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[tokio::test]
async fn test_polls_until_terminal_with_fixed_interval() {
    let provider = MockBatchProvider::new().with_statuses(vec![
        batch(BatchStatus::Validating),
        batch(BatchStatus::InProgress),
        batch(BatchStatus::Finalizing),
        completed_batch(),
    ]);
    let clock = FakeClock::new();
    let waiter = BatchWaiter::new(Arc::new(provider.clone()), Arc::new(clock.clone()), POLL_INTERVAL);

    let outcome = waiter
        .wait(batch(BatchStatus::Validating), &CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        WaitOutcome::Terminal { batch, polls } => {
            assert_eq!(batch.status, BatchStatus::Completed);
            assert_eq!(batch.output_file_id.as_deref(), Some(TEST_OUTPUT_FILE_ID));
            assert_eq!(polls, 4);
        }
        other => panic!("expected terminal outcome, got {other:?}"),
    }
    assert_eq!(provider.poll_count(), 4);
    assert_eq!(clock.sleeps(), vec![POLL_INTERVAL; 3]);
}

#[tokio::test]
async fn test_failed_and_expired_statuses_are_terminal() {
    for terminal in [BatchStatus::Failed, BatchStatus::Expired, BatchStatus::Cancelled] {
        let provider = MockBatchProvider::new().with_statuses(vec![batch(terminal)]);
        let clock = FakeClock::new();
        let waiter = BatchWaiter::new(Arc::new(provider), Arc::new(clock.clone()), POLL_INTERVAL);

        let outcome = waiter
            .wait(batch(BatchStatus::Validating), &CancellationToken::new())
            .await
            .unwrap();

        assert!(
            matches!(outcome, WaitOutcome::Terminal { ref batch, polls: 1 } if batch.status == terminal),
            "{terminal}: {outcome:?}"
        );
        assert!(clock.sleeps().is_empty());
    }
}

#[tokio::test]
async fn test_cancelling_and_unknown_statuses_keep_polling() {
    let unknown: embedding_batch::models::ExternalBatchJob =
        serde_json::from_value(serde_json::json!({ "id": TEST_BATCH_ID, "status": "paused" }))
            .unwrap();
    assert_eq!(unknown.status, BatchStatus::Unknown);

    let provider = MockBatchProvider::new().with_statuses(vec![
        unknown,
        batch(BatchStatus::Cancelling),
        batch(BatchStatus::Cancelled),
    ]);
    let clock = FakeClock::new();
    let waiter = BatchWaiter::new(Arc::new(provider), Arc::new(clock.clone()), POLL_INTERVAL);

    let outcome = waiter
        .wait(batch(BatchStatus::Validating), &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, WaitOutcome::Terminal { polls: 3, .. }));
    assert_eq!(clock.sleeps().len(), 2);
}

#[tokio::test]
async fn test_status_fetch_error_is_batch_polling_error() {
    let provider = MockBatchProvider::new().failing_poll("service unavailable");
    let waiter = BatchWaiter::new(Arc::new(provider), Arc::new(FakeClock::new()), POLL_INTERVAL);

    let err = waiter
        .wait(batch(BatchStatus::Validating), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::BatchPolling { .. }));
    assert!(err.to_string().contains("service unavailable"));
}

#[tokio::test]
async fn test_pre_cancelled_token_returns_without_polling() {
    let provider = MockBatchProvider::new();
    let waiter = BatchWaiter::new(Arc::new(provider.clone()), Arc::new(FakeClock::new()), POLL_INTERVAL);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = waiter
        .wait(batch(BatchStatus::Validating), &cancel)
        .await
        .unwrap();

    assert!(matches!(outcome, WaitOutcome::Cancelled { polls: 0, .. }));
    assert_eq!(provider.poll_count(), 0);
}

#[tokio::test]
async fn test_cancellation_during_sleep_stops_the_loop() {
    let provider = MockBatchProvider::new().with_statuses(vec![batch(BatchStatus::InProgress)]);
    let cancel = CancellationToken::new();
    let clock = FakeClock::cancelling_after(3, cancel.clone());
    let waiter = BatchWaiter::new(Arc::new(provider.clone()), Arc::new(clock.clone()), POLL_INTERVAL);

    let outcome = waiter
        .wait(batch(BatchStatus::Validating), &cancel)
        .await
        .unwrap();

    match outcome {
        WaitOutcome::Cancelled { batch, polls } => {
            assert_eq!(batch.status, BatchStatus::InProgress);
            assert_eq!(polls, 3);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(provider.poll_count(), 3);
    assert_eq!(clock.sleeps().len(), 3);
}
