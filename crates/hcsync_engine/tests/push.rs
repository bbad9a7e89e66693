//! Integration tests for push command handling.

use hcsync_engine::{push_queue, run_push_loop, Method, StatusLevel};
use hcsync_protocol::{AccessType, HealthRecord, Permission, PushMessage, RecordType};
use hcsync_storage::{HealthStore, InMemoryHealthStore};
use hcsync_testkit::prelude::*;
use serde_json::json;
use tokio::sync::watch;

#[tokio::test]
async fn delete_removes_exactly_the_named_records() {
    let harness = TestHarness::new().logged_in();
    harness.store.seed(
        RecordType::Steps,
        [
            steps_record("a", fixed_now()),
            steps_record("b", fixed_now()),
            steps_record("c", fixed_now()),
        ],
    );

    harness
        .push_handler()
        .handle(&delete_message(RecordType::Steps, &["a", "b"]))
        .await;

    assert_eq!(harness.store.ids(RecordType::Steps), vec!["c"]);
    let deletes = harness.http.requests_to(Method::Delete, "/api/v2/sync/Steps");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].body, Some(json!({ "uuid": ["a", "b"] })));
    assert_eq!(deletes[0].bearer.as_deref(), Some(ACCESS_TOKEN));
}

#[tokio::test]
async fn local_delete_holds_when_remote_fails() {
    let harness = TestHarness::new().logged_in();
    harness
        .http
        .fail(Method::Delete, "/sync/Steps", "connection refused");
    harness.store.seed(
        RecordType::Steps,
        [steps_record("a", fixed_now()), steps_record("b", fixed_now())],
    );

    harness
        .push_handler()
        .handle(&delete_message(RecordType::Steps, &["a"]))
        .await;

    assert_eq!(harness.store.ids(RecordType::Steps), vec!["b"]);
    assert!(harness.notifier.alerts().is_empty());
}

#[tokio::test]
async fn remote_delete_runs_when_local_delete_fails() {
    let store = InMemoryHealthStore::new();
    store.revoke(Permission::new(AccessType::Write, RecordType::Steps));
    let harness =
        TestHarness::build(store, hcsync_engine::MockHttpClient::new(), test_config()).logged_in();

    harness
        .push_handler()
        .handle(&delete_message(RecordType::Steps, &["a"]))
        .await;

    assert_eq!(harness.http.requests_to(Method::Delete, "/sync/Steps").len(), 1);
}

#[tokio::test]
async fn delete_while_logged_out_stays_local() {
    let harness = TestHarness::new();
    harness
        .store
        .seed(RecordType::Steps, [steps_record("a", fixed_now())]);

    harness
        .push_handler()
        .handle(&delete_message(RecordType::Steps, &["a"]))
        .await;

    assert!(harness.store.ids(RecordType::Steps).is_empty());
    assert!(harness.http.requests().is_empty());
}

#[tokio::test]
async fn insert_writes_records() {
    let harness = TestHarness::new();
    let record = HealthRecord::from_value(json!({
        "startTime": "2024-06-01T08:00:00Z",
        "endTime": "2024-06-01T08:30:00Z",
        "count": 900,
    }))
    .unwrap();

    harness
        .push_handler()
        .handle(&insert_message(RecordType::Steps, vec![record]))
        .await;

    let stored = harness.store.records(RecordType::Steps);
    assert_eq!(stored.len(), 1);
    assert!(stored[0].id().is_some());
    assert_eq!(stored[0].get("count"), Some(&json!(900)));
    assert!(harness.notifier.alerts().is_empty());
    assert_eq!(harness.store.initializations(), 1);
}

#[tokio::test]
async fn failed_insert_raises_one_alert() {
    let harness = TestHarness::new();
    // No timestamps, so the store rejects it.
    let invalid = HealthRecord::new().with_field("count", 10);

    harness
        .push_handler()
        .handle(&insert_message(RecordType::Steps, vec![invalid]))
        .await;

    let alerts = harness.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].0, "Push failed for Steps");
    assert!(alerts[0].1.starts_with("Error: "));
    assert!(harness.store.records(RecordType::Steps).is_empty());
    assert!(harness.http.requests().is_empty());
}

#[tokio::test]
async fn undecodable_insert_alerts_with_hint() {
    let harness = TestHarness::new();
    let message = PushMessage {
        op: "PUSH".into(),
        data: json!([{ "recordType": "Mood", "time": "2024-06-01T08:00:00Z" }]).to_string(),
    };

    harness.push_handler().handle(&message).await;

    let alerts = harness.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].0, "Push failed for Mood");
}

#[tokio::test]
async fn unknown_op_and_bad_delete_are_only_logged() {
    let harness = TestHarness::new().logged_in();
    let handler = harness.push_handler();

    handler
        .handle(&PushMessage {
            op: "SYNC".into(),
            data: "{}".into(),
        })
        .await;
    handler
        .handle(&PushMessage {
            op: "DEL".into(),
            data: "not json".into(),
        })
        .await;

    assert!(harness.notifier.events().is_empty());
    assert!(harness.http.requests().is_empty());
}

#[tokio::test]
async fn push_loop_drains_queue_in_order() {
    let harness = TestHarness::new().logged_in();
    harness.store.seed(
        RecordType::Weight,
        [weight_record("w1", fixed_now()), weight_record("w2", fixed_now())],
    );
    let (queue, receiver) = push_queue(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_push_loop(harness.push_handler(), receiver, shutdown_rx));

    queue
        .send(insert_message(
            RecordType::Weight,
            vec![weight_record("w3", fixed_now())],
        ))
        .await
        .unwrap();
    queue
        .send(delete_message(RecordType::Weight, &["w1", "w3"]))
        .await
        .unwrap();
    drop(queue);
    task.await.unwrap();

    assert_eq!(harness.store.ids(RecordType::Weight), vec!["w2"]);
    assert_eq!(harness.store.initializations(), 2);
}

#[tokio::test]
async fn push_loop_stops_on_shutdown() {
    let harness = TestHarness::new();
    let (queue, receiver) = push_queue(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_push_loop(harness.push_handler(), receiver, shutdown_rx));

    shutdown_tx.send_replace(true);
    task.await.unwrap();

    // The receiver is gone, so the queue reports closed.
    assert!(queue.send(delete_message(RecordType::Steps, &["a"])).await.is_err());
}

#[tokio::test]
async fn push_and_pass_share_the_store() {
    let harness = TestHarness::new().logged_in();
    harness
        .push_handler()
        .handle(&insert_message(
            RecordType::Weight,
            vec![weight_record("pushed", fixed_now())],
        ))
        .await;

    let outcome = harness.engine().run_pass_at(fixed_now()).await.unwrap();

    assert_eq!(outcome.report().unwrap().uploaded, 1);
    let window = outcome.report().unwrap().window;
    assert_eq!(
        harness
            .store
            .read_records(RecordType::Weight, &window)
            .unwrap()
            .len(),
        1
    );
    assert!(harness
        .notifier
        .statuses()
        .contains(&(StatusLevel::Info, "Syncing data...".to_string())));
}
