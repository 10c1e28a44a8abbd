//! End-to-end behaviour of the engine: submit, drain, flush.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects,
    missing_docs
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use eventcounter_core::{
    CountSnapshot, EngineConfig, EngineError, EventEngine, JsonFileSink, MemorySink, Phase,
};
use eventcounter_types::EventKind;
use tokio::task::JoinSet;

fn engine_with(capacity: usize) -> (Arc<EventEngine>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let engine = EventEngine::new(
        EngineConfig {
            queue_capacity: capacity,
        },
        sink.clone(),
    )
    .unwrap();
    (Arc::new(engine), sink)
}

fn count_in(artifacts: &CountSnapshot, kind: EventKind, user: &str) -> u64 {
    artifacts
        .get(&kind)
        .and_then(|users| users.get(user))
        .copied()
        .unwrap_or(0)
}

#[tokio::test]
async fn redelivered_message_is_counted_once() {
    let (engine, sink) = engine_with(100);

    assert_eq!(engine.submit("m1", "u1", EventKind::Created).await, Ok(()));
    assert_eq!(
        engine.submit("m1", "u1", EventKind::Created).await,
        Err(EngineError::DuplicateMessage {
            message_id: "m1".to_owned()
        })
    );

    engine.begin_shutdown().await.unwrap();
    assert_eq!(count_in(&sink.artifacts(), EventKind::Created, "u1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_with_overlapping_ids_count_each_id_once() {
    let (engine, sink) = engine_with(8);

    let mut callers = JoinSet::new();
    for _ in 0..10 {
        let engine = Arc::clone(&engine);
        callers.spawn(async move {
            let mut accepted = 0_u32;
            for i in 0..50 {
                if engine
                    .submit(&format!("msg-{i}"), "u1", EventKind::Updated)
                    .await
                    .is_ok()
                {
                    accepted = accepted.saturating_add(1);
                }
            }
            accepted
        });
    }

    let mut accepted = 0_u32;
    while let Some(joined) = callers.join_next().await {
        accepted = accepted.saturating_add(joined.unwrap());
    }
    assert_eq!(accepted, 50);

    engine.begin_shutdown().await.unwrap();
    assert_eq!(count_in(&sink.artifacts(), EventKind::Updated, "u1"), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn flushed_total_equals_distinct_accepted_ids() {
    let (engine, sink) = engine_with(4);
    let users = ["alice", "bob", "carol"];

    let ids: Vec<String> = (0..300).map(|_| uuid::Uuid::now_v7().to_string()).collect();
    let mut callers = JoinSet::new();
    for (n, id) in ids.iter().enumerate() {
        let engine = Arc::clone(&engine);
        let id = id.clone();
        let user = users.get(n % users.len()).copied().unwrap_or("alice");
        let kind = EventKind::ALL.get(n % EventKind::ALL.len()).copied().unwrap();
        callers.spawn(async move {
            // Every id is delivered twice.
            let first = engine.submit(&id, user, kind).await;
            let second = engine.submit(&id, user, kind).await;
            (first, second)
        });
    }
    while let Some(joined) = callers.join_next().await {
        let (first, second) = joined.unwrap();
        assert_eq!(first, Ok(()));
        assert!(matches!(second, Err(EngineError::DuplicateMessage { .. })));
    }

    engine.begin_shutdown().await.unwrap();

    let total: u64 = sink
        .artifacts()
        .values()
        .flat_map(BTreeMap::values)
        .sum();
    assert_eq!(total, 300);
    assert_eq!(engine.accepted(), 300);
}

#[tokio::test]
async fn kinds_are_counted_independently() {
    let (engine, sink) = engine_with(100);

    engine.submit("a", "u1", EventKind::Created).await.unwrap();
    engine.submit("b", "u1", EventKind::Updated).await.unwrap();
    engine.submit("c", "u1", EventKind::Updated).await.unwrap();
    engine.submit("d", "u2", EventKind::Deleted).await.unwrap();

    engine.begin_shutdown().await.unwrap();
    let artifacts = sink.artifacts();

    assert_eq!(count_in(&artifacts, EventKind::Created, "u1"), 1);
    assert_eq!(count_in(&artifacts, EventKind::Updated, "u1"), 2);
    assert_eq!(count_in(&artifacts, EventKind::Deleted, "u1"), 0);
    assert_eq!(count_in(&artifacts, EventKind::Deleted, "u2"), 1);
}

#[tokio::test]
async fn submit_after_shutdown_is_refused_and_not_flushed() {
    let (engine, sink) = engine_with(100);
    engine.submit("m1", "u1", EventKind::Created).await.unwrap();

    engine.begin_shutdown().await.unwrap();
    assert_eq!(engine.phase(), Phase::Flushed);

    assert_eq!(
        engine.submit("m2", "u2", EventKind::Created).await,
        Err(EngineError::ServiceClosed)
    );
    // The refused id was never recorded.
    assert_eq!(engine.accepted(), 1);

    let artifacts = sink.artifacts();
    assert_eq!(count_in(&artifacts, EventKind::Created, "u2"), 0);
    assert_eq!(count_in(&artifacts, EventKind::Created, "u1"), 1);
}

#[tokio::test]
async fn kind_without_events_produces_no_artifact() {
    let (engine, sink) = engine_with(100);
    engine.submit("m1", "u1", EventKind::Created).await.unwrap();
    engine.submit("m2", "u1", EventKind::Updated).await.unwrap();

    engine.begin_shutdown().await.unwrap();
    let artifacts = sink.artifacts();

    assert!(artifacts.contains_key(&EventKind::Created));
    assert!(artifacts.contains_key(&EventKind::Updated));
    assert!(!artifacts.contains_key(&EventKind::Deleted));
}

#[tokio::test]
async fn shutdown_with_no_events_writes_nothing() {
    let (engine, sink) = engine_with(100);
    engine.begin_shutdown().await.unwrap();
    assert!(sink.artifacts().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_ok_submission_survives_a_concurrent_shutdown() {
    // Capacity 1 keeps senders parked on full queues while shutdown begins.
    let (engine, sink) = engine_with(1);

    let mut callers = JoinSet::new();
    for caller in 0..8 {
        let engine = Arc::clone(&engine);
        callers.spawn(async move {
            let mut ok = 0_u64;
            for i in 0..200 {
                match engine
                    .submit(&format!("c{caller}-m{i}"), "u1", EventKind::Deleted)
                    .await
                {
                    Ok(()) => ok = ok.saturating_add(1),
                    Err(EngineError::ServiceClosed) => break,
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            ok
        });
    }

    tokio::task::yield_now().await;
    engine.begin_shutdown().await.unwrap();

    let mut ok_total = 0_u64;
    while let Some(joined) = callers.join_next().await {
        ok_total = ok_total.saturating_add(joined.unwrap());
    }

    assert_eq!(engine.in_flight(), 0);
    assert_eq!(count_in(&sink.artifacts(), EventKind::Deleted, "u1"), ok_total);
}

#[tokio::test]
async fn cancelled_submission_does_not_stall_the_drain() {
    let (engine, _sink) = engine_with(1);

    engine.submit("m1", "u1", EventKind::Created).await.unwrap();
    // The worker may not have run yet, so this send can park on a full queue.
    let parked = tokio::time::timeout(
        std::time::Duration::from_millis(1),
        engine.submit("m2", "u1", EventKind::Created),
    )
    .await;
    drop(parked);

    let drained =
        tokio::time::timeout(std::time::Duration::from_secs(5), engine.begin_shutdown()).await;
    assert!(matches!(drained, Ok(Ok(()))));
    assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn json_sink_writes_one_file_per_non_empty_kind() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EventEngine::new(
        EngineConfig::default(),
        Arc::new(JsonFileSink::new(dir.path())),
    )
    .unwrap();

    engine.submit("m1", "u1", EventKind::Updated).await.unwrap();
    engine.submit("m2", "u1", EventKind::Updated).await.unwrap();
    engine.submit("m3", "u2", EventKind::Updated).await.unwrap();
    engine.begin_shutdown().await.unwrap();

    let written = std::fs::read_to_string(dir.path().join("updated.json")).unwrap();
    assert_eq!(written, "{\n  \"u1\": 2,\n  \"u2\": 1\n}");
    assert!(!dir.path().join("created.json").exists());
    assert!(!dir.path().join("deleted.json").exists());
}

#[tokio::test]
async fn unwritable_output_fails_shutdown_but_reaches_flushed() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EventEngine::new(
        EngineConfig::default(),
        Arc::new(JsonFileSink::new(dir.path().join("missing"))),
    )
    .unwrap();

    engine.submit("m1", "u1", EventKind::Created).await.unwrap();
    let result = engine.begin_shutdown().await;

    assert!(matches!(
        result,
        Err(EngineError::OutputWriteFailed {
            kind: EventKind::Created,
            ..
        })
    ));
    assert_eq!(engine.phase(), Phase::Flushed);
}
