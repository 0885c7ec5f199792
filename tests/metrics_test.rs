//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{BASE_URL, MockTransport, server_error};
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serde_json::{Value, json};

use folio::telemetry;
use folio::{CacheConfig, EndpointRegistry, EndpointType, RequestConfig, RequestExecutor, RetryConfig};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for `name` whose `label` equals `value`.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn executor(transport: Arc<MockTransport>) -> RequestExecutor {
    RequestExecutor::builder("skills")
        .transport(transport)
        .endpoints(
            EndpointRegistry::new()
                .with(
                    EndpointType::Skills,
                    RequestConfig::new(Duration::from_secs(5)).retry_count(2),
                )
                .with(
                    EndpointType::SkillsStats,
                    RequestConfig::new(Duration::from_secs(5)),
                ),
        )
        .cache(CacheConfig::new().max_cache_size(1))
        .retry(
            RetryConfig::new()
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(2)),
        )
        .base_url(BASE_URL)
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hits_and_misses_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let transport = Arc::new(MockTransport::new().route("/skills", json!([{"id": "1", "name": "Rust"}])));

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let executor = executor(transport.clone());
                let _: Vec<Value> = executor.fetch(EndpointType::Skills).await.unwrap();
                let _: Vec<Value> = executor.fetch(EndpointType::Skills).await.unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "ok"),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::REQUEST_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
    assert_eq!(counter_total(&snapshot, telemetry::FALLBACKS_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retries_and_fallbacks_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let transport = Arc::new(MockTransport::new().route("/skills", json!([])));
    transport.fail_next("/skills", vec![server_error(), server_error(), server_error()]);

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let executor = executor(transport.clone());
                let skills: Vec<Value> = executor.fetch(EndpointType::Skills).await.unwrap();
                assert!(skills.is_empty());
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::FALLBACKS_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::REQUESTS_TOTAL, "status", "fallback"),
        1
    );
    assert_eq!(transport.calls("/skills"), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn size_evictions_are_counted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let transport = Arc::new(
        MockTransport::new()
            .route("/skills", json!([]))
            .route("/skills/stats", json!({"totalSkills": 0})),
    );

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let executor = executor(transport.clone());
                let _: Vec<Value> = executor.fetch(EndpointType::Skills).await.unwrap();
                let _: Value = executor.fetch(EndpointType::SkillsStats).await.unwrap();
                assert_eq!(executor.cache_stats().size, 1);
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_EVICTIONS_TOTAL, "reason", "size"),
        1
    );
}
