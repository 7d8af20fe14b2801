//! Poll cycle behaviour against scripted collaborators

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{errored, running, FlakyStore, MockNamespaces, MockRuntime};
use status_cache_manager::{
    ConfigurationError, ServiceDescriptor, ServiceStatus, StatusCacheConfig, StatusCacheError,
    StatusPoller, StatusReader, TickFailurePolicy, TickPhase,
};

struct Harness {
    runtime: MockRuntime,
    namespaces: MockNamespaces,
    store: FlakyStore,
    poller: StatusPoller,
    reader: StatusReader,
}

fn harness(namespaces: &[&str], policy: TickFailurePolicy) -> Harness {
    let runtime = MockRuntime::new();
    let lister = MockNamespaces::new(namespaces);
    let store = FlakyStore::new();
    let config = StatusCacheConfig {
        tick_failure_policy: policy,
        ..Default::default()
    };
    let poller = StatusPoller::new(
        config.clone(),
        Arc::new(runtime.clone()),
        Arc::new(lister.clone()),
        Arc::new(store.clone()),
    )
    .expect("valid configuration");
    let reader =
        StatusReader::from_config(Arc::new(store.clone()), &config).expect("valid configuration");
    Harness {
        runtime,
        namespaces: lister,
        store,
        poller,
        reader,
    }
}

#[tokio::test]
async fn test_successful_tick_caches_every_service_with_metadata() {
    let h = harness(&["default", "billing"], TickFailurePolicy::AbortTick);
    h.runtime.set_services(
        "default",
        vec![running("foo", "v1"), errored("bar", "v2", "exit status 1")],
    );
    h.runtime
        .set_services("billing", vec![running("invoice", "2024.1")]);

    let report = h.poller.run_tick().await;
    assert!(report.is_clean());
    assert_eq!(report.services_written, 3);

    let default = h.reader.list_statuses("default").await.unwrap();
    assert_eq!(default.len(), 2);
    assert_eq!(default["foo:v1"], ServiceStatus::new("running", ""));
    assert_eq!(default["bar:v2"], ServiceStatus::new("error", "exit status 1"));

    let billing = h.reader.list_statuses("billing").await.unwrap();
    assert_eq!(billing["invoice:2024.1"], ServiceStatus::new("running", ""));
}

#[tokio::test]
async fn test_partial_metadata_defaults_to_empty_fields() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime.set_services(
        "default",
        vec![ServiceDescriptor::new("foo", "v1").with_metadata("status", "starting")],
    );

    h.poller.run_tick().await;

    let statuses = h.reader.list_statuses("default").await.unwrap();
    assert_eq!(statuses["foo:v1"], ServiceStatus::new("starting", ""));
}

#[tokio::test]
async fn test_service_without_metadata_leaves_previous_entry_untouched() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime
        .set_services("default", vec![errored("foo", "v1", "oom killed")]);
    h.poller.run_tick().await;

    // Next cycle the runtime reports the service without metadata
    h.runtime
        .set_services("default", vec![ServiceDescriptor::new("foo", "v1")]);
    let report = h.poller.run_tick().await;

    assert_eq!(report.services_written, 0);
    assert_eq!(report.services_skipped, 1);
    let statuses = h.reader.list_statuses("default").await.unwrap();
    assert_eq!(statuses["foo:v1"], ServiceStatus::new("error", "oom killed"));
}

#[tokio::test]
async fn test_empty_metadata_map_leaves_previous_entry_untouched() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime
        .set_services("default", vec![errored("foo", "v1", "oom killed")]);
    h.poller.run_tick().await;

    h.runtime.set_services(
        "default",
        vec![ServiceDescriptor {
            metadata: Some(HashMap::new()),
            ..ServiceDescriptor::new("foo", "v1")
        }],
    );
    let report = h.poller.run_tick().await;

    assert!(report.is_clean());
    assert_eq!(report.services_written, 0);
    assert_eq!(report.services_skipped, 1);
    assert_eq!(h.store.writes(), vec!["status/default/foo:v1"]);
    let statuses = h.reader.list_statuses("default").await.unwrap();
    assert_eq!(statuses["foo:v1"], ServiceStatus::new("error", "oom killed"));
}

#[tokio::test]
async fn test_service_without_metadata_creates_no_entry() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime
        .set_services("default", vec![ServiceDescriptor::new("foo", "v1")]);

    h.poller.run_tick().await;

    assert!(h.store.inner().is_empty());
}

#[tokio::test]
async fn test_vanished_services_are_not_deleted() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime
        .set_services("default", vec![running("foo", "v1"), running("bar", "v1")]);
    h.poller.run_tick().await;

    h.runtime.set_services("default", vec![running("foo", "v1")]);
    h.poller.run_tick().await;

    let statuses = h.reader.list_statuses("default").await.unwrap();
    assert!(statuses.contains_key("bar:v1"));
}

#[tokio::test]
async fn test_namespace_listing_failure_aborts_tick_without_writes() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime.set_services("default", vec![running("foo", "v1")]);
    h.namespaces.set_failing(true);

    let report = h.poller.run_tick().await;

    assert_eq!(report.aborted_in, Some(TickPhase::ListNamespaces));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].namespace, None);
    assert!(h.runtime.reads().is_empty());
    assert!(h.store.writes().is_empty());

    // The next tick proceeds normally
    h.namespaces.set_failing(false);
    let report = h.poller.run_tick().await;
    assert!(report.is_clean());
    assert_eq!(h.store.writes(), vec!["status/default/foo:v1"]);
}

#[tokio::test]
async fn test_runtime_failure_midway_keeps_earlier_writes_and_skips_the_rest() {
    let h = harness(&["ns1", "ns2", "ns3"], TickFailurePolicy::AbortTick);
    h.runtime.set_services("ns1", vec![running("a", "v1")]);
    h.runtime.set_services("ns2", vec![running("b", "v1")]);
    h.runtime.set_services("ns3", vec![running("c", "v1")]);
    h.runtime.fail_namespace("ns2");

    let report = h.poller.run_tick().await;

    assert_eq!(report.aborted_in, Some(TickPhase::ReadServices));
    assert_eq!(report.failed_namespaces(), vec!["ns2"]);
    assert_eq!(report.namespaces_refreshed, 1);
    assert_eq!(h.runtime.reads(), vec!["ns1", "ns2"]);

    assert_eq!(h.reader.list_statuses("ns1").await.unwrap().len(), 1);
    assert!(h.reader.list_statuses("ns2").await.unwrap().is_empty());
    assert!(h.reader.list_statuses("ns3").await.unwrap().is_empty());

    // Recovered on the following tick
    h.runtime.recover_namespace("ns2");
    let report = h.poller.run_tick().await;
    assert!(report.is_clean());
    assert_eq!(h.reader.list_statuses("ns3").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_skip_namespace_policy_continues_past_failures() {
    let h = harness(&["ns1", "ns2", "ns3"], TickFailurePolicy::SkipNamespace);
    h.runtime.set_services("ns1", vec![running("a", "v1")]);
    h.runtime.set_services("ns3", vec![running("c", "v1")]);
    h.runtime.fail_namespace("ns2");

    let report = h.poller.run_tick().await;

    assert_eq!(report.aborted_in, None);
    assert_eq!(report.failed_namespaces(), vec!["ns2"]);
    assert_eq!(report.namespaces_refreshed, 2);
    assert_eq!(h.reader.list_statuses("ns3").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_write_failure_aborts_remainder_of_tick() {
    let h = harness(&["ns1", "ns2"], TickFailurePolicy::AbortTick);
    h.runtime.set_services(
        "ns1",
        vec![running("a", "v1"), running("broken", "v1"), running("c", "v1")],
    );
    h.runtime.set_services("ns2", vec![running("d", "v1")]);
    h.store.fail_writes_matching("broken");

    let report = h.poller.run_tick().await;

    assert_eq!(report.aborted_in, Some(TickPhase::DeriveAndWrite));
    assert_eq!(report.services_written, 1);
    assert_eq!(h.store.writes(), vec!["status/ns1/a:v1"]);
    assert_eq!(h.runtime.reads(), vec!["ns1"]);
}

#[tokio::test]
async fn test_write_failure_under_skip_policy_moves_to_next_namespace() {
    let h = harness(&["ns1", "ns2"], TickFailurePolicy::SkipNamespace);
    h.runtime.set_services(
        "ns1",
        vec![running("broken", "v1"), running("never", "v1")],
    );
    h.runtime.set_services("ns2", vec![running("d", "v1")]);
    h.store.fail_writes_matching("broken");

    let report = h.poller.run_tick().await;

    assert_eq!(report.aborted_in, None);
    assert_eq!(report.failures[0].phase, TickPhase::DeriveAndWrite);
    assert_eq!(h.store.writes(), vec!["status/ns2/d:v1"]);
}

#[tokio::test]
async fn test_writing_same_status_twice_is_idempotent() {
    let h = harness(&["default"], TickFailurePolicy::AbortTick);
    h.runtime.set_services("default", vec![running("foo", "v1")]);

    h.poller.run_tick().await;
    let once = h.store.inner().snapshot();
    h.poller.run_tick().await;
    let twice = h.store.inner().snapshot();

    assert_eq!(once, twice);
    assert_eq!(h.store.writes().len(), 2);
}

#[tokio::test]
async fn test_namespaces_that_break_key_grammar_are_skipped() {
    let h = harness(&["team/a", "default"], TickFailurePolicy::AbortTick);
    h.runtime.set_services("team/a", vec![running("foo", "v1")]);
    h.runtime.set_services("default", vec![running("bar", "v1")]);

    let report = h.poller.run_tick().await;

    assert!(report.is_clean());
    assert_eq!(h.runtime.reads(), vec!["default"]);
    assert_eq!(h.store.writes(), vec!["status/default/bar:v1"]);
}

#[tokio::test]
async fn test_custom_key_prefix() {
    let runtime = MockRuntime::new();
    runtime.set_services("default", vec![running("foo", "v1")]);
    let store = FlakyStore::new();
    let config = StatusCacheConfig {
        key_prefix: "health/".to_string(),
        ..Default::default()
    };
    let poller = StatusPoller::new(
        config.clone(),
        Arc::new(runtime),
        Arc::new(MockNamespaces::new(&["default"])),
        Arc::new(store.clone()),
    )
    .unwrap();

    poller.run_tick().await;

    assert_eq!(store.writes(), vec!["health/default/foo:v1"]);
    let reader = StatusReader::from_config(Arc::new(store), &config).unwrap();
    assert_eq!(reader.list_statuses("default").await.unwrap().len(), 1);
}

#[test]
fn test_poller_rejects_zero_interval() {
    let err = StatusPoller::new(
        StatusCacheConfig {
            poll_interval_seconds: 0,
            ..Default::default()
        },
        Arc::new(MockRuntime::new()),
        Arc::new(MockNamespaces::new(&["default"])),
        Arc::new(FlakyStore::new()),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        StatusCacheError::Configuration(ConfigurationError::InvalidValue { ref field, .. })
            if field == "poll_interval_seconds"
    ));
}

#[test]
fn test_prefix_that_breaks_key_shape_is_rejected_up_front() {
    let config = StatusCacheConfig {
        key_prefix: "a/b/".to_string(),
        ..Default::default()
    };
    let store = FlakyStore::new();

    let poller = StatusPoller::new(
        config.clone(),
        Arc::new(MockRuntime::new()),
        Arc::new(MockNamespaces::new(&["default"])),
        Arc::new(store.clone()),
    );
    assert!(matches!(poller, Err(StatusCacheError::Configuration(_))));

    let reader = StatusReader::from_config(Arc::new(store), &config);
    assert!(matches!(reader, Err(StatusCacheError::Configuration(_))));
}
