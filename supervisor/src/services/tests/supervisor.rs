//! Tests for the recommender supervisor
//!
//! Lifecycle behavior is exercised against real `sh` children with the
//! health prober mocked, so readiness and failure timing is fully under
//! test control.

use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common;
use crate::error::SupervisorError;
use crate::services::supervisor::RecommenderSupervisor;
use crate::state::ServiceState;
use crate::traits::{MockHealthProber, ProbeOutcome, ServiceSupervisor};
use shared::HealthState;

fn ready_prober(expected_polls: usize) -> MockHealthProber {
    let mut prober = MockHealthProber::new();
    prober
        .expect_poll_until_ready()
        .times(expected_polls)
        .returning(|_, _, _| true);
    prober
}

/// Wait until the predicate holds or the bound elapses
async fn wait_until<F: Fn() -> bool>(predicate: F, bound: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < bound {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    predicate()
}

#[tokio::test]
async fn start_fails_with_configuration_error_when_entry_missing() {
    let dir = TempDir::new().unwrap();
    let config = common::test_config(std::path::Path::new("/nonexistent/recommender.py"), &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(0);

    let supervisor = RecommenderSupervisor::new(config, prober);

    match supervisor.start().await {
        Err(SupervisorError::Configuration { path }) => {
            assert!(path.contains("recommender.py"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert!(!supervisor.is_running());
    assert_eq!(supervisor.state(), ServiceState::Idle);
}

#[tokio::test]
async fn start_spawns_and_reports_ready() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let supervisor = RecommenderSupervisor::new(config, ready_prober(1));

    assert!(!supervisor.is_running());
    assert!(supervisor.start().await.unwrap());
    assert!(supervisor.is_running());
    assert!(matches!(supervisor.state(), ServiceState::Running { .. }));

    assert!(supervisor.stop().await.unwrap());
}

#[tokio::test]
async fn start_is_a_noop_while_running() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    // A second spawn would require a second poll; expect exactly one
    let supervisor = RecommenderSupervisor::new(config, ready_prober(1));

    assert!(supervisor.start().await.unwrap());
    let first_pid = supervisor.state().pid();

    assert!(supervisor.start().await.unwrap());
    assert_eq!(supervisor.state().pid(), first_pid);

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn start_continues_when_never_healthy_but_alive() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(1).returning(|_, _, _| false);

    let supervisor = RecommenderSupervisor::new(config, prober);

    // Best-effort optimism: a slow starter that is still alive is accepted
    assert!(supervisor.start().await.unwrap());
    assert!(supervisor.is_running());

    supervisor.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn start_fails_when_child_exits_before_healthy() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "crasher.sh", "exit 3");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(1).returning(|_, _, _| {
        // Leave time for the crash to be observed before polling gives up
        std::thread::sleep(Duration::from_millis(300));
        false
    });

    let supervisor = RecommenderSupervisor::new(config, prober);

    match supervisor.start().await {
        Err(SupervisorError::Spawn { message }) => {
            assert!(message.contains("exited"), "message: {message}");
        }
        other => panic!("expected spawn error, got {other:?}"),
    }
    assert!(!supervisor.is_running());
}

#[tokio::test]
async fn stop_is_a_noop_when_not_running() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(0);

    let supervisor = RecommenderSupervisor::new(config, prober);

    assert!(supervisor.stop().await.unwrap());
    assert_eq!(supervisor.state(), ServiceState::Idle);
}

#[tokio::test]
async fn stop_terminates_the_child_within_the_grace_period() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let supervisor = RecommenderSupervisor::new(config, ready_prober(1));

    supervisor.start().await.unwrap();
    assert!(supervisor.stop().await.unwrap());

    assert!(!supervisor.is_running());
    assert_eq!(supervisor.state(), ServiceState::Idle);
}

#[cfg(unix)]
#[tokio::test]
async fn stop_resolves_when_the_grace_period_elapses_first() {
    let dir = TempDir::new().unwrap();
    // Ignores SIGTERM, so the exit event cannot fire within the grace
    let entry = common::script_entry(&dir, "stubborn.sh", "trap '' TERM\nwhile :; do sleep 1; done");
    let config = common::test_config(&entry, &dir).with_stop_grace(Duration::from_millis(200));

    let supervisor = RecommenderSupervisor::new(config, ready_prober(1));

    supervisor.start().await.unwrap();
    let pid = supervisor.state().pid().expect("running pid");

    let started = Instant::now();
    assert!(supervisor.stop().await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(2), "stop stayed bounded");

    // Exit unconfirmed: the signal was sent but the process is still
    // tracked until the exit monitor observes the event
    assert!(matches!(supervisor.state(), ServiceState::Stopping { .. }));
    assert!(supervisor.is_running());

    common::force_kill(pid);
    assert!(
        wait_until(|| !supervisor.is_running(), Duration::from_secs(5)).await,
        "exit monitor clears state after the kill"
    );
}

#[tokio::test]
async fn restart_replaces_the_process() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let supervisor = RecommenderSupervisor::new(config, ready_prober(2));

    supervisor.start().await.unwrap();
    let first_pid = supervisor.state().pid().expect("first pid");

    assert!(supervisor.restart().await.unwrap());
    let second_pid = supervisor.state().pid().expect("second pid");

    assert_ne!(first_pid, second_pid);
    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn health_status_is_offline_without_probing() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_probe_once().times(0);
    prober.expect_poll_until_ready().times(0);

    let supervisor = RecommenderSupervisor::new(config, prober);

    let status = supervisor.health_status().await;
    assert_eq!(status.status, HealthState::Offline);
    assert!(status.message.unwrap().contains("not running"));
}

#[tokio::test]
async fn health_status_merges_upstream_payload_when_online() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(1).returning(|_, _, _| true);
    prober.expect_probe_once().times(1).returning(|_, _| ProbeOutcome::Up {
        payload: Some(json!({ "uptime_seconds": 12 })),
    });

    let supervisor = RecommenderSupervisor::new(config, prober);
    supervisor.start().await.unwrap();

    let status = supervisor.health_status().await;
    assert_eq!(status.status, HealthState::Online);
    assert_eq!(status.details["uptime_seconds"], 12);

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn health_status_maps_probe_failure_to_error() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(1).returning(|_, _, _| true);
    prober
        .expect_probe_once()
        .times(1)
        .returning(|_, _| ProbeOutcome::down("connection refused"));

    let supervisor = RecommenderSupervisor::new(config, prober);
    supervisor.start().await.unwrap();

    let status = supervisor.health_status().await;
    assert_eq!(status.status, HealthState::Error);
    assert!(status.message.unwrap().contains("connection refused"));

    supervisor.stop().await.unwrap();
}

#[tokio::test]
async fn performance_stats_reports_an_error_object_when_offline() {
    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);

    let mut prober = MockHealthProber::new();
    prober.expect_poll_until_ready().times(0);

    let supervisor = RecommenderSupervisor::new(config, prober);

    let stats = supervisor.performance_stats().await;
    assert!(stats["error"].as_str().unwrap().contains("not running"));
}

#[tokio::test]
async fn performance_stats_passes_through_upstream_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recommendations/performance-stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cache_hits": 5 })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let entry = common::script_entry(&dir, "sleeper.sh", "exec sleep 30");
    let config = common::test_config(&entry, &dir);
    let config = crate::config::RecommenderConfig {
        port: server.address().port(),
        ..config
    };

    let supervisor = RecommenderSupervisor::new(config, ready_prober(1));
    supervisor.start().await.unwrap();

    let stats = supervisor.performance_stats().await;
    assert_eq!(stats, json!({ "cache_hits": 5 }));

    supervisor.stop().await.unwrap();
}
