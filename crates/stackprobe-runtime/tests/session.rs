//! End-to-end monitoring sessions against local processes and HTTP responders.
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{Reply, closed_port, serve};
use mockall::mock;
use stackprobe_core::{
    ComponentKind, ComponentSpec, ComponentStatus, ConfigValidator, EndpointSpec, MonitorConfig,
    OverallStatus, PatternSpec, Priority, ProcessSpec, ValidationOutcome,
};
use stackprobe_runtime::MonitoringSession;

mock! {
    Validator {}

    #[async_trait]
    impl ConfigValidator for Validator {
        async fn validate(&self) -> ValidationOutcome;
    }
}

fn config(components: Vec<ComponentSpec>) -> MonitorConfig {
    MonitorConfig {
        startup_timeout_ms: 2_000,
        poll_interval_ms: 50,
        probe_timeout_ms: 500,
        run_deadline_ms: 15_000,
        drain_timeout_ms: 500,
        components,
        ..MonitorConfig::default()
    }
}

fn script(body: &str) -> ProcessSpec {
    ProcessSpec::new("sh").args(["-c", body])
}

fn component(name: &str, kind: ComponentKind, port: u16) -> ComponentSpec {
    ComponentSpec {
        ready_port: Some(port),
        ..ComponentSpec::new(name, kind)
    }
}

async fn run(config: MonitorConfig) -> stackprobe_core::DiagnosticRun {
    MonitoringSession::new(config)
        .unwrap()
        .with_grace(Duration::from_secs(1))
        .run()
        .await
}

#[tokio::test]
async fn all_markers_and_probes_ok_is_healthy() {
    let port = serve(|_| Reply::ok("{}")).await;
    let base = format!("http://127.0.0.1:{port}");

    let frontend = ComponentSpec {
        essential: true,
        process: Some(script("echo 'webpack compiled successfully'; exec sleep 30")),
        endpoints: vec![EndpointSpec::new(format!("{base}/"))],
        ..component("frontend", ComponentKind::Frontend, port)
    };
    let backend = ComponentSpec {
        process: Some(script("echo 'Backend is listening on :7007' >&2; exec sleep 30")),
        endpoints: vec![EndpointSpec::new(format!("{base}/healthcheck"))],
        ..component("backend", ComponentKind::Backend, port)
    };
    let api = ComponentSpec {
        process: Some(script("echo 'api ready'; exec sleep 30")),
        endpoints: vec![
            EndpointSpec::new(format!("{base}/api/catalog/entities")),
            EndpointSpec::new(format!("{base}/api/auth/providers")),
        ],
        patterns: Some(vec![
            PatternSpec::contains("api ready").to_status(ComponentStatus::Running),
        ]),
        ..component("api", ComponentKind::Api, port)
    };

    let started = Instant::now();
    let run = run(config(vec![frontend, backend, api])).await;

    assert_eq!(run.overall_status, OverallStatus::Healthy, "{run:#?}");
    assert!(run.critical_issues.is_empty());
    assert!(run.recommendations.is_empty());
    assert_eq!(run.exit_code(), 0);
    for name in ["frontend", "backend", "api"] {
        let c = run.component(name).unwrap();
        assert_eq!(c.status, ComponentStatus::Healthy, "{name}: {c:#?}");
        assert!(c.visited(ComponentStatus::Starting));
    }
    assert_eq!(run.probes.len(), 4);
    assert_eq!(run.performance.page_load_ms.len(), 3);
    // Teardown does not wait out the 30s sleeps.
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn native_dependency_failure_degrades_backend() {
    // The slow page keeps the run open until the backend has printed.
    let port = serve(|_| Reply::ok("{}").delayed(Duration::from_secs(1))).await;

    let frontend = ComponentSpec {
        essential: true,
        endpoints: vec![EndpointSpec::new(format!("http://127.0.0.1:{port}/"))],
        ..component("frontend", ComponentKind::Frontend, port)
    };
    let backend = ComponentSpec {
        process: Some(script(
            "echo 'Listening on :7007'; echo \"Error: Cannot find module 'better-sqlite3'\"; exec sleep 30",
        )),
        ..component("backend", ComponentKind::Backend, port)
    };

    let mut cfg = config(vec![frontend, backend]);
    cfg.probe_timeout_ms = 3_000;
    let run = run(cfg).await;

    assert_eq!(run.component("frontend").unwrap().status, ComponentStatus::Healthy);
    let backend = run.component("backend").unwrap();
    assert_eq!(backend.status, ComponentStatus::Degraded, "{backend:#?}");
    assert!(backend.errors.iter().any(|e| e.contains("better-sqlite3")));
    assert!(run.critical_issues.is_empty());
    assert_eq!(run.flagged_issues.len(), 1);
    assert_eq!(run.overall_status, OverallStatus::Healthy);
    assert_eq!(run.recommendations.len(), 1);
    assert_eq!(run.recommendations[0].priority, Priority::Medium);
}

#[tokio::test]
async fn probe_timeouts_on_essential_components_escalate() {
    let port = serve(|path| match path {
        "/slow" => Reply::ok("{}").delayed(Duration::from_secs(2)),
        "/broken" => Reply::status(500),
        _ => Reply::ok("{}"),
    })
    .await;
    let base = format!("http://127.0.0.1:{port}");

    let api = ComponentSpec {
        essential: true,
        endpoints: vec![EndpointSpec::new(format!("{base}/slow"))],
        ..component("api", ComponentKind::Api, port)
    };

    let run_one = run(config(vec![api.clone()])).await;
    let api_state = run_one.component("api").unwrap();
    assert_eq!(api_state.status, ComponentStatus::Failed);
    assert_eq!(api_state.errors.len(), 1);
    assert_eq!(run_one.critical_issues.len(), 1);
    assert_eq!(run_one.overall_status, OverallStatus::Warning);
    assert_eq!(run_one.exit_code(), 0);

    let catalog = ComponentSpec {
        essential: true,
        endpoints: vec![EndpointSpec::new(format!("{base}/broken"))],
        ..component("catalog", ComponentKind::Catalog, port)
    };
    let closed = closed_port().await;
    let templates = ComponentSpec {
        essential: true,
        endpoints: vec![EndpointSpec::new(format!("http://127.0.0.1:{closed}/"))],
        ..component("templates", ComponentKind::Templates, closed)
    };
    let mut cfg = config(vec![api, catalog, templates]);
    cfg.startup_timeout_ms = 300;

    let run_three = run(cfg).await;
    assert_eq!(run_three.critical_issues.len(), 3);
    assert_eq!(run_three.overall_status, OverallStatus::Critical);
    assert_eq!(run_three.exit_code(), 1);
    assert_eq!(
        run_three.component("templates").unwrap().status,
        ComponentStatus::Unreachable
    );
    assert_eq!(run_three.recommendations[0].priority, Priority::High);
}

#[tokio::test]
async fn missing_executable_fails_without_starting() {
    let port = serve(|_| Reply::ok("{}")).await;

    let backend = ComponentSpec {
        process: Some(ProcessSpec::new("definitely-not-installed-backend")),
        endpoints: vec![EndpointSpec::new(format!("http://127.0.0.1:{port}/"))],
        ..component("backend", ComponentKind::Backend, port)
    };

    let run = run(config(vec![backend])).await;

    let backend = run.component("backend").unwrap();
    assert_eq!(backend.status, ComponentStatus::Failed);
    assert!(!backend.visited(ComponentStatus::Starting));
    assert_eq!(backend.transitions.len(), 1);
    assert!(run.probes.is_empty());
    assert_eq!(run.critical_issues.len(), 1);
}

#[tokio::test]
async fn deadline_marks_pending_components_unreachable() {
    let closed = closed_port().await;
    let backend = ComponentSpec {
        process: Some(script("exec sleep 30")),
        ..component("backend", ComponentKind::Backend, closed)
    };
    let mut cfg = config(vec![backend]);
    cfg.startup_timeout_ms = 10_000;
    cfg.run_deadline_ms = 400;

    let started = Instant::now();
    let run = run(cfg).await;

    let backend = run.component("backend").unwrap();
    assert_eq!(backend.status, ComponentStatus::Unreachable);
    assert!(
        backend
            .last_signal
            .as_deref()
            .is_some_and(|s| s.contains("deadline"))
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn crashed_process_fails_without_waiting_for_its_port() {
    let closed = closed_port().await;
    let backend = ComponentSpec {
        essential: true,
        process: Some(script("echo boom; exit 1")),
        ..component("backend", ComponentKind::Backend, closed)
    };
    let mut cfg = config(vec![backend]);
    cfg.startup_timeout_ms = 10_000;

    let started = Instant::now();
    let run = run(cfg).await;

    let backend = run.component("backend").unwrap();
    assert_eq!(backend.status, ComponentStatus::Failed, "{backend:#?}");
    assert!(!backend.visited(ComponentStatus::Unreachable));
    assert_eq!(
        backend
            .errors
            .iter()
            .filter(|e| e.contains("Process exited with code 1"))
            .count(),
        1
    );
    assert_eq!(run.critical_issues.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn deadline_during_endpoint_checks_is_not_healthy() {
    // Port accepts at once; every response outlives the run.
    let port = serve(|_| Reply::ok("{}").delayed(Duration::from_secs(30))).await;
    let api = ComponentSpec {
        essential: true,
        process: Some(script("echo 'api ready'; exec sleep 30")),
        endpoints: vec![EndpointSpec::new(format!("http://127.0.0.1:{port}/api/health"))],
        ..component("api", ComponentKind::Api, port)
    };
    let mut cfg = config(vec![api]);
    cfg.probe_timeout_ms = 10_000;
    cfg.run_deadline_ms = 800;

    let started = Instant::now();
    let run = run(cfg).await;

    let api = run.component("api").unwrap();
    assert!(api.visited(ComponentStatus::Running), "{api:#?}");
    assert_eq!(api.status, ComponentStatus::Unreachable);
    assert_eq!(
        api.last_signal.as_deref(),
        Some("Run deadline expired during endpoint probes")
    );
    assert_ne!(run.overall_status, OverallStatus::Healthy);
    assert_eq!(run.critical_issues.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Validator that never finishes inside a short run.
struct SlowValidator(Duration);

#[async_trait]
impl ConfigValidator for SlowValidator {
    async fn validate(&self) -> ValidationOutcome {
        tokio::time::sleep(self.0).await;
        ValidationOutcome::passed()
    }
}

#[tokio::test]
async fn deadline_during_validation_records_a_failed_outcome() {
    let port = serve(|_| Reply::ok("{}")).await;
    let frontend = ComponentSpec {
        endpoints: vec![EndpointSpec::new(format!("http://127.0.0.1:{port}/"))],
        ..component("frontend", ComponentKind::Frontend, port)
    };
    let mut cfg = config(vec![frontend]);
    cfg.run_deadline_ms = 1_000;

    let started = Instant::now();
    let run = MonitoringSession::new(cfg)
        .unwrap()
        .with_validator(Arc::new(SlowValidator(Duration::from_secs(30))))
        .run()
        .await;

    assert_eq!(run.component("frontend").unwrap().status, ComponentStatus::Healthy);
    let validation = run.config_validation.as_ref().unwrap();
    assert!(!validation.passed);
    assert!(validation.errors[0].contains("run deadline"));
    assert_eq!(run.overall_status, OverallStatus::Healthy);
    assert_eq!(run.recommendations.len(), 1);
    assert_eq!(run.recommendations[0].category, "Configuration");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn failed_validation_is_reported_without_critical_issue() {
    let port = serve(|_| Reply::ok("{}")).await;
    let frontend = ComponentSpec {
        endpoints: vec![EndpointSpec::new(format!("http://127.0.0.1:{port}/"))],
        ..component("frontend", ComponentKind::Frontend, port)
    };

    let mut validator = MockValidator::new();
    validator
        .expect_validate()
        .times(1)
        .returning(|| ValidationOutcome::failed(vec!["app-config.yaml: bad owner".to_string()]));

    let run = MonitoringSession::new(config(vec![frontend]))
        .unwrap()
        .with_validator(Arc::new(validator))
        .run()
        .await;

    assert_eq!(run.overall_status, OverallStatus::Healthy);
    assert_eq!(
        run.config_validation,
        Some(ValidationOutcome::failed(vec![
            "app-config.yaml: bad owner".to_string()
        ]))
    );
    assert_eq!(run.recommendations.len(), 1);
    assert_eq!(run.recommendations[0].category, "Configuration");
}
