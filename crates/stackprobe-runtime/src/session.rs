//! The monitoring control loop.
//!
//! A [`MonitoringSession`] is built for exactly one run. It owns the process
//! supervisor and the [`DiagnosticRun`] being accumulated, and it is the only
//! code that writes to the run. Output watchers are spawned tasks that
//! classify lines and send [`RunUpdate`]s back over a channel. Each phase
//! is a stream of per-component units that the loop races against the
//! update channel and the run deadline, so an expired phase knows which
//! components it was still working on.
//!
//! Whatever happens, every process is torn down before the run is
//! aggregated.

use std::collections::{BTreeMap, BTreeSet};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream::{self, FuturesUnordered, Stream};
use stackprobe_core::{
    ComponentSpec, ComponentStatus, ConfigError, ConfigValidator, CoreError, DiagnosticRun,
    MonitorConfig, OrchestratorError, OutputClassifier, PatternTable, RunUpdate,
    ValidationOutcome, aggregate, recommend_for_run, validate_config,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, error, info, warn};

use crate::probe::{ProbeRunner, performance_issue};
use crate::process::{ExitWatch, LineStream, ProcessSupervisor};
use crate::readiness::wait_for_ready;

/// Key of the validation unit in the pending set.
const VALIDATION_UNIT: &str = "config-validation";

/// Work finished for one key, as the updates it produced.
type Unit = (String, Vec<RunUpdate>);

/// One diagnostic run over a configured set of components.
pub struct MonitoringSession {
    config: MonitorConfig,
    tables: BTreeMap<String, PatternTable>,
    supervisor: ProcessSupervisor,
    probes: ProbeRunner,
    validator: Option<Arc<dyn ConfigValidator>>,
    run: DiagnosticRun,
    exits: BTreeMap<String, ExitWatch>,
    updates_tx: Option<UnboundedSender<RunUpdate>>,
    updates: UnboundedReceiver<RunUpdate>,
    watchers: JoinSet<()>,
}

impl MonitoringSession {
    /// Validate `config` and prepare a run over its components.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        validate_config(&config)?;
        let tables = config
            .components
            .iter()
            .map(|c| Ok((c.name.clone(), c.pattern_table()?)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;
        let probes = ProbeRunner::new()?;
        let run = DiagnosticRun::new(
            Utc::now(),
            config.components.iter().map(ComponentSpec::component),
        );
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            tables,
            supervisor: ProcessSupervisor::new(),
            probes,
            validator: None,
            run,
            exits: BTreeMap::new(),
            updates_tx: Some(tx),
            updates: rx,
            watchers: JoinSet::new(),
        })
    }

    /// Run an external config validator as part of the session.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ConfigValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Override the SIGTERM grace period used at teardown.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.supervisor = ProcessSupervisor::new().with_grace(grace);
        self
    }

    /// Pin the run timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.run.timestamp = timestamp;
        self
    }

    /// Execute every phase and return the finished run.
    pub async fn run(mut self) -> DiagnosticRun {
        let deadline = Instant::now() + self.config.run_deadline();
        info!(
            components = self.config.components.len(),
            deadline_ms = self.config.run_deadline_ms,
            "Starting diagnostic run"
        );

        let outcome = self.execute(deadline).await;
        self.teardown().await;
        let drained = self.drain().await;
        self.finalize(outcome.and(drained))
    }

    /// Each phase handles its own deadline expiry and reports whether the
    /// run may continue.
    async fn execute(&mut self, deadline: Instant) -> Result<(), OrchestratorError> {
        self.launch().await?;

        if self.await_readiness(deadline).await? && self.probe_components(deadline).await? {
            self.validate(deadline).await?;
        }
        Ok(())
    }

    async fn launch(&mut self) -> Result<(), OrchestratorError> {
        let tx = self
            .updates_tx
            .clone()
            .ok_or(OrchestratorError::ChannelClosed)?;

        for spec in &self.config.components {
            let Some(process) = &spec.process else {
                continue;
            };
            match self.supervisor.start(&spec.name, process).await {
                Ok(mut handle) => {
                    self.run.apply(RunUpdate::Spawned {
                        component: spec.name.clone(),
                        pid: handle.pid(),
                    });
                    let table = self
                        .tables
                        .get(&spec.name)
                        .cloned()
                        .ok_or_else(|| {
                            OrchestratorError::Internal(format!("no pattern table for {}", spec.name))
                        })?;
                    let streams = [
                        ("stdout", handle.take_stdout()),
                        ("stderr", handle.take_stderr()),
                    ];
                    for (label, stream) in streams {
                        if let Some(lines) = stream {
                            spawn_watcher(
                                &mut self.watchers,
                                tx.clone(),
                                spec.name.clone(),
                                label,
                                table.clone(),
                                lines,
                            );
                        }
                    }
                    spawn_exit_watcher(
                        &mut self.watchers,
                        tx.clone(),
                        spec.name.clone(),
                        handle.exit(),
                    );
                    self.exits.insert(spec.name.clone(), handle.exit());
                }
                Err(e) => {
                    warn!(component = %spec.name, error = %e, "Failed to start component");
                    self.run.apply(RunUpdate::SpawnFailed {
                        component: spec.name.clone(),
                        error: e,
                    });
                }
            }
        }
        Ok(())
    }

    /// Wait for every configured port, or for the owning process to exit.
    async fn await_readiness(&mut self, deadline: Instant) -> Result<bool, OrchestratorError> {
        let targets: Vec<(String, u16)> = self
            .config
            .components
            .iter()
            .filter(|spec| !self.is_failed(&spec.name))
            .filter_map(|spec| spec.ready_port.map(|port| (spec.name.clone(), port)))
            .collect();
        if targets.is_empty() {
            return Ok(true);
        }

        let host = self.config.host.as_str();
        let limit = self.config.startup_timeout();
        let interval = self.config.poll_interval();
        let exits = &self.exits;
        info!(targets = targets.len(), "Waiting for component ports");

        let mut pending: BTreeSet<String> = targets.iter().map(|(name, _)| name.clone()).collect();
        let phase: FuturesUnordered<_> = targets
            .iter()
            .map(|(name, port)| {
                let exit = exits.get(name).cloned();
                readiness_unit(name.clone(), host, *port, limit, interval, exit)
            })
            .collect();

        let finished = drive(
            &mut self.run,
            &mut self.updates,
            &mut self.watchers,
            deadline,
            phase,
            &mut pending,
        )
        .await?;
        if !finished {
            self.expire("readiness check", &pending);
        }
        Ok(finished)
    }

    /// Probe endpoints, content checks and user flows of reachable components.
    async fn probe_components(&mut self, deadline: Instant) -> Result<bool, OrchestratorError> {
        let specs: Vec<&ComponentSpec> = self
            .config
            .components
            .iter()
            .filter(|spec| !spec.endpoints.is_empty() || !spec.user_flows.is_empty())
            .filter(|spec| !self.is_failed(&spec.name))
            .collect();
        if specs.is_empty() {
            return Ok(true);
        }

        let probes = &self.probes;
        let limit = self.config.probe_timeout();
        info!(components = specs.len(), "Probing component endpoints");

        let mut pending: BTreeSet<String> = specs.iter().map(|spec| spec.name.clone()).collect();
        let phase: FuturesUnordered<_> = specs
            .iter()
            .map(|spec| probe_unit(probes, spec, limit))
            .collect();

        let finished = drive(
            &mut self.run,
            &mut self.updates,
            &mut self.watchers,
            deadline,
            phase,
            &mut pending,
        )
        .await?;
        if !finished {
            self.expire("endpoint probes", &pending);
        }
        Ok(finished)
    }

    async fn validate(&mut self, deadline: Instant) -> Result<(), OrchestratorError> {
        let Some(validator) = self.validator.clone() else {
            return Ok(());
        };
        info!("Running configuration validator");

        let mut pending = BTreeSet::from([VALIDATION_UNIT.to_string()]);
        let phase = stream::once(async move {
            let outcome = validator.validate().await;
            if !outcome.passed {
                warn!(errors = outcome.errors.len(), "Configuration validation failed");
            }
            (
                VALIDATION_UNIT.to_string(),
                vec![RunUpdate::ConfigValidated(outcome)],
            )
        });

        let finished = drive(
            &mut self.run,
            &mut self.updates,
            &mut self.watchers,
            deadline,
            phase,
            &mut pending,
        )
        .await?;
        if !finished {
            self.run
                .apply(RunUpdate::ConfigValidated(ValidationOutcome::failed(vec![
                    "Validator did not finish before the run deadline".to_string(),
                ])));
            self.expire("config validation", &BTreeSet::new());
        }
        Ok(())
    }

    fn is_failed(&self, component: &str) -> bool {
        self.run
            .component(component)
            .is_some_and(|c| c.status.is_failed())
    }

    /// Mark components `phase` was still working on, and every component
    /// that never settled, unreachable.
    fn expire(&mut self, phase: &'static str, in_flight: &BTreeSet<String>) {
        warn!(phase, in_flight = in_flight.len(), "Run deadline expired");
        for component in in_flight {
            self.run.apply(RunUpdate::PhaseExpired {
                component: component.clone(),
                phase,
            });
        }
        let pending: Vec<String> = self
            .run
            .components
            .values()
            .filter(|c| c.status.is_pending())
            .map(|c| c.name.clone())
            .collect();
        for component in pending {
            self.run.apply(RunUpdate::DeadlineExpired { component });
        }
    }

    async fn teardown(&mut self) {
        debug!(processes = self.supervisor.len(), "Tearing down processes");
        self.supervisor.terminate_all().await;
        // Watchers hold the only remaining senders now.
        self.updates_tx = None;
    }

    /// Fold output still in flight, bounded by the drain timeout.
    async fn drain(&mut self) -> Result<(), OrchestratorError> {
        let limit = Instant::now() + self.config.drain_timeout();

        loop {
            tokio::select! {
                update = self.updates.recv() => match update {
                    Some(update) => self.run.apply(update),
                    None => break,
                },
                () = sleep_until(limit) => {
                    warn!("Drain timeout reached, dropping remaining output");
                    break;
                }
            }
        }

        let mut result = Ok(());
        while let Ok(Some(joined)) = timeout_at(limit, self.watchers.join_next()).await {
            if let Err(e) = check_watcher(joined) {
                result = Err(e);
            }
        }
        self.watchers.shutdown().await;
        result
    }

    fn finalize(mut self, outcome: Result<(), OrchestratorError>) -> DiagnosticRun {
        let aggregated = aggregate(self.run.components.values());
        self.run.apply(RunUpdate::Aggregated(aggregated));
        let recommendations = recommend_for_run(&self.run);
        self.run.apply(RunUpdate::Recommended(recommendations));

        if let Err(e) = outcome {
            error!(error = %e, "Diagnostic run aborted");
            self.run.apply(RunUpdate::Aborted(e.to_string()));
        }

        info!(
            overall = %self.run.overall_status,
            critical = self.run.critical_issues.len(),
            recommendations = self.run.recommendations.len(),
            "Diagnostic run finished"
        );
        self.run
    }
}

async fn readiness_unit(
    component: String,
    host: &str,
    port: u16,
    limit: Duration,
    interval: Duration,
    exit: Option<ExitWatch>,
) -> Unit {
    let started = Instant::now();
    let poll = wait_for_ready(host, port, limit, interval);
    let ready = match exit {
        Some(mut watch) => tokio::select! {
            ready = poll => ready,
            Some(exited) = watch.exited() => {
                debug!(component = %component, code = ?exited.code, "Process exited while waiting for its port");
                let update = RunUpdate::Exited {
                    component: component.clone(),
                    code: exited.code,
                };
                return (component, vec![update]);
            }
        },
        None => poll.await,
    };

    let update = if ready {
        RunUpdate::Ready {
            component: component.clone(),
            port,
        }
    } else {
        RunUpdate::NotReady {
            component: component.clone(),
            port,
            waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    };
    (component, vec![update])
}

async fn probe_unit(probes: &ProbeRunner, spec: &ComponentSpec, limit: Duration) -> Unit {
    let component = spec.name.clone();
    let mut batch = Vec::new();

    if !spec.endpoints.is_empty() {
        let probe = probes.probe_component(spec, limit).await;
        let page_load = probe
            .results
            .first()
            .filter(|r| r.status_code.is_some())
            .map(|r| r.latency_ms);
        batch.push(RunUpdate::Probed {
            component: component.clone(),
            status: probe.status,
            results: probe.results,
            warnings: probe.warnings,
        });
        if let Some(load_time_ms) = page_load {
            batch.push(RunUpdate::Performance {
                component: component.clone(),
                load_time_ms,
                issue: performance_issue(load_time_ms),
            });
        }
    }
    for (flow, result) in probes.check_flows(spec, limit).await {
        batch.push(RunUpdate::FlowChecked {
            component: component.clone(),
            flow,
            result,
        });
    }
    (component, batch)
}

/// Race a phase against incoming updates and the run deadline.
///
/// Each finished unit is folded as it arrives and removed from `pending`.
/// Returns `Ok(false)` if the deadline passed first; `pending` then holds
/// the units still in flight.
async fn drive<S>(
    run: &mut DiagnosticRun,
    updates: &mut UnboundedReceiver<RunUpdate>,
    watchers: &mut JoinSet<()>,
    deadline: Instant,
    phase: S,
    pending: &mut BTreeSet<String>,
) -> Result<bool, OrchestratorError>
where
    S: Stream<Item = Unit>,
{
    let mut phase = pin!(phase);

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => run.apply(update),
                None => return Err(OrchestratorError::ChannelClosed),
            },
            Some(joined) = watchers.join_next(), if !watchers.is_empty() => check_watcher(joined)?,
            unit = phase.next() => match unit {
                Some((key, batch)) => {
                    pending.remove(&key);
                    for update in batch {
                        run.apply(update);
                    }
                }
                None => {
                    while let Ok(update) = updates.try_recv() {
                        run.apply(update);
                    }
                    return Ok(true);
                }
            },
            () = sleep_until(deadline) => return Ok(false),
        }
    }
}

fn check_watcher(joined: Result<(), JoinError>) -> Result<(), OrchestratorError> {
    match joined {
        Err(e) if e.is_panic() => Err(OrchestratorError::TaskFailed(format!(
            "output watcher panicked: {e}"
        ))),
        _ => Ok(()),
    }
}

fn spawn_watcher(
    watchers: &mut JoinSet<()>,
    tx: UnboundedSender<RunUpdate>,
    component: String,
    label: &'static str,
    table: PatternTable,
    mut lines: LineStream,
) {
    watchers.spawn(async move {
        let mut classifier = OutputClassifier::new(table, ComponentStatus::Unknown);
        while let Some(line) = lines.next().await {
            debug!(component = %component, stream = label, "{}", line);
            if let Some(outcome) = classifier.observe_line(&line) {
                let update = RunUpdate::Line {
                    component: component.clone(),
                    outcome,
                };
                if tx.send(update).is_err() {
                    break;
                }
            }
        }
        debug!(
            component = %component,
            stream = label,
            status = %classifier.state().status,
            "Output watcher finished"
        );
    });
}

/// Report a process that stops on its own. Requested teardown is silent.
fn spawn_exit_watcher(
    watchers: &mut JoinSet<()>,
    tx: UnboundedSender<RunUpdate>,
    component: String,
    mut exit: ExitWatch,
) {
    watchers.spawn(async move {
        if let Some(exited) = exit.exited().await {
            warn!(component = %component, code = ?exited.code, "Process exited before teardown");
            if tx.send(RunUpdate::Exited { component, code: exited.code }).is_err() {
                debug!("Exit reported after the run was finalized");
            }
        }
    });
}
