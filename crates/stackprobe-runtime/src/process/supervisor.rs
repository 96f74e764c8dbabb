//! Component process supervision.
//!
//! Every launched child is owned by a reaper task. The reaper publishes the
//! exit of a child that stops on its own, and performs the graceful
//! shutdown when the supervisor asks for it. Callers get a
//! [`ProcessHandle`] carrying the output streams and an [`ExitWatch`].

use std::collections::BTreeMap;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use stackprobe_core::{ProcessSpec, SpawnError};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::shutdown::{DEFAULT_GRACE, shutdown_child};
use super::stream::{LineStream, line_stream};

/// How a process ended on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Resolves when a process exits without being asked to.
///
/// Exits caused by [`ProcessSupervisor::terminate`] are not reported.
#[derive(Debug, Clone)]
pub struct ExitWatch(watch::Receiver<Option<ProcessExit>>);

impl ExitWatch {
    /// Wait for the exit. Returns `None` if the process was terminated by
    /// the supervisor instead.
    pub async fn exited(&mut self) -> Option<ProcessExit> {
        self.0
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|seen| *seen)
    }

    /// The exit, if it already happened.
    pub fn current(&self) -> Option<ProcessExit> {
        *self.0.borrow()
    }
}

/// A launched component process.
#[derive(Debug)]
pub struct ProcessHandle {
    component: String,
    pid: Option<u32>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    exit: ExitWatch,
}

impl ProcessHandle {
    pub fn component(&self) -> &str {
        &self.component
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the stdout line stream. Returns `None` on the second call.
    pub fn take_stdout(&mut self) -> Option<LineStream> {
        self.stdout.take().map(|s| line_stream(s, "stdout"))
    }

    /// Take the stderr line stream. Returns `None` on the second call.
    pub fn take_stderr(&mut self) -> Option<LineStream> {
        self.stderr.take().map(|s| line_stream(s, "stderr"))
    }

    /// Exit notification for this process. Can be cloned freely.
    pub fn exit(&self) -> ExitWatch {
        self.exit.clone()
    }
}

#[derive(Debug)]
struct Reaper {
    stop: oneshot::Sender<()>,
    task: JoinHandle<io::Result<ExitStatus>>,
}

async fn reap(
    mut child: Child,
    stop: oneshot::Receiver<()>,
    exited: watch::Sender<Option<ProcessExit>>,
    grace: Duration,
) -> io::Result<ExitStatus> {
    // A dropped stop sender counts as a stop request.
    let natural = tokio::select! {
        status = child.wait() => Some(status),
        _ = stop => None,
    };
    match natural {
        Some(status) => {
            let status = status?;
            exited.send_replace(Some(ProcessExit {
                code: status.code(),
            }));
            Ok(status)
        }
        None => shutdown_child(&mut child, grace).await,
    }
}

/// Starts component processes and guarantees their teardown.
#[derive(Debug)]
pub struct ProcessSupervisor {
    children: BTreeMap<String, Reaper>,
    grace: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            children: BTreeMap::new(),
            grace: DEFAULT_GRACE,
        }
    }

    /// Override the SIGTERM grace period.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Number of children still owned.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Launch `spec` on behalf of `component`.
    ///
    /// Stdout and stderr are piped and exposed through the handle; stdin is
    /// closed. A component that is already running is torn down first.
    pub async fn start(
        &mut self,
        component: &str,
        spec: &ProcessSpec,
    ) -> Result<ProcessHandle, SpawnError> {
        if self.children.contains_key(component) {
            warn!(component = %component, "Component already running, restarting");
            self.terminate(component).await;
        }

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SpawnError::from_io(&spec.command, &e))?;
        let pid = child.id();
        info!(component = %component, pid = ?pid, command = %spec.display(), "Started process");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = watch::channel(None);
        let task = tokio::spawn(reap(child, stop_rx, exit_tx, self.grace));
        self.children.insert(
            component.to_string(),
            Reaper {
                stop: stop_tx,
                task,
            },
        );

        Ok(ProcessHandle {
            component: component.to_string(),
            pid,
            stdout,
            stderr,
            exit: ExitWatch(exit_rx),
        })
    }

    /// Wait for a component's process to exit on its own.
    ///
    /// Returns the exit code (`None` if killed by a signal). The child is
    /// released once it exits; if this future is dropped first, the child
    /// stays owned and is still torn down by [`Self::terminate_all`].
    pub async fn wait(&mut self, component: &str) -> Result<Option<i32>, SpawnError> {
        let Some(reaper) = self.children.get_mut(component) else {
            return Err(SpawnError::Io {
                command: component.to_string(),
                message: "no such process".to_string(),
            });
        };
        let joined = (&mut reaper.task).await;
        self.children.remove(component);
        let status = joined
            .map_err(|e| SpawnError::Io {
                command: component.to_string(),
                message: e.to_string(),
            })?
            .map_err(|e| SpawnError::from_io(component, &e))?;
        Ok(status.code())
    }

    /// Stop one component: SIGTERM, bounded grace period, SIGKILL, reap.
    ///
    /// Returns `None` if the component is unknown or could not be reaped.
    pub async fn terminate(&mut self, component: &str) -> Option<ExitStatus> {
        let Reaper { stop, task } = self.children.remove(component)?;
        // Fails only when the reaper already finished; its status is still
        // in the join handle.
        stop.send(()).ok();
        match task.await {
            Ok(Ok(status)) => {
                debug!(component = %component, %status, "Process terminated");
                Some(status)
            }
            Ok(Err(e)) => {
                warn!(component = %component, error = %e, "Failed to terminate process");
                None
            }
            Err(e) => {
                warn!(component = %component, error = %e, "Reaper task failed");
                None
            }
        }
    }

    /// Stop every process the supervisor still owns.
    pub async fn terminate_all(&mut self) {
        let names: Vec<String> = self.children.keys().cloned().collect();
        for name in names {
            self.terminate(&name).await;
        }
    }
}
