//! Bounded teardown of a single child process.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, kill};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use tokio::time::timeout;
#[cfg(unix)]
use tracing::debug;

/// How long a component gets to exit after SIGTERM.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Stop `child` and reap it.
///
/// On unix the child gets SIGTERM and `grace` to exit before it is killed.
/// Elsewhere it is killed straight away.
#[cfg_attr(not(unix), allow(unused_variables))]
pub async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        terminate_then_kill(child, grace).await
    }

    #[cfg(not(unix))]
    {
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn terminate_then_kill(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(raw) = child.id() else {
        // Already reaped; `wait` returns the cached status.
        return child.wait().await;
    };
    let pid = Pid::from_raw(i32::try_from(raw).map_err(io::Error::other)?);

    match kill(pid, Signal::SIGTERM) {
        Ok(()) => {}
        // Exited but not yet reaped.
        Err(Errno::ESRCH) => return child.wait().await,
        Err(e) => return Err(io::Error::other(e)),
    }

    match timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            debug!(pid = raw, grace_ms = grace.as_millis(), "Grace period elapsed, killing");
            child.kill().await?;
            child.wait().await
        }
    }
}
