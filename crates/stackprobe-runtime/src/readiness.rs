//! TCP readiness polling.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info};

/// Wait until `host:port` accepts a TCP connection.
///
/// Connects every `interval` until one succeeds (`true`) or `limit` has
/// elapsed (`false`). Refused or reset connections just mean "not ready
/// yet"; this never errors. Each attempt is bounded by the time remaining.
pub async fn wait_for_ready(host: &str, port: u16, limit: Duration, interval: Duration) -> bool {
    let deadline = Instant::now() + limit;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            info!(%host, %port, attempts = attempt - 1, "Port did not become ready");
            return false;
        }

        match timeout(remaining, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => {
                debug!(%host, %port, attempt, "Port accepting connections");
                return true;
            }
            Ok(Err(e)) => debug!(%host, %port, attempt, error = %e, "Port not ready, retrying"),
            Err(_) => debug!(%host, %port, attempt, "Connect attempt timed out"),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(interval.min(remaining)).await;
    }
}
