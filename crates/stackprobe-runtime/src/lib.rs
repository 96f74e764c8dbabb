//! OS and network side of stackprobe: process supervision, TCP readiness,
//! HTTP probes, the command-based config validator and the
//! [`MonitoringSession`] control loop.
#![deny(unsafe_code)]

pub mod probe;
pub mod process;
pub mod readiness;
mod session;
mod validator;

pub use probe::{ComponentProbe, ProbeOptions, ProbeRunner, endpoint_status, performance_issue};
pub use process::{
    ExitWatch, LineStream, ProcessExit, ProcessHandle, ProcessSupervisor, shutdown_child,
};
pub use readiness::wait_for_ready;
pub use session::MonitoringSession;
pub use validator::CommandValidator;
