//! Process supervision: spawning, output streaming and graceful shutdown.

mod shutdown;
mod stream;
mod supervisor;

pub use shutdown::{DEFAULT_GRACE, shutdown_child};
pub use stream::{LineStream, line_stream};
pub use supervisor::{ExitWatch, ProcessExit, ProcessHandle, ProcessSupervisor};
