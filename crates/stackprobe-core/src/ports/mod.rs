//! Port definitions (trait abstractions) for external collaborators.
//!
//! The core never validates application config files and never persists
//! reports itself. Those jobs belong to adapters implementing these traits.
//!
//! # Design Rules
//!
//! - No process or filesystem details in any signature
//! - Intent-based methods (validate, write), not implementation-leaking ones

pub mod config_validator;
pub mod report_writer;

pub use config_validator::{ConfigValidator, NoopValidator, ValidationOutcome};
pub use report_writer::{ReportWriter, WrittenReport};
