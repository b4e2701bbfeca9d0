//! Telemetry: structured logging for the authorization engine.
//!
//! Decision events are emitted on the `audit` target (see
//! [`crate::policy::TracingAuditSink`]), so they can be routed or filtered
//! separately from diagnostics through `module_levels`.
//!
//! # Example
//!
//! ```rust,no_run
//! use apex_authz::telemetry::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::default()).expect("Failed to initialize logging");
//! ```

pub mod logging;

pub use logging::{build_filter, init_logging, LogFormat, LoggingConfig};
