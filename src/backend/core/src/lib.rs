#![allow(clippy::result_large_err)]
//! # Apex Authz
//!
//! Authorization engine for agent tool calls: who may do what to which
//! resource, under which circumstances.
//!
//! ## Architecture
//!
//! - **Policy**: one synchronous contract, `authorize -> Result<bool>`, shared
//!   by every decision-maker and decorator
//! - **RBAC / ABAC**: role lookup and priority-ordered attribute rules
//! - **Composite**: combines child policies under allow/deny modes
//! - **Middleware**: hooks and audit logging wrapped around any policy
//! - **Registry**: named factories that build policies from config
//! - **Config / Telemetry**: file + env configuration and structured logging

pub mod config;
pub mod error;
pub mod policy;
pub mod registry;
pub mod telemetry;

pub use error::{ErrorCode, ErrorKind, PolicyError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{ErrorCode, ErrorKind, PolicyError, Result};
    pub use crate::policy::{
        apply_middleware, compose_hooks, with_audit, with_audit_sink, with_hooks,
        AbacPolicy, AuditOutcome, AuditRecord, AuditSink, AuthContext, CombinationMode,
        CompositePolicy, Condition, Effect, Hooks, Middleware, Permission, Policy, PolicyExt,
        RbacPolicy, Role, Rule,
    };
    pub use crate::registry::{PolicyConfig, PolicyFactory, PolicyRegistry};
}
