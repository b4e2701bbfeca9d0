//! Error handling for the authorization engine.
//!
//! Errors fall into three groups:
//! - **Configuration** errors come back from mutators (`add_role`, `add_rule`,
//!   `assign_role`, ...) and from factory configs. `authorize` never returns them.
//! - **Decision** errors come back from `authorize` when some dependency (a
//!   condition, a composed child, a hook) could not produce a decision.
//! - **Registry** errors cover lookups of policy factories by name.
//!
//! Every error path resolves to "not allowed". `Result<bool>` makes this
//! structural: an `Err` carries no allow flag at all.
//!
//! # Usage
//!
//! ```rust
//! use apex_authz::error::{ErrorKind, PolicyError};
//!
//! let err = PolicyError::RoleNotFound("admin".into());
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! assert_eq!(err.code().numeric_code(), 1003);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by hosts for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration Errors (1000-1099)
    EmptyName,
    DuplicateRole,
    DuplicateRule,
    RoleNotFound,
    RoleAlreadyAssigned,
    RoleNotAssigned,
    InvalidConfiguration,

    // Decision Errors (2000-2099)
    AccessDenied,
    HookRejected,
    EvaluationFailed,
    DependencyFailed,

    // Registry Errors (3000-3099)
    UnknownPolicy,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::EmptyName => 1000,
            Self::DuplicateRole => 1001,
            Self::DuplicateRule => 1002,
            Self::RoleNotFound => 1003,
            Self::RoleAlreadyAssigned => 1004,
            Self::RoleNotAssigned => 1005,
            Self::InvalidConfiguration => 1006,

            Self::AccessDenied => 2000,
            Self::HookRejected => 2001,
            Self::EvaluationFailed => 2002,
            Self::DependencyFailed => 2003,

            Self::UnknownPolicy => 3000,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "configuration",
            2000..=2099 => "decision",
            3000..=3099 => "registry",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Coarse classification of a [`PolicyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Returned synchronously from a mutating call.
    Configuration,
    /// Returned from `authorize`: the engine could not decide.
    Decision,
    /// Returned from registry lookups.
    Registry,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Error
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors produced by policies, hooks and the registry.
///
/// `Clone` so hooks can inspect an error by reference and hand back either a
/// replacement or the original.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    #[error("{entity} name must not be empty")]
    EmptyName { entity: &'static str },

    #[error("role already exists: {0}")]
    DuplicateRole(String),

    #[error("rule already exists: {0}")]
    DuplicateRule(String),

    #[error("role not found: {0}")]
    RoleNotFound(String),

    #[error("role {role} already assigned to subject {subject}")]
    RoleAlreadyAssigned { subject: String, role: String },

    #[error("role {role} not assigned to subject {subject}")]
    RoleNotAssigned { subject: String, role: String },

    #[error("invalid config for policy {policy}: {reason}")]
    InvalidConfig { policy: String, reason: String },

    #[error("access denied: subject={subject}, permission={permission}, resource={resource}")]
    Denied {
        subject: String,
        permission: String,
        resource: String,
    },

    #[error("authorization rejected: {0}")]
    Rejected(String),

    #[error("policy {policy} could not decide: {reason}")]
    Evaluation { policy: String, reason: String },

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl PolicyError {
    /// Rejection raised by a hook or any other gate in front of a policy.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// A policy that could not reach a decision.
    pub fn evaluation(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            policy: policy.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary error from host code.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }

    pub fn invalid_config(policy: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidConfig {
            policy: policy.into(),
            reason: reason.to_string(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyName { .. } => ErrorCode::EmptyName,
            Self::DuplicateRole(_) => ErrorCode::DuplicateRole,
            Self::DuplicateRule(_) => ErrorCode::DuplicateRule,
            Self::RoleNotFound(_) => ErrorCode::RoleNotFound,
            Self::RoleAlreadyAssigned { .. } => ErrorCode::RoleAlreadyAssigned,
            Self::RoleNotAssigned { .. } => ErrorCode::RoleNotAssigned,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfiguration,
            Self::Denied { .. } => ErrorCode::AccessDenied,
            Self::Rejected(_) => ErrorCode::HookRejected,
            Self::Evaluation { .. } => ErrorCode::EvaluationFailed,
            Self::Other(_) => ErrorCode::DependencyFailed,
            Self::UnknownPolicy(_) => ErrorCode::UnknownPolicy,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self.code().numeric_code() {
            1000..=1099 => ErrorKind::Configuration,
            3000..=3099 => ErrorKind::Registry,
            _ => ErrorKind::Decision,
        }
    }

    /// Log this error with its code.
    ///
    /// Configuration and registry errors are operator mistakes and go out at
    /// `warn`; decision errors are already reported by audit middleware, so
    /// they are only traced at `debug` here.
    pub fn log(&self) {
        let code = self.code();
        match self.kind() {
            ErrorKind::Configuration | ErrorKind::Registry => warn!(
                error_code = %code,
                numeric_code = code.numeric_code(),
                category = code.category(),
                error = %self,
                "Authorization configuration error"
            ),
            ErrorKind::Decision => debug!(
                error_code = %code,
                numeric_code = code.numeric_code(),
                error = %self,
                "Authorization decision error"
            ),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
