//! Authorization policies and the decorators that wrap them.
//!
//! This module provides:
//! - **Contract**: the [`Policy`] trait every decision-maker implements
//! - **RBAC**: subject → roles → permissions lookup ([`RbacPolicy`])
//! - **ABAC**: priority-ordered rules over arbitrary conditions ([`AbacPolicy`])
//! - **Composite**: N child policies under a [`CombinationMode`]
//! - **Middleware**: hooks and audit logging around any policy
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use apex_authz::policy::{
//!     apply_middleware, with_audit, AuthContext, Permission, Policy, RbacPolicy, Role,
//! };
//!
//! let rbac = RbacPolicy::new("team");
//! rbac.add_role(Role::new("admin", [Permission::TOOL_EXECUTE])).unwrap();
//! rbac.assign_role("alice", "admin").unwrap();
//!
//! let policy = apply_middleware(Arc::new(rbac), [with_audit()]);
//! let ctx = AuthContext::new();
//!
//! assert!(policy.authorize(&ctx, "alice", &Permission::TOOL_EXECUTE, "calculator").unwrap());
//! assert!(!policy.authorize(&ctx, "bob", &Permission::TOOL_EXECUTE, "calculator").unwrap());
//! ```

pub mod abac;
pub mod audit;
pub mod composite;
pub mod condition;
pub mod hooks;
pub mod middleware;
pub mod models;
pub mod rbac;

pub use abac::{AbacPolicy, Rule};
pub use audit::{AuditOutcome, AuditRecord, AuditSink, AuditedPolicy, TracingAuditSink};
pub use composite::{CombinationMode, CompositePolicy};
pub use condition::{Condition, PredicateFn};
pub use hooks::{compose_hooks, HookedPolicy, Hooks};
pub use middleware::{apply_middleware, with_audit, with_audit_sink, with_hooks, Middleware};
pub use models::{Effect, Permission, Role};
pub use rbac::RbacPolicy;

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{PolicyError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Policy contract
// ═══════════════════════════════════════════════════════════════════════════════

/// A decision-maker.
///
/// `Ok(true)` allows, `Ok(false)` is a deliberate deny, and `Err(_)` means the
/// policy could not decide. Callers must treat an error as a deny.
///
/// Implementations must tolerate concurrent `authorize` calls, including calls
/// that race with configuration changes.
pub trait Policy: Send + Sync {
    /// Stable identifier for logging.
    fn name(&self) -> &str;

    /// Decide whether `subject` may perform `permission` on `resource`.
    fn authorize(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool>;
}

impl<P: Policy + ?Sized> Policy for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn authorize(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool> {
        (**self).authorize(ctx, subject, permission, resource)
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn authorize(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool> {
        (**self).authorize(ctx, subject, permission, resource)
    }
}

/// Convenience methods available on every [`Policy`].
pub trait PolicyExt: Policy {
    /// Returns `Ok(())` if allowed, `Err(PolicyError::Denied)` on a clean deny,
    /// and the policy's own error if it could not decide.
    fn enforce(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<()> {
        if self.authorize(ctx, subject, permission, resource)? {
            Ok(())
        } else {
            Err(PolicyError::Denied {
                subject: subject.to_string(),
                permission: permission.to_string(),
                resource: resource.to_string(),
            })
        }
    }
}

impl<P: Policy + ?Sized> PolicyExt for P {}

// ═══════════════════════════════════════════════════════════════════════════════
// Authorization context
// ═══════════════════════════════════════════════════════════════════════════════

/// Request-scoped data threaded through every `authorize` call.
///
/// The engine itself never reads it beyond passing it along; conditions and
/// hooks use it to observe request attributes.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Unique request identifier, echoed in audit records.
    pub request_id: String,
    /// Free-form request attributes (tenant, environment, ip, ...).
    pub attributes: HashMap<String, String>,
    /// Labels attached to the request or the target resource.
    pub tags: BTreeSet<String>,
    /// Evaluation time override. `None` means the wall clock.
    pub now: Option<DateTime<Utc>>,
}

impl AuthContext {
    /// Create a new context with a generated request ID.
    pub fn new() -> Self {
        Self::with_request_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create a context with a specific request ID.
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            attributes: HashMap::new(),
            tags: BTreeSet::new(),
            now: None,
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Pin the evaluation time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// The time conditions should evaluate against.
    pub fn current_time(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
