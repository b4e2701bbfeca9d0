//! Audit logging for authorization decisions.
//!
//! [`AuditedPolicy`] always delegates first, then emits exactly one
//! [`AuditRecord`] and returns the delegate's result untouched. Field names of
//! the record (`policy`, `subject`, `permission`, `resource`, `outcome`,
//! `error`) are stable; downstream log pipelines key on them.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use super::models::Permission;
use super::{AuthContext, Policy};
use crate::error::Result;

/// Outcome of one audited decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Allow,
    Deny,
    Error,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub policy: String,
    pub subject: String,
    pub permission: String,
    pub resource: String,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Build a record from a decision result.
    pub fn new(
        policy: &str,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
        result: &Result<bool>,
    ) -> Self {
        let (outcome, error) = match result {
            Ok(true) => (AuditOutcome::Allow, None),
            Ok(false) => (AuditOutcome::Deny, None),
            Err(err) => (AuditOutcome::Error, Some(err.to_string())),
        };

        Self {
            timestamp: Utc::now(),
            request_id: ctx.request_id.clone(),
            policy: policy.to_string(),
            subject: subject.to_string(),
            permission: permission.to_string(),
            resource: resource.to_string(),
            outcome,
            error,
        }
    }
}

/// Destination for audit records.
///
/// Sinks are called synchronously on the authorizing thread, so anything
/// slow (network, disk) should hand the record off to a queue.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Default sink: a `tracing` event on the `audit` target plus an
/// `authz_decisions_total` counter labelled by policy and outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, r: &AuditRecord) {
        counter!(
            "authz_decisions_total",
            "policy" => r.policy.clone(),
            "outcome" => r.outcome.as_str()
        )
        .increment(1);

        match &r.error {
            Some(error) => warn!(
                target: "audit",
                request_id = %r.request_id,
                policy = %r.policy,
                subject = %r.subject,
                permission = %r.permission,
                resource = %r.resource,
                outcome = %r.outcome,
                error = %error,
                "authorization decision"
            ),
            None => info!(
                target: "audit",
                request_id = %r.request_id,
                policy = %r.policy,
                subject = %r.subject,
                permission = %r.permission,
                resource = %r.resource,
                outcome = %r.outcome,
                "authorization decision"
            ),
        }
    }
}

/// A policy whose every decision is audited. Reports the wrapped policy's name.
pub struct AuditedPolicy {
    inner: Arc<dyn Policy>,
    sink: Arc<dyn AuditSink>,
}

impl AuditedPolicy {
    pub fn new(inner: Arc<dyn Policy>, sink: Arc<dyn AuditSink>) -> Self {
        Self { inner, sink }
    }
}

impl Policy for AuditedPolicy {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn authorize(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool> {
        let result = self.inner.authorize(ctx, subject, permission, resource);
        self.sink.record(&AuditRecord::new(
            self.inner.name(),
            ctx,
            subject,
            permission,
            resource,
            &result,
        ));
        result
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
