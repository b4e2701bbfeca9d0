//! Policy decorators.
//!
//! A [`Middleware`] turns one policy into another. [`apply_middleware`] stacks
//! several so that the first one listed is the outermost, i.e. it runs first.
//!
//! ```rust
//! use std::sync::Arc;
//! use apex_authz::policy::{apply_middleware, with_audit, with_hooks, Hooks, Policy, RbacPolicy};
//!
//! let base: Arc<dyn Policy> = Arc::new(RbacPolicy::new("rbac"));
//! // audit sees the final result, including hook rejections
//! let policy = apply_middleware(base, [with_audit(), with_hooks(Hooks::new())]);
//! assert_eq!(policy.name(), "rbac");
//! ```

use std::sync::Arc;

use super::audit::{AuditSink, AuditedPolicy, TracingAuditSink};
use super::hooks::{HookedPolicy, Hooks};
use super::Policy;

/// A policy decorator.
pub type Middleware = Arc<dyn Fn(Arc<dyn Policy>) -> Arc<dyn Policy> + Send + Sync>;

/// Wrap `policy` in `middlewares`, first element outermost.
pub fn apply_middleware<I>(policy: Arc<dyn Policy>, middlewares: I) -> Arc<dyn Policy>
where
    I: IntoIterator<Item = Middleware>,
    I::IntoIter: DoubleEndedIterator,
{
    middlewares
        .into_iter()
        .rev()
        .fold(policy, |inner, middleware| middleware(inner))
}

/// Decorate with [`Hooks`].
pub fn with_hooks(hooks: Hooks) -> Middleware {
    Arc::new(move |inner| Arc::new(HookedPolicy::new(inner, hooks.clone())) as Arc<dyn Policy>)
}

/// Audit every decision through [`TracingAuditSink`].
pub fn with_audit() -> Middleware {
    with_audit_sink(Arc::new(TracingAuditSink))
}

/// Audit every decision through a custom sink.
pub fn with_audit_sink(sink: Arc<dyn AuditSink>) -> Middleware {
    Arc::new(move |inner| Arc::new(AuditedPolicy::new(inner, sink.clone())) as Arc<dyn Policy>)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
