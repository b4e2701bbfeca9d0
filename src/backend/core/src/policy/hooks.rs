//! Observation and short-circuit callbacks around a policy.
//!
//! | Callback       | Runs                                   | Effect                                   |
//! |----------------|----------------------------------------|------------------------------------------|
//! | `on_authorize` | before the wrapped policy              | `Err` short-circuits the whole call      |
//! | `on_error`     | when the wrapped policy errored        | `Some(e)` replaces, `None` suppresses    |
//! | `on_allow`     | final result is `Ok(true)`             | observe only                             |
//! | `on_deny`      | final result is `Ok(false)`            | observe only                             |
//!
//! Suppressing an error never turns it into an allow: the call resolves to
//! `Ok(false)`.

use std::fmt;
use std::sync::Arc;

use super::models::Permission;
use super::{AuthContext, Policy};
use crate::error::{PolicyError, Result};

pub type AuthorizeHook =
    Arc<dyn Fn(&AuthContext, &str, &Permission, &str) -> Result<()> + Send + Sync>;
pub type DecisionHook = Arc<dyn Fn(&AuthContext, &str, &Permission, &str) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&AuthContext, &PolicyError) -> Option<PolicyError> + Send + Sync>;

/// Optional callback set. Cloning is cheap.
#[derive(Clone, Default)]
pub struct Hooks {
    on_authorize: Option<AuthorizeHook>,
    on_allow: Option<DecisionHook>,
    on_deny: Option<DecisionHook>,
    on_error: Option<ErrorHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_authorize<F>(mut self, f: F) -> Self
    where
        F: Fn(&AuthContext, &str, &Permission, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.on_authorize = Some(Arc::new(f));
        self
    }

    pub fn on_allow<F>(mut self, f: F) -> Self
    where
        F: Fn(&AuthContext, &str, &Permission, &str) + Send + Sync + 'static,
    {
        self.on_allow = Some(Arc::new(f));
        self
    }

    pub fn on_deny<F>(mut self, f: F) -> Self
    where
        F: Fn(&AuthContext, &str, &Permission, &str) + Send + Sync + 'static,
    {
        self.on_deny = Some(Arc::new(f));
        self
    }

    /// Return `Some(e)` to make `e` the final error, or `None` to suppress it.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&AuthContext, &PolicyError) -> Option<PolicyError> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Run `on_authorize`, if set.
    pub fn before_authorize(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<()> {
        match &self.on_authorize {
            Some(f) => f(ctx, subject, permission, resource),
            None => Ok(()),
        }
    }

    pub fn notify_allow(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) {
        if let Some(f) = &self.on_allow {
            f(ctx, subject, permission, resource);
        }
    }

    pub fn notify_deny(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) {
        if let Some(f) = &self.on_deny {
            f(ctx, subject, permission, resource);
        }
    }

    /// Run `on_error`, if set. Without a callback the error passes through.
    pub fn handle_error(&self, ctx: &AuthContext, err: PolicyError) -> Option<PolicyError> {
        match &self.on_error {
            Some(f) => f(ctx, &err),
            None => Some(err),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_authorize", &self.on_authorize.is_some())
            .field("on_allow", &self.on_allow.is_some())
            .field("on_deny", &self.on_deny.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Merge several hook sets into one.
///
/// - `on_authorize` callbacks run in order; the first error stops the chain.
/// - `on_allow` / `on_deny` callbacks all run, in order.
/// - `on_error` callbacks run in order; the first `Some` wins. If every
///   callback returns `None`, the original error is returned unchanged.
///
/// A slot in the result is only set when at least one input set it.
pub fn compose_hooks(hooks: impl IntoIterator<Item = Hooks>) -> Hooks {
    let mut authorize = Vec::new();
    let mut allow = Vec::new();
    let mut deny = Vec::new();
    let mut error = Vec::new();

    for h in hooks {
        authorize.extend(h.on_authorize);
        allow.extend(h.on_allow);
        deny.extend(h.on_deny);
        error.extend(h.on_error);
    }

    let on_authorize: Option<AuthorizeHook> = (!authorize.is_empty()).then(|| {
        Arc::new(move |ctx: &AuthContext, subject: &str, permission: &Permission, resource: &str| {
            authorize
                .iter()
                .try_for_each(|f| f(ctx, subject, permission, resource))
        }) as AuthorizeHook
    });

    let on_error: Option<ErrorHook> = (!error.is_empty()).then(|| {
        Arc::new(move |ctx: &AuthContext, err: &PolicyError| {
            error
                .iter()
                .find_map(|f| f(ctx, err))
                .or_else(|| Some(err.clone()))
        }) as ErrorHook
    });

    Hooks {
        on_authorize,
        on_allow: fan_out(allow),
        on_deny: fan_out(deny),
        on_error,
    }
}

fn fan_out(callbacks: Vec<DecisionHook>) -> Option<DecisionHook> {
    if callbacks.is_empty() {
        return None;
    }
    Some(Arc::new(
        move |ctx: &AuthContext, subject: &str, permission: &Permission, resource: &str| {
            for f in &callbacks {
                f(ctx, subject, permission, resource);
            }
        },
    ))
}

/// A policy decorated with [`Hooks`]. Reports the wrapped policy's name.
pub struct HookedPolicy {
    inner: Arc<dyn Policy>,
    hooks: Hooks,
}

impl HookedPolicy {
    pub fn new(inner: Arc<dyn Policy>, hooks: Hooks) -> Self {
        Self { inner, hooks }
    }
}

impl Policy for HookedPolicy {
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
        self.hooks
            .before_authorize(ctx, subject, permission, resource)?;

        let allowed = match self.inner.authorize(ctx, subject, permission, resource) {
            Ok(allowed) => allowed,
            Err(err) => match self.hooks.handle_error(ctx, err) {
                Some(err) => return Err(err),
                None => false,
            },
        };

        if allowed {
            self.hooks.notify_allow(ctx, subject, permission, resource);
        } else {
            self.hooks.notify_deny(ctx, subject, permission, resource);
        }
        Ok(allowed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
