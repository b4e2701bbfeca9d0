//! Predicates attached to ABAC rules.
//!
//! A [`Condition`] is either one of the declarative built-ins (which can be
//! loaded from config) or a host-supplied closure.
//!
//! ```toml
//! conditions = [
//!     { type = "permission_is", permission = "tool:execute" },
//!     { type = "time_window", start = "09:00:00", end = "17:00:00" },
//!     { type = "any", conditions = [
//!         { type = "has_tag", tag = "internal" },
//!         { type = "attribute_equals", key = "tenant", value = "acme" },
//!     ] },
//! ]
//! ```

use chrono::NaiveTime;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use super::models::Permission;
use super::AuthContext;

/// Signature of a host-supplied predicate.
pub type PredicateFn = dyn Fn(&AuthContext, &str, &Permission, &str) -> bool + Send + Sync;

/// A predicate over `(context, subject, permission, resource)`.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Subject equals the given value.
    SubjectIs { subject: String },
    /// Permission equals the given value.
    PermissionIs { permission: Permission },
    /// Resource equals the given value.
    ResourceIs { resource: String },
    /// Context attribute `key` is present and equals `value`.
    AttributeEquals { key: String, value: String },
    /// Evaluation time (UTC, time of day) falls in `[start, end)`.
    /// When `start > end` the window wraps past midnight.
    TimeWindow { start: NaiveTime, end: NaiveTime },
    /// Context carries the given tag.
    HasTag { tag: String },
    /// Every nested condition holds. Empty is true.
    All { conditions: Vec<Condition> },
    /// At least one nested condition holds. Empty is false.
    Any { conditions: Vec<Condition> },
    /// The nested condition does not hold.
    Not { condition: Box<Condition> },
    /// Host-supplied closure.
    #[serde(skip)]
    Predicate(Arc<PredicateFn>),
}

impl Condition {
    pub fn subject_is(subject: impl Into<String>) -> Self {
        Self::SubjectIs {
            subject: subject.into(),
        }
    }

    pub fn permission_is(permission: impl Into<Permission>) -> Self {
        Self::PermissionIs {
            permission: permission.into(),
        }
    }

    pub fn resource_is(resource: impl Into<String>) -> Self {
        Self::ResourceIs {
            resource: resource.into(),
        }
    }

    pub fn attribute_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttributeEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn time_window(start: NaiveTime, end: NaiveTime) -> Self {
        Self::TimeWindow { start, end }
    }

    pub fn has_tag(tag: impl Into<String>) -> Self {
        Self::HasTag { tag: tag.into() }
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::All {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Any {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn negate(condition: Condition) -> Self {
        Self::Not {
            condition: Box::new(condition),
        }
    }

    /// Wrap a closure.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&AuthContext, &str, &Permission, &str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Evaluate this condition.
    pub fn evaluate(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> bool {
        match self {
            Self::SubjectIs { subject: expected } => subject == expected,
            Self::PermissionIs { permission: expected } => permission == expected,
            Self::ResourceIs { resource: expected } => resource == expected,
            Self::AttributeEquals { key, value } => ctx.attribute(key) == Some(value.as_str()),
            Self::TimeWindow { start, end } => {
                let now = ctx.current_time().time();
                if start <= end {
                    *start <= now && now < *end
                } else {
                    now >= *start || now < *end
                }
            }
            Self::HasTag { tag } => ctx.has_tag(tag),
            Self::All { conditions } => conditions
                .iter()
                .all(|c| c.evaluate(ctx, subject, permission, resource)),
            Self::Any { conditions } => conditions
                .iter()
                .any(|c| c.evaluate(ctx, subject, permission, resource)),
            Self::Not { condition } => !condition.evaluate(ctx, subject, permission, resource),
            Self::Predicate(f) => f(ctx, subject, permission, resource),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubjectIs { subject } => f.debug_tuple("SubjectIs").field(subject).finish(),
            Self::PermissionIs { permission } => {
                f.debug_tuple("PermissionIs").field(permission).finish()
            }
            Self::ResourceIs { resource } => f.debug_tuple("ResourceIs").field(resource).finish(),
            Self::AttributeEquals { key, value } => f
                .debug_struct("AttributeEquals")
                .field("key", key)
                .field("value", value)
                .finish(),
            Self::TimeWindow { start, end } => f
                .debug_struct("TimeWindow")
                .field("start", start)
                .field("end", end)
                .finish(),
            Self::HasTag { tag } => f.debug_tuple("HasTag").field(tag).finish(),
            Self::All { conditions } => f.debug_tuple("All").field(conditions).finish(),
            Self::Any { conditions } => f.debug_tuple("Any").field(conditions).finish(),
            Self::Not { condition } => f.debug_tuple("Not").field(condition).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn eval(cond: &Condition, ctx: &AuthContext, subject: &str, perm: &Permission) -> bool {
        cond.evaluate(ctx, subject, perm, "res")
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn ctx_at(h: u32, m: u32) -> AuthContext {
        AuthContext::new().at(Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap())
    }

    #[test]
    fn test_equality_conditions() {
        let ctx = AuthContext::new();
        let perm = Permission::TOOL_EXECUTE;

        assert!(eval(&Condition::subject_is("admin"), &ctx, "admin", &perm));
        assert!(!eval(&Condition::subject_is("admin"), &ctx, "guest", &perm));
        assert!(eval(&Condition::permission_is("tool:execute"), &ctx, "a", &perm));
        assert!(!eval(&Condition::permission_is("memory:read"), &ctx, "a", &perm));
        assert!(Condition::resource_is("db").evaluate(&ctx, "a", &perm, "db"));
        assert!(!Condition::resource_is("db").evaluate(&ctx, "a", &perm, "cache"));
    }

    #[test]
    fn test_attribute_and_tag() {
        let ctx = AuthContext::new()
            .with_attribute("tenant", "acme")
            .with_tag("internal");
        let perm = Permission::MEMORY_READ;

        assert!(eval(&Condition::attribute_equals("tenant", "acme"), &ctx, "a", &perm));
        assert!(!eval(&Condition::attribute_equals("tenant", "globex"), &ctx, "a", &perm));
        assert!(!eval(&Condition::attribute_equals("region", "eu"), &ctx, "a", &perm));
        assert!(eval(&Condition::has_tag("internal"), &ctx, "a", &perm));
        assert!(!eval(&Condition::has_tag("public"), &ctx, "a", &perm));
    }

    #[test]
    fn test_time_window() {
        let business_hours = Condition::time_window(t(9, 0), t(17, 0));
        let perm = Permission::TOOL_EXECUTE;

        assert!(eval(&business_hours, &ctx_at(9, 0), "a", &perm));
        assert!(eval(&business_hours, &ctx_at(12, 30), "a", &perm));
        assert!(!eval(&business_hours, &ctx_at(17, 0), "a", &perm));
        assert!(!eval(&business_hours, &ctx_at(3, 0), "a", &perm));
    }

    #[test]
    fn test_time_window_wraps_midnight() {
        let night_shift = Condition::time_window(t(22, 0), t(6, 0));
        let perm = Permission::TOOL_EXECUTE;

        assert!(eval(&night_shift, &ctx_at(23, 15), "a", &perm));
        assert!(eval(&night_shift, &ctx_at(2, 0), "a", &perm));
        assert!(!eval(&night_shift, &ctx_at(6, 0), "a", &perm));
        assert!(!eval(&night_shift, &ctx_at(12, 0), "a", &perm));
    }

    #[test]
    fn test_combinators() {
        let ctx = AuthContext::new().with_tag("internal");
        let perm = Permission::MEMORY_WRITE;

        let both = Condition::all([Condition::subject_is("admin"), Condition::has_tag("internal")]);
        assert!(eval(&both, &ctx, "admin", &perm));
        assert!(!eval(&both, &ctx, "guest", &perm));

        let either =
            Condition::any([Condition::subject_is("admin"), Condition::has_tag("internal")]);
        assert!(eval(&either, &ctx, "guest", &perm));

        let not_admin = Condition::negate(Condition::subject_is("admin"));
        assert!(!eval(&not_admin, &ctx, "admin", &perm));
        assert!(eval(&not_admin, &ctx, "guest", &perm));
    }

    #[test]
    fn test_empty_combinators() {
        let ctx = AuthContext::new();
        let perm = Permission::MEMORY_READ;
        assert!(eval(&Condition::all([]), &ctx, "a", &perm));
        assert!(!eval(&Condition::any([]), &ctx, "a", &perm));
    }

    #[test]
    fn test_predicate_sees_all_inputs() {
        let cond = Condition::predicate(|ctx, subject, perm, resource| {
            ctx.attribute("env") == Some("prod")
                && subject == "deployer"
                && *perm == Permission::TOOL_EXECUTE
                && resource == "kubectl"
        });
        let ctx = AuthContext::new().with_attribute("env", "prod");

        assert!(cond.evaluate(&ctx, "deployer", &Permission::TOOL_EXECUTE, "kubectl"));
        assert!(!cond.evaluate(&ctx, "deployer", &Permission::TOOL_EXECUTE, "helm"));
        assert_eq!(format!("{:?}", cond), "Predicate(<fn>)");
    }

    #[test]
    fn test_deserialize_declarative_conditions() {
        let cond: Condition = serde_json::from_value(serde_json::json!({
            "type": "all",
            "conditions": [
                { "type": "permission_is", "permission": "tool:execute" },
                { "type": "time_window", "start": "09:00:00", "end": "17:00:00" },
                { "type": "not", "condition": { "type": "has_tag", "tag": "frozen" } }
            ]
        }))
        .unwrap();

        let perm = Permission::TOOL_EXECUTE;
        assert!(eval(&cond, &ctx_at(10, 0), "a", &perm));
        assert!(!eval(&cond, &ctx_at(10, 0).with_tag("frozen"), "a", &perm));
        assert!(!eval(&cond, &ctx_at(20, 0), "a", &perm));
    }

    #[test]
    fn test_deserialize_rejects_unknown_type() {
        let result: Result<Condition, _> =
            serde_json::from_value(serde_json::json!({ "type": "predicate" }));
        assert!(result.is_err());
    }
}
