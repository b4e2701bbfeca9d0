//! Attribute-based access control.
//!
//! An [`AbacPolicy`] holds named rules. Each rule carries an [`Effect`], a
//! priority and a list of [`Condition`]s. Rules are evaluated highest priority
//! first; among equal priorities the rule added first wins. The first rule
//! whose conditions all hold decides. No match is a deny.

use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::condition::Condition;
use super::models::{Effect, Permission};
use super::{AuthContext, Policy};
use crate::error::{PolicyError, Result};
use crate::registry::PolicyConfig;

// ═══════════════════════════════════════════════════════════════════════════════
// Rule
// ═══════════════════════════════════════════════════════════════════════════════

/// A named ABAC rule.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Rule name, unique within its policy.
    pub name: String,
    pub effect: Effect,
    /// All must hold for the rule to match. Empty always matches.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
}

impl Rule {
    pub fn new(name: impl Into<String>, effect: Effect) -> Self {
        Self {
            name: name.into(),
            effect,
            conditions: Vec::new(),
            priority: 0,
        }
    }

    pub fn allow(name: impl Into<String>) -> Self {
        Self::new(name, Effect::Allow)
    }

    pub fn deny(name: impl Into<String>) -> Self {
        Self::new(name, Effect::Deny)
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a condition.
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Check whether every condition holds.
    pub fn matches(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> bool {
        self.conditions
            .iter()
            .all(|c| c.evaluate(ctx, subject, permission, resource))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// Priority-ordered rule matcher.
///
/// Conditions may call back into host code, so `authorize` clones the rule
/// list under the read lock and evaluates the copy with the lock released. A
/// rule added concurrently may or may not be seen by an in-flight call.
#[derive(Debug)]
pub struct AbacPolicy {
    name: String,
    /// Rules in insertion order.
    rules: RwLock<Vec<Arc<Rule>>>,
}

impl AbacPolicy {
    /// Create a policy with no rules (denies everything).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Add a rule. Fails on an empty or duplicate name.
    pub fn add_rule(&self, rule: Rule) -> Result<()> {
        if rule.name.is_empty() {
            return Err(PolicyError::EmptyName { entity: "rule" });
        }

        let mut rules = self.rules.write();
        if rules.iter().any(|r| r.name == rule.name) {
            return Err(PolicyError::DuplicateRule(rule.name));
        }

        debug!(
            policy = %self.name,
            rule = %rule.name,
            effect = %rule.effect,
            priority = rule.priority,
            "Adding rule"
        );
        rules.push(Arc::new(rule));
        Ok(())
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        let mut rules = self.rules.read().clone();
        // `sort_by` is stable: equal priorities keep insertion order.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// Build an ABAC policy from a factory config bag.
    ///
    /// ```toml
    /// name = "guardrails"
    ///
    /// [[rules]]
    /// name = "deny-exec"
    /// effect = "deny"
    /// priority = 10
    /// conditions = [{ type = "permission_is", permission = "tool:execute" }]
    /// ```
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let settings: AbacSettings = config.parse("abac")?;
        let policy = Self::new(settings.name);
        for rule in settings.rules {
            policy.add_rule(rule)?;
        }
        Ok(policy)
    }
}

#[derive(Debug, Deserialize)]
struct AbacSettings {
    #[serde(default = "default_abac_name")]
    name: String,
    #[serde(default)]
    rules: Vec<Rule>,
}

fn default_abac_name() -> String {
    "abac".to_string()
}

impl Policy for AbacPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorize(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool> {
        for rule in self.rules() {
            if rule.matches(ctx, subject, permission, resource) {
                debug!(
                    policy = %self.name,
                    rule = %rule.name,
                    effect = %rule.effect,
                    subject,
                    permission = %permission,
                    resource,
                    "Rule matched"
                );
                return Ok(rule.effect.is_allow());
            }
        }
        Ok(false)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
