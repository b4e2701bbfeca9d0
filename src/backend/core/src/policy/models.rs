//! Authorization data models: Permission, Role, and rule Effect.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// Permission
// ═══════════════════════════════════════════════════════════════════════════════

/// An action a subject wants to perform, such as `tool:execute`.
///
/// Permissions are opaque tokens compared by equality. The engine never
/// splits or pattern-matches them; a `"tool:*"` permission only matches the
/// literal string `"tool:*"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const TOOL_EXECUTE: Permission = Permission::from_static("tool:execute");
    pub const TOOL_LIST: Permission = Permission::from_static("tool:list");
    pub const MEMORY_READ: Permission = Permission::from_static("memory:read");
    pub const MEMORY_WRITE: Permission = Permission::from_static("memory:write");
    pub const AGENT_DELEGATE: Permission = Permission::from_static("agent:delegate");
    pub const EXTERNAL_API: Permission = Permission::from_static("external:api");

    /// Create a permission from any string.
    pub fn new(permission: impl Into<String>) -> Self {
        Self(Cow::Owned(permission.into()))
    }

    /// Create a permission from a static string, usable in `const` items.
    pub const fn from_static(permission: &'static str) -> Self {
        Self(Cow::Borrowed(permission))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Role
// ═══════════════════════════════════════════════════════════════════════════════

/// A role groups a set of permissions under a name.
///
/// Roles are immutable once registered with an [`RbacPolicy`](super::RbacPolicy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name, unique within its policy.
    pub name: String,
    /// Permissions granted by this role.
    #[serde(default)]
    pub permissions: HashSet<Permission>,
}

impl Role {
    /// Create a new role with the given permissions.
    pub fn new<I, P>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if this role grants a specific permission.
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Effect
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome attached to an ABAC rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_equality_is_literal() {
        assert_eq!(Permission::new("tool:execute"), Permission::TOOL_EXECUTE);
        assert_ne!(Permission::new("tool:*"), Permission::TOOL_EXECUTE);
        assert_ne!(Permission::new("Tool:Execute"), Permission::TOOL_EXECUTE);
    }

    #[test]
    fn test_permission_display_and_serde() {
        assert_eq!(Permission::MEMORY_READ.to_string(), "memory:read");

        let json = serde_json::to_string(&Permission::MEMORY_WRITE).unwrap();
        assert_eq!(json, "\"memory:write\"");

        let parsed: Permission = serde_json::from_str("\"agent:delegate\"").unwrap();
        assert_eq!(parsed, Permission::AGENT_DELEGATE);
    }

    #[test]
    fn test_role_has_permission() {
        let role = Role::new("operator", ["tool:execute", "memory:read"]);
        assert!(role.has_permission(&Permission::TOOL_EXECUTE));
        assert!(role.has_permission(&Permission::MEMORY_READ));
        assert!(!role.has_permission(&Permission::MEMORY_WRITE));
    }

    #[test]
    fn test_role_deserialize_without_permissions() {
        let role: Role = serde_json::from_str(r#"{"name": "guest"}"#).unwrap();
        assert_eq!(role.name, "guest");
        assert!(role.permissions.is_empty());
    }

    #[test]
    fn test_effect_serde() {
        let effect: Effect = serde_json::from_str("\"deny\"").unwrap();
        assert_eq!(effect, Effect::Deny);
        assert!(Effect::Allow.is_allow());
        assert_eq!(Effect::Deny.to_string(), "deny");
    }
}
