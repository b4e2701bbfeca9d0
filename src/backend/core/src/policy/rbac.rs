//! Role-based access control.
//!
//! Answers "does any role assigned to this subject contain this permission?"

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use super::models::{Permission, Role};
use super::{AuthContext, Policy};
use crate::error::{PolicyError, Result};
use crate::registry::PolicyConfig;

#[derive(Debug, Default)]
struct RbacState {
    /// Roles indexed by name.
    roles: HashMap<String, Arc<Role>>,
    /// Subject → assigned role names, in assignment order.
    assignments: HashMap<String, Vec<String>>,
}

/// Policy that grants a permission when some role assigned to the subject
/// contains it.
///
/// Thread-safe via a single `RwLock`; `authorize` only holds the read guard
/// while collecting the subject's roles.
#[derive(Debug)]
pub struct RbacPolicy {
    name: String,
    state: RwLock<RbacState>,
}

impl RbacPolicy {
    /// Create an empty RBAC policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(RbacState::default()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role management
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a role. Fails on an empty or duplicate name.
    pub fn add_role(&self, role: Role) -> Result<()> {
        if role.name.is_empty() {
            return Err(PolicyError::EmptyName { entity: "role" });
        }

        let mut state = self.state.write();
        if state.roles.contains_key(&role.name) {
            return Err(PolicyError::DuplicateRole(role.name));
        }

        debug!(
            policy = %self.name,
            role = %role.name,
            permissions = role.permissions.len(),
            "Adding role"
        );
        state.roles.insert(role.name.clone(), Arc::new(role));
        Ok(())
    }

    /// Get a role by name.
    pub fn role(&self, name: &str) -> Option<Role> {
        self.state.read().roles.get(name).map(|r| Role::clone(r))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assignment management
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign a role to a subject.
    ///
    /// Fails if the role is unknown or already assigned to the subject.
    pub fn assign_role(&self, subject: &str, role: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.roles.contains_key(role) {
            return Err(PolicyError::RoleNotFound(role.to_string()));
        }

        let assigned = state.assignments.entry(subject.to_string()).or_default();
        if assigned.iter().any(|r| r == role) {
            return Err(PolicyError::RoleAlreadyAssigned {
                subject: subject.to_string(),
                role: role.to_string(),
            });
        }

        debug!(policy = %self.name, subject, role, "Assigning role");
        assigned.push(role.to_string());
        Ok(())
    }

    /// Remove a role assignment from a subject.
    ///
    /// Fails if the role is not currently assigned.
    pub fn remove_role(&self, subject: &str, role: &str) -> Result<()> {
        let mut state = self.state.write();
        let not_assigned = || PolicyError::RoleNotAssigned {
            subject: subject.to_string(),
            role: role.to_string(),
        };

        let assigned = state.assignments.get_mut(subject).ok_or_else(not_assigned)?;
        let idx = assigned
            .iter()
            .position(|r| r == role)
            .ok_or_else(not_assigned)?;
        assigned.remove(idx);
        if assigned.is_empty() {
            state.assignments.remove(subject);
        }

        debug!(policy = %self.name, subject, role, "Removed role assignment");
        Ok(())
    }

    /// Role names assigned to a subject, in assignment order.
    pub fn roles_for(&self, subject: &str) -> Vec<String> {
        self.state
            .read()
            .assignments
            .get(subject)
            .cloned()
            .unwrap_or_default()
    }

    /// Union of permissions across every role assigned to a subject.
    pub fn effective_permissions(&self, subject: &str) -> HashSet<Permission> {
        self.snapshot_roles(subject)
            .iter()
            .flat_map(|role| role.permissions.iter().cloned())
            .collect()
    }

    /// Copy out the subject's roles so evaluation happens without the lock.
    /// Assignments whose role no longer exists are skipped.
    fn snapshot_roles(&self, subject: &str) -> Vec<Arc<Role>> {
        let state = self.state.read();
        state
            .assignments
            .get(subject)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| state.roles.get(name).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction from config
    // ─────────────────────────────────────────────────────────────────────────

    /// Build an RBAC policy from a factory config bag.
    ///
    /// ```toml
    /// name = "team"
    /// roles = [{ name = "admin", permissions = ["tool:execute"] }]
    /// assignments = { alice = ["admin"] }
    /// ```
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let settings: RbacSettings = config.parse("rbac")?;
        let policy = Self::new(settings.name);
        for role in settings.roles {
            policy.add_role(role)?;
        }
        for (subject, roles) in &settings.assignments {
            for role in roles {
                policy.assign_role(subject, role)?;
            }
        }
        Ok(policy)
    }
}

#[derive(Debug, Deserialize)]
struct RbacSettings {
    #[serde(default = "default_rbac_name")]
    name: String,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    assignments: BTreeMap<String, Vec<String>>,
}

fn default_rbac_name() -> String {
    "rbac".to_string()
}

impl Policy for RbacPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn authorize(
        &self,
        _ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        _resource: &str,
    ) -> Result<bool> {
        for role in self.snapshot_roles(subject) {
            if role.has_permission(permission) {
                debug!(
                    policy = %self.name,
                    subject,
                    permission = %permission,
                    role = %role.name,
                    "Permission granted"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup_policy() -> RbacPolicy {
        let policy = RbacPolicy::new("rbac");
        policy
            .add_role(Role::new("admin", [Permission::TOOL_EXECUTE, Permission::MEMORY_WRITE]))
            .unwrap();
        policy
            .add_role(Role::new("viewer", [Permission::MEMORY_READ]))
            .unwrap();
        policy
    }

    fn check(policy: &RbacPolicy, subject: &str, permission: &Permission) -> bool {
        policy
            .authorize(&AuthContext::new(), subject, permission, "res")
            .unwrap()
    }

    #[test]
    fn test_name() {
        assert_eq!(RbacPolicy::new("my-rbac").name(), "my-rbac");
    }

    #[test]
    fn test_add_role_rejects_empty_and_duplicate() {
        let policy = setup_policy();
        assert!(matches!(
            policy.add_role(Role::new("", [Permission::TOOL_LIST])),
            Err(PolicyError::EmptyName { entity: "role" })
        ));
        assert!(matches!(
            policy.add_role(Role::new("admin", [Permission::TOOL_LIST])),
            Err(PolicyError::DuplicateRole(name)) if name == "admin"
        ));
        // The original role is untouched.
        let admin = policy.role("admin").unwrap();
        assert!(!admin.has_permission(&Permission::TOOL_LIST));
    }

    #[test]
    fn test_assigned_role_allows() {
        let policy = setup_policy();
        policy.assign_role("alice", "admin").unwrap();

        assert!(check(&policy, "alice", &Permission::TOOL_EXECUTE));
        assert!(!check(&policy, "alice", &Permission::MEMORY_READ));
        assert!(!check(&policy, "bob", &Permission::TOOL_EXECUTE));
    }

    #[test]
    fn test_assign_unknown_role_fails() {
        let policy = setup_policy();
        assert!(matches!(
            policy.assign_role("alice", "root"),
            Err(PolicyError::RoleNotFound(name)) if name == "root"
        ));
        assert!(policy.roles_for("alice").is_empty());
    }

    #[test]
    fn test_assign_duplicate_fails() {
        let policy = setup_policy();
        policy.assign_role("alice", "admin").unwrap();
        assert!(matches!(
            policy.assign_role("alice", "admin"),
            Err(PolicyError::RoleAlreadyAssigned { .. })
        ));
        assert_eq!(policy.roles_for("alice"), vec!["admin".to_string()]);
    }

    #[test]
    fn test_multiple_roles() {
        let policy = setup_policy();
        policy.assign_role("eve", "viewer").unwrap();
        policy.assign_role("eve", "admin").unwrap();

        assert_eq!(policy.roles_for("eve"), vec!["viewer", "admin"]);
        assert!(check(&policy, "eve", &Permission::MEMORY_READ));
        assert!(check(&policy, "eve", &Permission::TOOL_EXECUTE));
        assert!(!check(&policy, "eve", &Permission::AGENT_DELEGATE));
    }

    #[test]
    fn test_remove_role() {
        let policy = setup_policy();
        policy.assign_role("alice", "admin").unwrap();
        assert!(check(&policy, "alice", &Permission::TOOL_EXECUTE));

        policy.remove_role("alice", "admin").unwrap();
        assert!(!check(&policy, "alice", &Permission::TOOL_EXECUTE));
        assert!(policy.roles_for("alice").is_empty());

        assert!(matches!(
            policy.remove_role("alice", "admin"),
            Err(PolicyError::RoleNotAssigned { .. })
        ));
        assert!(matches!(
            policy.remove_role("nobody", "viewer"),
            Err(PolicyError::RoleNotAssigned { .. })
        ));
    }

    #[test]
    fn test_remove_keeps_other_roles() {
        let policy = setup_policy();
        policy.assign_role("eve", "viewer").unwrap();
        policy.assign_role("eve", "admin").unwrap();

        policy.remove_role("eve", "viewer").unwrap();
        assert_eq!(policy.roles_for("eve"), vec!["admin"]);
        assert!(!check(&policy, "eve", &Permission::MEMORY_READ));
    }

    #[test]
    fn test_no_roles_denied() {
        let policy = RbacPolicy::new("empty");
        assert!(!check(&policy, "nobody", &Permission::MEMORY_READ));
    }

    #[test]
    fn test_effective_permissions() {
        let policy = setup_policy();
        policy.assign_role("eve", "viewer").unwrap();
        policy.assign_role("eve", "admin").unwrap();

        let perms = policy.effective_permissions("eve");
        assert_eq!(perms.len(), 3);
        assert!(perms.contains(&Permission::MEMORY_READ));
        assert!(perms.contains(&Permission::TOOL_EXECUTE));
        assert!(perms.contains(&Permission::MEMORY_WRITE));
        assert!(policy.effective_permissions("nobody").is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = PolicyConfig::from_value(json!({
            "name": "team",
            "roles": [
                { "name": "admin", "permissions": ["tool:execute"] },
                { "name": "reader", "permissions": ["memory:read"] }
            ],
            "assignments": { "alice": ["admin", "reader"] }
        }))
        .unwrap();

        let policy = RbacPolicy::from_config(&config).unwrap();
        assert_eq!(policy.name(), "team");
        assert!(check(&policy, "alice", &Permission::TOOL_EXECUTE));
        assert!(check(&policy, "alice", &Permission::MEMORY_READ));
    }

    #[test]
    fn test_from_config_defaults_and_errors() {
        let policy = RbacPolicy::from_config(&PolicyConfig::new()).unwrap();
        assert_eq!(policy.name(), "rbac");

        let bad_ref = PolicyConfig::from_value(json!({
            "assignments": { "alice": ["ghost"] }
        }))
        .unwrap();
        assert!(matches!(
            RbacPolicy::from_config(&bad_ref),
            Err(PolicyError::RoleNotFound(_))
        ));

        let bad_shape = PolicyConfig::from_value(json!({ "roles": "admin" })).unwrap();
        assert!(matches!(
            RbacPolicy::from_config(&bad_shape),
            Err(PolicyError::InvalidConfig { .. })
        ));
    }
}
