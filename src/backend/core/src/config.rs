//! Configuration management.
//!
//! An engine config names the policies to build (by registry factory), how
//! the root composite combines them, and whether decisions are audited:
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "compact"
//!
//! [audit]
//! enabled = true
//!
//! [root]
//! name = "root"
//! mode = "deny_if_any"
//!
//! [[policies]]
//! kind = "rbac"
//! [policies.config]
//! roles = [{ name = "admin", permissions = ["tool:execute"] }]
//! assignments = { alice = ["admin"] }
//! ```

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::policy::{apply_middleware, with_audit, CombinationMode, CompositePolicy, Policy};
use crate::registry::{PolicyConfig, PolicyRegistry};
use crate::telemetry::LoggingConfig;

const ENV_PREFIX: &str = "APEX_AUTHZ";

/// Main engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Root composite configuration
    #[serde(default)]
    pub root: RootConfig,

    /// Policies combined under the root, in evaluation order
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Wrap the root policy in the audit decorator
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RootConfig {
    /// Name reported by the root policy
    #[serde(default = "default_root_name")]
    pub name: String,

    /// How the root combines its children
    #[serde(default = "default_root_mode")]
    pub mode: CombinationMode,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            name: default_root_name(),
            mode: default_root_mode(),
        }
    }
}

/// One configured policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyEntry {
    /// Registry factory name
    pub kind: String,

    /// Factory-specific settings
    #[serde(default)]
    pub config: PolicyConfig,
}

// Default value functions
fn default_audit_enabled() -> bool { true }
fn default_root_name() -> String { "root".to_string() }
fn default_root_mode() -> CombinationMode { CombinationMode::DenyIfAny }

impl EngineConfig {
    /// Load configuration from the environment only. Keys take the form
    /// `APEX_AUTHZ__<SECTION>__<FIELD>`, e.g. `APEX_AUTHZ__ROOT__MODE`.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: EngineConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path. Environment variables override file
    /// values, e.g. `APEX_AUTHZ__AUDIT__ENABLED=false`.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: EngineConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Build every configured policy, in order.
    pub fn build_policies(&self, registry: &PolicyRegistry) -> Result<Vec<Arc<dyn Policy>>> {
        self.policies
            .iter()
            .map(|entry| registry.create(&entry.kind, &entry.config))
            .collect()
    }

    /// Build the root composite over the configured policies, audited if
    /// enabled.
    pub fn build_policy(&self, registry: &PolicyRegistry) -> Result<Arc<dyn Policy>> {
        let children = self.build_policies(registry)?;
        info!(
            root = %self.root.name,
            mode = %self.root.mode,
            policies = children.len(),
            audit = self.audit.enabled,
            "Built policy tree"
        );

        let root: Arc<dyn Policy> = Arc::new(CompositePolicy::new(
            self.root.name.clone(),
            self.root.mode.clone(),
            children,
        ));

        Ok(if self.audit.enabled {
            apply_middleware(root, [with_audit()])
        } else {
            root
        })
    }
}
