//! Multi-policy decision trees.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::Permission;
use super::{AuthContext, Policy};
use crate::error::Result;

/// How a [`CompositePolicy`] combines its children's decisions.
///
/// Parsing never fails: an unknown string becomes [`CombinationMode::Unrecognized`],
/// which always denies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CombinationMode {
    /// Allow as soon as one child allows.
    AllowIfAny,
    /// Allow only if every child allows.
    AllowIfAll,
    /// Deny as soon as one child denies.
    DenyIfAny,
    /// Anything else. Denies without consulting children.
    Unrecognized(String),
}

impl CombinationMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AllowIfAny => "allow_if_any",
            Self::AllowIfAll => "allow_if_all",
            Self::DenyIfAny => "deny_if_any",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl FromStr for CombinationMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "allow_if_any" => Self::AllowIfAny,
            "allow_if_all" => Self::AllowIfAll,
            "deny_if_any" => Self::DenyIfAny,
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

impl From<String> for CombinationMode {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl From<CombinationMode> for String {
    fn from(mode: CombinationMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for CombinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates child policies under a [`CombinationMode`].
///
/// Children are evaluated in order and the first decisive answer stops
/// evaluation. A child error is returned as-is under every mode. With no
/// children the composite denies, whatever the mode.
pub struct CompositePolicy {
    name: String,
    mode: CombinationMode,
    policies: Vec<Arc<dyn Policy>>,
}

impl CompositePolicy {
    pub fn new(
        name: impl Into<String>,
        mode: CombinationMode,
        policies: impl IntoIterator<Item = Arc<dyn Policy>>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            policies: policies.into_iter().collect(),
        }
    }

    pub fn mode(&self) -> &CombinationMode {
        &self.mode
    }

    /// Child policies in evaluation order.
    pub fn policies(&self) -> &[Arc<dyn Policy>] {
        &self.policies
    }

    /// Allow on the first child that allows.
    fn any_allows(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool> {
        for policy in &self.policies {
            if policy.authorize(ctx, subject, permission, resource)? {
                debug!(composite = %self.name, child = policy.name(), "Child allowed");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deny on the first child that denies.
    fn all_allow(
        &self,
        ctx: &AuthContext,
        subject: &str,
        permission: &Permission,
        resource: &str,
    ) -> Result<bool> {
        for policy in &self.policies {
            if !policy.authorize(ctx, subject, permission, resource)? {
                debug!(composite = %self.name, child = policy.name(), "Child denied");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Debug for CompositePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<&str> = self.policies.iter().map(|p| p.name()).collect();
        f.debug_struct("CompositePolicy")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("policies", &children)
            .finish()
    }
}

impl Policy for CompositePolicy {
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
        if self.policies.is_empty() {
            return Ok(false);
        }

        match &self.mode {
            CombinationMode::AllowIfAny => self.any_allows(ctx, subject, permission, resource),
            CombinationMode::AllowIfAll => self.all_allow(ctx, subject, permission, resource),
            // Same outcome as AllowIfAll, kept separate because callers pick
            // it for "any denial wins" rather than "all must agree".
            CombinationMode::DenyIfAny => self.all_allow(ctx, subject, permission, resource),
            CombinationMode::Unrecognized(raw) => {
                warn!(
                    composite = %self.name,
                    mode = %raw,
                    "Unrecognized combination mode, denying"
                );
                Ok(false)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
