//! Named policy factories.
//!
//! The [`PolicyRegistry`] maps a factory name (`"rbac"`, `"abac"`, or any
//! host-registered name) to a function that builds a policy from a
//! [`PolicyConfig`] bag. It is an ordinary value owned by application
//! startup, not a global, so tests can build their own.
//!
//! Registration mistakes (empty or duplicate names) are programming errors and
//! panic. Asking for an unknown name at runtime is an ordinary error.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::policy::{AbacPolicy, Policy, RbacPolicy};

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Config
// ═══════════════════════════════════════════════════════════════════════════════

/// Open key-value bag interpreted entirely by each factory.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PolicyConfig(Map<String, Value>);

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PolicyError::invalid_config(
                "config",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Set a key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Deserialize the whole bag into a factory-specific type. `policy` names
    /// the factory in the error message.
    pub fn parse<T: DeserializeOwned>(&self, policy: &str) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| PolicyError::invalid_config(policy, e))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Policy Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds a policy from a config bag.
pub type PolicyFactory = Arc<dyn Fn(&PolicyConfig) -> Result<Arc<dyn Policy>> + Send + Sync>;

/// Registry of named policy factories.
///
/// Thread-safe via interior `RwLock`; cloning shares the same table.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    factories: Arc<RwLock<HashMap<String, PolicyFactory>>>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `"rbac"` and `"abac"` factories.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("rbac", |config| {
            Ok(Arc::new(RbacPolicy::from_config(config)?) as Arc<dyn Policy>)
        });
        registry.register("abac", |config| {
            Ok(Arc::new(AbacPolicy::from_config(config)?) as Arc<dyn Policy>)
        });
        registry
    }

    /// Register a factory.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or already registered.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(&PolicyConfig) -> Result<Arc<dyn Policy>> + Send + Sync + 'static,
    {
        assert!(!name.is_empty(), "policy factory name must not be empty");

        let mut factories = self.factories.write();
        assert!(
            !factories.contains_key(name),
            "policy factory already registered: {name}"
        );

        debug!(factory = name, "Registering policy factory");
        factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Build a policy with the named factory.
    pub fn create(&self, name: &str, config: &PolicyConfig) -> Result<Arc<dyn Policy>> {
        // Release the lock before running the factory; factories may consult
        // the registry themselves.
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PolicyError::UnknownPolicy(name.to_string()))?;
        factory(config)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("factories", &self.list())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
