//! Store registry for dynamic backend resolution.

use std::collections::HashMap;
use std::sync::Arc;
use serde_json::Value;

use crate::store::SecretStore;
use sealbox_common::{Error, Result};

/// Factory function type for creating stores.
pub type StoreFactory = Box<dyn Fn(Value) -> Result<Arc<dyn SecretStore>> + Send + Sync>;

/// Registry for secret store factories.
///
/// Allows dynamic registration and resolution of store backends
/// by name and configuration.
pub struct StoreRegistry {
    factories: HashMap<String, StoreFactory>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a store factory.
    ///
    /// # Preconditions
    /// - `name` must be unique within the registry
    ///
    /// # Postconditions
    /// - Factory is registered and can be resolved by name
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: StoreFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::Validation(format!(
                "store '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a store by name and configuration.
    ///
    /// # Preconditions
    /// - Store must be registered
    /// - Configuration must be valid for the store
    ///
    /// # Postconditions
    /// - Returns an instance of the store
    ///
    /// # Errors
    /// - Store not found
    /// - Configuration invalid
    pub fn resolve(&self, name: &str, config: Value) -> Result<Arc<dyn SecretStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::Validation(format!("store '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered store names.
    pub fn stores(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a store is registered.
    pub fn has_store(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with default stores.
pub fn create_default_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();

    // Register memory store (for testing)
    registry
        .register("memory", Box::new(|_config| {
            Ok(Arc::new(crate::memory::MemoryStore::new()))
        }))
        .expect("Failed to register memory store");

    // Register directory store
    registry
        .register("dir", Box::new(|config| {
            let root = config
                .get("root")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Validation("dir store requires 'root' path".to_string()))?;
            Ok(Arc::new(crate::dir::DirStore::new(root)?))
        }))
        .expect("Failed to register dir store");

    registry
}
