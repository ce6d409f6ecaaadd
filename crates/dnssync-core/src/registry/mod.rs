//! Plugin-based record store registry
//!
//! The registry allows record stores to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains over store types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnssync_core::registry::StoreRegistry;
//! use dnssync_core::config::StoreConfig;
//!
//! let registry = StoreRegistry::new();
//! dnssync_store_zoneee::register(&registry);
//!
//! let config = StoreConfig::Zoneee { ... };
//! let store = registry.create_store(&config)?;
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In dnssync-store-zoneee crate
//! pub fn register(registry: &StoreRegistry) {
//!     registry.register_store("zoneee", Box::new(ZoneEeFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::traits::{RecordStore, RecordStoreFactory};

/// Registry for plugin-based record store creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct StoreRegistry {
    /// Registered record store factories
    stores: RwLock<HashMap<String, Box<dyn RecordStoreFactory>>>,
}

impl StoreRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "zoneee")
    /// - `factory`: Factory object for creating store instances
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn RecordStoreFactory>) {
        let name = name.into();
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name, factory);
    }

    /// Create a record store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn RecordStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub fn create_store(&self, config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
        config.validate()?;

        let store_type = config.type_name();
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?;

        factory.create(config)
    }

    /// List all registered store types, sorted
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}
