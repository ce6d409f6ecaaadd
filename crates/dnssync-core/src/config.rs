//! Configuration types for the dnssync system
//!
//! This module defines all configuration structures used throughout the crate.
//! Configuration is an explicit value handed to [`crate::SyncEngine::new`];
//! nothing is read from ambient process state.

use serde::{Deserialize, Serialize};

use crate::endpoint::RecordType;

/// Main dnssync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Zones the adapter may manage (trailing dots optional)
    pub zones: Vec<String>,

    /// TTL reported and substituted when a caller supplies none
    #[serde(default = "default_ttl")]
    pub default_ttl: i64,

    /// Log planned operations instead of calling the store
    #[serde(default)]
    pub dry_run: bool,

    /// Record types listed per zone
    #[serde(default = "default_record_types")]
    pub record_types: Vec<RecordType>,

    /// How updates are carried out
    #[serde(default)]
    pub update_strategy: UpdateStrategy,

    /// Record store configuration, used when the store is built from a registry
    #[serde(default)]
    pub store: Option<StoreConfig>,

    /// Capacity of the optional event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Create a new configuration for the given zones with defaults
    pub fn new<S: Into<String>>(zones: impl IntoIterator<Item = S>) -> Self {
        Self {
            zones: zones.into_iter().map(Into::into).collect(),
            default_ttl: default_ttl(),
            dry_run: false,
            record_types: default_record_types(),
            update_strategy: UpdateStrategy::default(),
            store: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the default TTL
    pub fn with_default_ttl(mut self, ttl: i64) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Restrict the record types that are listed
    pub fn with_record_types(mut self, record_types: Vec<RecordType>) -> Self {
        self.record_types = record_types;
        self
    }

    /// Set the update strategy
    pub fn with_update_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.update_strategy = strategy;
        self
    }

    /// Set the store configuration
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zones.is_empty() {
            return Err(crate::Error::config("No zones configured"));
        }

        if self.zones.iter().any(|z| z.trim().trim_end_matches('.').is_empty()) {
            return Err(crate::Error::config("Zone names cannot be empty"));
        }

        if self.default_ttl <= 0 {
            return Err(crate::Error::config("Default TTL must be > 0"));
        }

        if self.record_types.is_empty() {
            return Err(crate::Error::config("At least one record type must be managed"));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        if let Some(store) = &self.store {
            store.validate()?;
        }

        Ok(())
    }
}

/// How an update (old, new) pair is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    /// Update the existing record by its id
    #[default]
    InPlace,
    /// Delete the old record, then create the new one
    Recreate,
}

impl std::str::FromStr for UpdateStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-place" | "inplace" | "update" => Ok(UpdateStrategy::InPlace),
            "recreate" | "delete-create" => Ok(UpdateStrategy::Recreate),
            other => Err(crate::Error::config(format!(
                "Unknown update strategy '{}' (expected in-place or recreate)",
                other
            ))),
        }
    }
}

/// Record store configuration
///
/// The Debug implementation never exposes the API key.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Zone.ee API v2
    Zoneee {
        /// API user name
        username: String,
        /// API key
        api_key: String,
        /// Override for the API base URL
        #[serde(default)]
        base_url: Option<String>,
    },

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Zoneee {
                username, api_key, ..
            } => {
                if username.is_empty() || api_key.is_empty() {
                    return Err(crate::Error::config(
                        "Zone.ee username and API key are required",
                    ));
                }
                Ok(())
            }
            StoreConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Zoneee { .. } => "zoneee",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Zoneee {
                username, base_url, ..
            } => f
                .debug_struct("Zoneee")
                .field("username", username)
                .field("api_key", &"<REDACTED>")
                .field("base_url", base_url)
                .finish(),
            StoreConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

fn default_ttl() -> i64 {
    300
}

fn default_record_types() -> Vec<RecordType> {
    RecordType::ALL.to_vec()
}

fn default_event_channel_capacity() -> usize {
    1000
}
