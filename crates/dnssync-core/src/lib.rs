// # dnssync-core
//
// Core library for reconciling external-dns endpoints against a registrar.
//
// ## Architecture Overview
//
// - **RecordStore**: Trait for the registrar's per-zone, per-type record API
// - **ZoneResolver**: Maps a name to the configured zone that owns it
// - **codec**: Endpoint target <-> registrar record translation
// - **SyncEngine**: Lists records and applies change sets, aggregating failures
// - **StoreRegistry**: Plugin-based registry for record stores
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation logic knows nothing about HTTP
// 2. **Plugin-Based**: Stores are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Never abort a batch**: Every operation is attempted, failures are combined

pub mod codec;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod registry;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{StoreConfig, SyncConfig, UpdateStrategy};
pub use endpoint::{
    Capabilities, Changes, Endpoint, ProviderSpecificProperty, RecordId, RecordType, ZoneRecord,
    PROP_RECORD_ID, PROP_RECORD_TYPE,
};
pub use engine::{RecordListing, SyncEngine, SyncEvent};
pub use error::{AggregateError, Error, ErrorKind, Operation, OperationFailure, Result};
pub use registry::StoreRegistry;
pub use traits::{RecordStore, RecordStoreFactory};
pub use zone::{Zone, ZoneResolver};
