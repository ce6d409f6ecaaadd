// # Record Store Trait
//
// Defines the gateway to a registrar's remote record store.
//
// ## Implementations
//
// - Zone.ee: `dnssync-store-zoneee` crate
//
// ## Usage
//
// ```rust,ignore
// use dnssync_core::{RecordStore, RecordType, Zone};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let records = store.list(&Zone::new("example.com"), RecordType::A).await?;
//     println!("{} A records", records.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::endpoint::{RecordId, RecordType, ZoneRecord};
use crate::zone::Zone;

/// Trait for remote record store implementations
///
/// Every operation is scoped to one zone and one record type and maps to a
/// single remote call.
///
/// # Thread Safety
///
/// Implementations must be thread-safe: listing fans out concurrently over
/// (zone, type) pairs against one shared store.
///
/// # Constraints
///
/// - One request per call, no retry or backoff (the caller reports failures)
/// - No caching between calls
/// - A missing zone/type bucket or record is reported as
///   [`crate::Error::NotFound`], never as a generic failure, so the engine
///   can treat it as "empty" (list) or "already gone" (delete)
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List all records of one type in a zone
    ///
    /// # Returns
    ///
    /// - `Ok(records)`: records with their ids set
    /// - `Err(Error::NotFound)`: no records of this type exist
    /// - `Err(_)`: transport, remote API or decode failure
    async fn list(
        &self,
        zone: &Zone,
        record_type: RecordType,
    ) -> Result<Vec<ZoneRecord>, crate::Error>;

    /// Create a record; `record.id` is ignored
    ///
    /// # Returns
    ///
    /// The record as created by the store, including its new id
    async fn create(
        &self,
        zone: &Zone,
        record_type: RecordType,
        record: &ZoneRecord,
    ) -> Result<ZoneRecord, crate::Error>;

    /// Replace the record with the given id
    async fn update(
        &self,
        zone: &Zone,
        record_type: RecordType,
        id: &RecordId,
        record: &ZoneRecord,
    ) -> Result<(), crate::Error>;

    /// Delete the record with the given id
    ///
    /// # Returns
    ///
    /// - `Ok(())`: deleted
    /// - `Err(Error::NotFound)`: the record does not exist
    async fn delete(
        &self,
        zone: &Zone,
        record_type: RecordType,
        id: &RecordId,
    ) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the store (e.g., "zoneee")
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this store
    ///
    /// # Returns
    ///
    /// A shareable RecordStore trait object
    fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<std::sync::Arc<dyn RecordStore>, crate::Error>;
}
