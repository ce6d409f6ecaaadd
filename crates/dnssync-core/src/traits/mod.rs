//! Core traits for the dnssync system
//!
//! - [`RecordStore`]: list/create/update/delete against a registrar, per zone and type

pub mod record_store;

pub use record_store::{RecordStore, RecordStoreFactory};
