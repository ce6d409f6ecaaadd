//! Test doubles and common utilities for contract tests
//!
//! The mock store keeps records in memory per (zone, type), counts every
//! call, and can be told to fail specific operations.

#![allow(dead_code)]

use async_trait::async_trait;
use dnssync_core::error::{Error, Result};
use dnssync_core::{Endpoint, RecordId, RecordStore, RecordType, SyncConfig, Zone, ZoneRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Buckets = HashMap<(String, RecordType), Vec<ZoneRecord>>;

/// An in-memory RecordStore that tracks calls
pub struct MockRecordStore {
    records: Arc<Mutex<Buckets>>,
    list_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    /// Ordered log of mutating calls, e.g. "delete example.com A 42"
    call_log: Arc<Mutex<Vec<String>>>,
    /// Creates/updates with one of these destinations fail with status 500
    failing_destinations: Arc<Mutex<HashSet<String>>>,
    /// Updates/deletes of one of these ids fail with status 500
    failing_ids: Arc<Mutex<HashSet<String>>>,
    /// Listing these zones fails with a transport error
    failing_zones: Arc<Mutex<HashSet<String>>>,
    list_delay: Option<Duration>,
    next_id: Arc<AtomicUsize>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            list_calls: Arc::new(AtomicUsize::new(0)),
            create_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
            call_log: Arc::new(Mutex::new(Vec::new())),
            failing_destinations: Arc::new(Mutex::new(HashSet::new())),
            failing_ids: Arc::new(Mutex::new(HashSet::new())),
            failing_zones: Arc::new(Mutex::new(HashSet::new())),
            list_delay: None,
            next_id: Arc::new(AtomicUsize::new(1000)),
        }
    }

    /// Make every list call sleep first (for cancellation tests)
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Seed a record; returns its id
    pub fn seed(&self, zone: &str, record_type: RecordType, record: ZoneRecord) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let record = record.with_id(RecordId::parse(&id).unwrap());
        self.records
            .lock()
            .unwrap()
            .entry((zone.to_string(), record_type))
            .or_default()
            .push(record);
        id
    }

    /// Seed a record with a fixed id
    pub fn seed_with_id(&self, zone: &str, record_type: RecordType, id: &str, record: ZoneRecord) {
        let record = record.with_id(RecordId::parse(id).unwrap());
        self.records
            .lock()
            .unwrap()
            .entry((zone.to_string(), record_type))
            .or_default()
            .push(record);
    }

    pub fn fail_destination(&self, destination: &str) {
        self.failing_destinations
            .lock()
            .unwrap()
            .insert(destination.to_string());
    }

    pub fn fail_id(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_zone(&self, zone: &str) {
        self.failing_zones.lock().unwrap().insert(zone.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total number of store calls of any kind
    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.create_calls() + self.update_calls() + self.delete_calls()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    /// Records currently held for (zone, type)
    pub fn records(&self, zone: &str, record_type: RecordType) -> Vec<ZoneRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(zone.to_string(), record_type))
            .cloned()
            .unwrap_or_default()
    }

    /// Create a new MockRecordStore that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            list_calls: Arc::clone(&other.list_calls),
            create_calls: Arc::clone(&other.create_calls),
            update_calls: Arc::clone(&other.update_calls),
            delete_calls: Arc::clone(&other.delete_calls),
            call_log: Arc::clone(&other.call_log),
            failing_destinations: Arc::clone(&other.failing_destinations),
            failing_ids: Arc::clone(&other.failing_ids),
            failing_zones: Arc::clone(&other.failing_zones),
            list_delay: other.list_delay,
            next_id: Arc::clone(&other.next_id),
        }
    }

    fn log(&self, entry: String) {
        self.call_log.lock().unwrap().push(entry);
    }

    fn server_error(&self) -> Error {
        Error::remote_api(500, "internal error")
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn list(&self, zone: &Zone, record_type: RecordType) -> Result<Vec<ZoneRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_zones.lock().unwrap().contains(zone.name()) {
            return Err(Error::transport(format!("connection reset listing {}", zone)));
        }
        match self
            .records
            .lock()
            .unwrap()
            .get(&(zone.name().to_string(), record_type))
        {
            Some(records) if !records.is_empty() => Ok(records.clone()),
            _ => Err(Error::not_found(format!("no {} records in {}", record_type, zone))),
        }
    }

    async fn create(
        &self,
        zone: &Zone,
        record_type: RecordType,
        record: &ZoneRecord,
    ) -> Result<ZoneRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.log(format!(
            "create {} {} {} {}",
            zone, record_type, record.name, record.destination
        ));
        if self
            .failing_destinations
            .lock()
            .unwrap()
            .contains(&record.destination)
        {
            return Err(self.server_error());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let created = record.clone().with_id(RecordId::parse(&id).unwrap());
        self.records
            .lock()
            .unwrap()
            .entry((zone.name().to_string(), record_type))
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        zone: &Zone,
        record_type: RecordType,
        id: &RecordId,
        record: &ZoneRecord,
    ) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.log(format!(
            "update {} {} {} {}",
            zone, record_type, id, record.destination
        ));
        if self.failing_ids.lock().unwrap().contains(id.as_str())
            || self
                .failing_destinations
                .lock()
                .unwrap()
                .contains(&record.destination)
        {
            return Err(self.server_error());
        }
        let mut records = self.records.lock().unwrap();
        let bucket = records
            .entry((zone.name().to_string(), record_type))
            .or_default();
        match bucket.iter_mut().find(|r| r.id.as_ref() == Some(id)) {
            Some(existing) => {
                *existing = record.clone().with_id(id.clone());
                Ok(())
            }
            None => Err(Error::not_found(format!("record {} not found", id))),
        }
    }

    async fn delete(&self, zone: &Zone, record_type: RecordType, id: &RecordId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.log(format!("delete {} {} {}", zone, record_type, id));
        if self.failing_ids.lock().unwrap().contains(id.as_str()) {
            return Err(self.server_error());
        }
        let mut records = self.records.lock().unwrap();
        let bucket = records
            .entry((zone.name().to_string(), record_type))
            .or_default();
        let before = bucket.len();
        bucket.retain(|r| r.id.as_ref() != Some(id));
        if bucket.len() == before {
            Err(Error::not_found(format!("record {} not found", id)))
        } else {
            Ok(())
        }
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config(zones: &[&str]) -> SyncConfig {
    let mut config = SyncConfig::new(zones.iter().copied());
    config.event_channel_capacity = 100;
    config
}

/// Endpoint as external-dns would send it for an existing record
pub fn existing(name: &str, record_type: &str, target: &str, id: &str) -> Endpoint {
    Endpoint::new(name, record_type, vec![target.to_string()]).with_set_identifier(id)
}
