//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Listing every managed record across zones and record types
//! - Applying an already-computed change set (deletions, creations, updates)
//! - Collecting per-operation failures instead of aborting a batch
//!
//! ## Architecture
//!
//! ```text
//!               ┌──────────────┐
//!   Changes ───▶│  SyncEngine  │───▶ SyncEvent (optional channel)
//!               └──────────────┘
//!                 │          │
//!                 ▼          ▼
//!         ┌──────────────┐ ┌─────────────┐
//!         │ ZoneResolver │ │ RecordCodec │
//!         └──────────────┘ └─────────────┘
//!                 │
//!                 ▼
//!         ┌─────────────┐
//!         │ RecordStore │
//!         └─────────────┘
//! ```
//!
//! ## Ordering
//!
//! Listing fans out one task per (zone, record type) and joins them all.
//! Change application is sequential: deletions, then creations, then updates,
//! so the combined error is ordered deterministically and no two calls ever
//! touch the same remote id at once.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::config::{SyncConfig, UpdateStrategy};
use crate::endpoint::{Capabilities, Changes, Endpoint, RecordType};
use crate::error::{AggregateError, Error, FailureCollector, Operation, OperationFailure, Result};
use crate::traits::RecordStore;
use crate::zone::{Zone, ZoneResolver};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Operation that would have run (dry-run only)
    Planned {
        operation: Operation,
        subject: String,
        zone: Option<String>,
    },

    /// Record created
    Created {
        subject: String,
        zone: String,
        id: Option<String>,
    },

    /// Record updated in place or recreated
    Updated {
        subject: String,
        zone: String,
        id: String,
    },

    /// Record deleted (or already absent)
    Deleted {
        subject: String,
        zone: String,
        id: String,
    },

    /// Operation failed
    Failed {
        operation: Operation,
        subject: String,
        error: String,
    },
}

/// Result of a listing: whatever was collected plus the combined failures
#[derive(Debug)]
pub struct RecordListing {
    /// Endpoints sorted by (name, type, set identifier)
    pub endpoints: Vec<Endpoint>,
    /// `None` when every (zone, type) request succeeded or was empty
    pub error: Option<AggregateError>,
}

impl RecordListing {
    /// Fail if any request failed, otherwise the endpoints
    pub fn into_result(self) -> std::result::Result<Vec<Endpoint>, AggregateError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.endpoints),
        }
    }
}

/// Shared state written by listing tasks
struct ListAccumulator {
    endpoints: Vec<Endpoint>,
    failures: FailureCollector,
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Optionally [`SyncEngine::subscribe()`] to operation events
/// 3. Call [`SyncEngine::list_records()`] / [`SyncEngine::apply_changes()`] per request
///
/// The engine holds no state between calls beyond its configuration.
pub struct SyncEngine {
    /// Remote record store
    store: Arc<dyn RecordStore>,

    /// Configured zones
    resolver: Arc<ZoneResolver>,

    /// Record types listed per zone
    record_types: Vec<RecordType>,

    /// TTL substituted when a caller supplies none
    default_ttl: i64,

    /// Skip every store call and only report planned operations
    dry_run: bool,

    /// Update-by-id or delete-then-create
    update_strategy: UpdateStrategy,

    /// Capacity used by [`SyncEngine::subscribe`]
    event_channel_capacity: usize,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<SyncEvent>>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `store`: Record store implementation
    /// - `config`: Sync configuration (validated here)
    pub fn new(store: Arc<dyn RecordStore>, config: SyncConfig) -> Result<Self> {
        config.validate()?;

        let resolver = ZoneResolver::new(&config.zones);
        if resolver.zones().is_empty() {
            return Err(Error::config("No usable zones configured"));
        }

        info!(
            "Sync engine managing {} zone(s) via {} [mode: {}, updates: {:?}]",
            resolver.zones().len(),
            store.store_name(),
            if config.dry_run { "DRY-RUN" } else { "LIVE" },
            config.update_strategy
        );

        Ok(Self {
            store,
            resolver: Arc::new(resolver),
            record_types: config.record_types,
            default_ttl: config.default_ttl,
            dry_run: config.dry_run,
            update_strategy: config.update_strategy,
            event_channel_capacity: config.event_channel_capacity,
            event_tx: None,
        })
    }

    /// Start receiving [`SyncEvent`]s; replaces any earlier subscription
    pub fn subscribe(&mut self) -> mpsc::Receiver<SyncEvent> {
        let (tx, rx) = mpsc::channel(self.event_channel_capacity);
        self.event_tx = Some(tx);
        rx
    }

    /// Configured zones
    pub fn zones(&self) -> &[Zone] {
        self.resolver.zones()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// This adapter returns endpoints unchanged
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_adjust_endpoints: false,
        }
    }

    /// Pass-through endpoint post-processing
    pub fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        endpoints
    }

    /// List every managed record
    pub async fn list_records(&self) -> RecordListing {
        self.list_records_with_cancel(CancellationToken::new()).await
    }

    /// List every managed record, stopping early when `cancel` fires
    ///
    /// On cancellation in-flight requests are aborted and awaited; the
    /// listing carries what was collected so far and a `Cancelled` failure.
    pub async fn list_records_with_cancel(&self, cancel: CancellationToken) -> RecordListing {
        let shared = Arc::new(Mutex::new(ListAccumulator {
            endpoints: Vec::new(),
            failures: FailureCollector::new("list records"),
        }));

        let mut tasks = JoinSet::new();
        for zone in self.resolver.zones() {
            for &record_type in &self.record_types {
                let store = Arc::clone(&self.store);
                let resolver = Arc::clone(&self.resolver);
                let shared = Arc::clone(&shared);
                let zone = zone.clone();
                let ttl = self.default_ttl;

                tasks.spawn(async move {
                    let result = store.list(&zone, record_type).await;
                    let mut acc = shared.lock().await;
                    collect_listing(&mut acc, &resolver, &zone, record_type, ttl, result);
                });
            }
        }
        debug!("Listing records with {} request(s)", tasks.len());

        let cancelled = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break true,
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        error!("Listing task failed: {}", e);
                        shared.lock().await.failures.record(OperationFailure::new(
                            Operation::List,
                            "listing task",
                            None,
                            Error::Other(e.to_string()),
                        ));
                    }
                    None => break false,
                },
            }
        };

        if cancelled {
            warn!("Listing cancelled with {} request(s) in flight", tasks.len());
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        let mut acc = shared.lock().await;
        let mut endpoints = std::mem::take(&mut acc.endpoints);
        let mut failures =
            std::mem::replace(&mut acc.failures, FailureCollector::new("list records"));
        drop(acc);

        endpoints.sort_by(|a, b| {
            (&a.dns_name, &a.record_type, &a.set_identifier)
                .cmp(&(&b.dns_name, &b.record_type, &b.set_identifier))
        });
        failures.sort_by_key(|f| (f.zone.clone(), f.subject.clone()));
        if cancelled {
            failures.record(OperationFailure::new(
                Operation::List,
                "records",
                None,
                Error::cancelled("listing cancelled by caller"),
            ));
        }

        info!("Listed {} endpoint(s) across {} zone(s)", endpoints.len(), self.resolver.zones().len());
        RecordListing {
            endpoints,
            error: failures.finish(),
        }
    }

    /// Apply a change set
    ///
    /// Every operation is attempted once. Failures are collected and
    /// returned together; an empty collection means success. In dry-run mode
    /// no store call is made and every planned operation is reported instead.
    pub async fn apply_changes(&self, changes: &Changes) -> std::result::Result<(), AggregateError> {
        if self.dry_run {
            self.report_dry_run(changes);
            return Ok(());
        }

        info!(
            "Applying changes: Creates={}, Updates={}, Deletes={}",
            changes.create.len(),
            changes.update_new.len(),
            changes.delete.len()
        );

        let mut failures = FailureCollector::new("apply changes");

        for endpoint in &changes.delete {
            if let Err(failure) = self.delete_endpoint(endpoint).await {
                self.record_failure(&mut failures, failure);
            }
        }

        for endpoint in &changes.create {
            self.create_endpoint(endpoint, &mut failures).await;
        }

        for (old, new) in changes.updates() {
            if let Err(failure) = self.update_endpoint(old, new).await {
                self.record_failure(&mut failures, failure);
            }
        }

        match failures.finish() {
            None => Ok(()),
            Some(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    fn report_dry_run(&self, changes: &Changes) {
        info!("Dry run mode enabled. Skipping actual changes.");
        let zone_of = |endpoint: &Endpoint| {
            self.resolver
                .resolve(&endpoint.dns_name)
                .ok()
                .map(ToString::to_string)
        };

        for endpoint in &changes.delete {
            let zone = zone_of(endpoint);
            info!(
                "[DRY-RUN] DELETE {} (zone: {}, id: {})",
                endpoint.identity(),
                zone.as_deref().unwrap_or("<unresolved>"),
                endpoint.set_identifier
            );
            self.plan(Operation::Delete, endpoint, zone);
        }
        for endpoint in &changes.create {
            let zone = zone_of(endpoint);
            info!(
                "[DRY-RUN] CREATE {} {:?} (zone: {}, ttl: {})",
                endpoint.identity(),
                endpoint.targets,
                zone.as_deref().unwrap_or("<unresolved>"),
                self.effective_ttl(endpoint)
            );
            self.plan(Operation::Create, endpoint, zone);
        }
        for (_, endpoint) in changes.updates() {
            let zone = zone_of(endpoint);
            info!(
                "[DRY-RUN] UPDATE {} {:?} (zone: {}, id: {})",
                endpoint.identity(),
                endpoint.targets,
                zone.as_deref().unwrap_or("<unresolved>"),
                endpoint.set_identifier
            );
            self.plan(Operation::Update, endpoint, zone);
        }
    }

    fn plan(&self, operation: Operation, endpoint: &Endpoint, zone: Option<String>) {
        self.emit_event(SyncEvent::Planned {
            operation,
            subject: endpoint.identity(),
            zone,
        });
    }

    /// Delete one endpoint; a record that is already gone counts as deleted
    async fn delete_endpoint(&self, endpoint: &Endpoint) -> std::result::Result<(), OperationFailure> {
        let fail = |zone: Option<&Zone>, error: Error| {
            OperationFailure::new(
                Operation::Delete,
                endpoint.identity(),
                zone.map(ToString::to_string),
                error,
            )
        };

        let zone = self
            .resolver
            .resolve(&endpoint.dns_name)
            .map_err(|e| fail(None, e))?;
        let record_type = endpoint.concrete_type().map_err(|e| fail(Some(zone), e))?;
        let id = endpoint.record_id().map_err(|e| fail(Some(zone), e))?;

        match self.store.delete(zone, record_type, &id).await {
            Ok(()) => info!("Deleted record {} (ID: {}) from zone {}", endpoint.identity(), id, zone),
            Err(e) if e.is_not_found() => {
                debug!("Record {} (ID: {}) already absent from zone {}", endpoint.identity(), id, zone)
            }
            Err(e) => return Err(fail(Some(zone), e)),
        }

        self.emit_event(SyncEvent::Deleted {
            subject: endpoint.identity(),
            zone: zone.to_string(),
            id: id.to_string(),
        });
        Ok(())
    }

    /// Create one remote record per non-empty target
    async fn create_endpoint(&self, endpoint: &Endpoint, failures: &mut FailureCollector) {
        let zone = match self.resolver.resolve(&endpoint.dns_name) {
            Ok(zone) => zone,
            Err(e) => {
                let failure = OperationFailure::new(Operation::Create, endpoint.identity(), None, e);
                self.record_failure(failures, failure);
                return;
            }
        };
        let fail = |subject: String, error: Error| {
            OperationFailure::new(Operation::Create, subject, Some(zone.to_string()), error)
        };

        let record_type = match endpoint.parsed_type() {
            Ok(record_type) => record_type,
            Err(e) => {
                self.record_failure(failures, fail(endpoint.identity(), e));
                return;
            }
        };

        if endpoint.targets.is_empty() {
            let e = Error::invalid_target("create requires at least one target, got 0");
            self.record_failure(failures, fail(endpoint.identity(), e));
            return;
        }

        debug!(
            "Creating {} with TTL {} (accepted, not transmitted)",
            endpoint.identity(),
            self.effective_ttl(endpoint)
        );

        for target in &endpoint.targets {
            if target.trim().is_empty() {
                warn!("Skipping empty target for {}", endpoint.identity());
                continue;
            }
            let subject = format!("{} -> {}", endpoint.identity(), target);

            let record = match codec::encode(endpoint, record_type, target) {
                Ok(record) => record,
                Err(e) => {
                    self.record_failure(failures, fail(subject, e));
                    continue;
                }
            };

            match self.store.create(zone, record_type, &record).await {
                Ok(created) => {
                    let id = created.id.map(|id| id.to_string());
                    info!(
                        "Created record {} in zone {} (ID: {})",
                        subject,
                        zone,
                        id.as_deref().unwrap_or("?")
                    );
                    self.emit_event(SyncEvent::Created {
                        subject,
                        zone: zone.to_string(),
                        id,
                    });
                }
                Err(e) => self.record_failure(failures, fail(subject, e)),
            }
        }
    }

    /// Apply one (old, new) update pair with the configured strategy
    async fn update_endpoint(
        &self,
        old: Option<&Endpoint>,
        new: &Endpoint,
    ) -> std::result::Result<(), OperationFailure> {
        let fail = |zone: Option<&Zone>, error: Error| {
            OperationFailure::new(
                Operation::Update,
                new.identity(),
                zone.map(ToString::to_string),
                error,
            )
        };

        let zone = self
            .resolver
            .resolve(&new.dns_name)
            .map_err(|e| fail(None, e))?;
        let record_type = new.parsed_type().map_err(|e| fail(Some(zone), e))?;
        let target = match new.targets.as_slice() {
            [target] => target,
            targets => {
                return Err(fail(
                    Some(zone),
                    Error::invalid_target(format!(
                        "update requires exactly one target, got {}",
                        targets.len()
                    )),
                ));
            }
        };
        let record = codec::encode(new, record_type, target).map_err(|e| fail(Some(zone), e))?;

        let id = match self.update_strategy {
            UpdateStrategy::InPlace => {
                let id = match (new.record_id(), old) {
                    (Err(Error::MissingIdentifier(_)), Some(old)) => old.record_id(),
                    (result, _) => result,
                }
                .map_err(|e| fail(Some(zone), e))?;

                self.store
                    .update(zone, record_type, &id, &record)
                    .await
                    .map_err(|e| fail(Some(zone), e))?;
                info!("Updated record {} (ID: {}) in zone {} to {}", new.identity(), id, zone, target);
                id.to_string()
            }
            UpdateStrategy::Recreate => {
                let old = old.ok_or_else(|| {
                    fail(
                        Some(zone),
                        Error::missing_identifier("recreate requires the old endpoint"),
                    )
                })?;
                let old_zone = self
                    .resolver
                    .resolve(&old.dns_name)
                    .map_err(|e| fail(None, e))?;
                let old_type = old.concrete_type().map_err(|e| fail(Some(old_zone), e))?;
                let old_id = old.record_id().map_err(|e| fail(Some(old_zone), e))?;

                match self.store.delete(old_zone, old_type, &old_id).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        debug!("Old record {} (ID: {}) already absent", old.identity(), old_id)
                    }
                    Err(e) => {
                        return Err(fail(
                            Some(old_zone),
                            Error::Other(format!("delete of old record {} failed: {}", old_id, e)),
                        ));
                    }
                }

                let created = self
                    .store
                    .create(zone, record_type, &record)
                    .await
                    .map_err(|e| {
                        fail(
                            Some(zone),
                            Error::Other(format!(
                                "old record {} deleted but create failed: {}",
                                old_id, e
                            )),
                        )
                    })?;
                let id = created.id.map(|id| id.to_string()).unwrap_or_default();
                info!(
                    "Recreated record {} in zone {} (old ID: {}, new ID: {})",
                    new.identity(),
                    zone,
                    old_id,
                    id
                );
                id
            }
        };

        self.emit_event(SyncEvent::Updated {
            subject: new.identity(),
            zone: zone.to_string(),
            id,
        });
        Ok(())
    }

    fn effective_ttl(&self, endpoint: &Endpoint) -> i64 {
        if endpoint.record_ttl > 0 {
            endpoint.record_ttl
        } else {
            self.default_ttl
        }
    }

    fn record_failure(&self, failures: &mut FailureCollector, failure: OperationFailure) {
        error!("Failed to {}", failure);
        self.emit_event(SyncEvent::Failed {
            operation: failure.operation,
            subject: failure.subject.clone(),
            error: failure.error.to_string(),
        });
        failures.record(failure);
    }

    /// Emit an engine event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: SyncEvent) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        // Send event, logging warning if channel is full (backpressure)
        if tx.try_send(event).is_err() {
            warn!("Event channel full or closed, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Fold one (zone, type) listing result into the shared accumulator
fn collect_listing(
    acc: &mut ListAccumulator,
    resolver: &ZoneResolver,
    zone: &Zone,
    record_type: RecordType,
    ttl: i64,
    result: Result<Vec<crate::endpoint::ZoneRecord>>,
) {
    let records = match result {
        Ok(records) => records,
        Err(e) if e.is_not_found() => {
            debug!("No {} records in zone {}", record_type, zone);
            return;
        }
        Err(e) => {
            warn!("Failed to get {} records for zone {}: {}", record_type, zone, e);
            acc.failures.record(OperationFailure::new(
                Operation::List,
                record_type.as_str(),
                Some(zone.to_string()),
                e,
            ));
            return;
        }
    };

    let mut kept = 0usize;
    for record in records {
        // Only keep names owned by this zone; siblings and names under a
        // more specific managed zone belong to another listing.
        if resolver.matching_zone(&record.name) != Some(zone) {
            debug!("Dropping {} record {} outside zone {}", record_type, record.name, zone);
            continue;
        }
        match codec::decode(&record, record_type, ttl) {
            Ok(endpoint) => {
                acc.endpoints.push(endpoint);
                kept += 1;
            }
            Err(e) => acc.failures.record(OperationFailure::new(
                Operation::List,
                format!("{} {}", record.name, record_type),
                Some(zone.to_string()),
                e,
            )),
        }
    }
    debug!("Fetched {} {} record(s) from zone {}", kept, record_type, zone);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{RecordId, ZoneRecord};

    #[test]
    fn test_engine_event_clone() {
        let event = SyncEvent::Planned {
            operation: Operation::Create,
            subject: "www.example.com. A".to_string(),
            zone: Some("example.com".to_string()),
        };
        assert_eq!(event.clone(), event);
    }

    #[test]
    fn test_collect_listing_filters_foreign_names() {
        let resolver = ZoneResolver::new(&["example.com", "sub.example.com"]);
        let zone = Zone::new("example.com");
        let mut acc = ListAccumulator {
            endpoints: Vec::new(),
            failures: FailureCollector::new("list records"),
        };
        let records = vec![
            ZoneRecord::new("www.example.com", "1.1.1.1").with_id(RecordId::parse("1").unwrap()),
            ZoneRecord::new("www.sub.example.com", "2.2.2.2").with_id(RecordId::parse("2").unwrap()),
            ZoneRecord::new("www.elsewhere.net", "3.3.3.3").with_id(RecordId::parse("3").unwrap()),
        ];

        collect_listing(&mut acc, &resolver, &zone, RecordType::A, 300, Ok(records));

        assert_eq!(acc.endpoints.len(), 1);
        assert_eq!(acc.endpoints[0].dns_name, "www.example.com.");
        assert_eq!(acc.endpoints[0].record_ttl, 300);
        assert!(acc.failures.is_empty());
    }

    #[test]
    fn test_collect_listing_absorbs_not_found() {
        let resolver = ZoneResolver::new(&["example.com"]);
        let zone = Zone::new("example.com");
        let mut acc = ListAccumulator {
            endpoints: Vec::new(),
            failures: FailureCollector::new("list records"),
        };

        collect_listing(&mut acc, &resolver, &zone, RecordType::Srv, 300, Err(Error::not_found("no srv")));
        assert!(acc.failures.is_empty());

        collect_listing(&mut acc, &resolver, &zone, RecordType::Mx, 300, Err(Error::transport("reset")));
        assert_eq!(acc.failures.len(), 1);
    }
}
