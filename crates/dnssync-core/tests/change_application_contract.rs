//! Contract Test: Change Application
//!
//! Constraints verified:
//! - Deletions run before creations, creations before updates
//! - A create fans out to one remote record per target
//! - Deleting an already-absent record succeeds
//! - Re-applying the same change set converges without duplicate failures
//! - Event subscribers see each completed operation

mod common;

use common::*;
use dnssync_core::{Changes, Endpoint, RecordType, SyncEngine, SyncEvent, ZoneRecord};
use std::sync::Arc;

fn engine_for(store: &MockRecordStore) -> SyncEngine {
    SyncEngine::new(
        Arc::new(MockRecordStore::sharing_counters_with(store)),
        minimal_config(&["example.com"]),
    )
    .expect("engine construction succeeds")
}

#[tokio::test]
async fn create_a_record_targets_owning_zone() {
    let store = MockRecordStore::new();
    let engine = engine_for(&store);

    let changes = Changes {
        create: vec![Endpoint::new("www.example.com", "A", vec!["1.2.3.4".into()])],
        ..Default::default()
    };
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);

    assert_eq!(store.create_calls(), 1);
    assert_eq!(
        store.call_log(),
        vec!["create example.com A www.example.com. 1.2.3.4".to_string()]
    );
    let records = store.records("example.com", RecordType::A);
    assert_eq!(records.len(), 1);
    assert!(records[0].id.is_some());
}

#[tokio::test]
async fn create_fans_out_per_target_and_skips_empty_ones() {
    let store = MockRecordStore::new();
    let engine = engine_for(&store);

    let changes = Changes {
        create: vec![Endpoint::new(
            "www.example.com.",
            "A",
            vec!["1.1.1.1".into(), "".into(), "2.2.2.2".into()],
        )],
        ..Default::default()
    };
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);

    assert_eq!(store.create_calls(), 2);
    assert_eq!(store.records("example.com", RecordType::A).len(), 2);
}

#[tokio::test]
async fn create_mx_and_srv_sends_structured_fields() {
    let store = MockRecordStore::new();
    let engine = engine_for(&store);

    let changes = Changes {
        create: vec![
            Endpoint::new("example.com", "MX", vec!["10 mail.example.com.".into()]),
            Endpoint::new("_sip._tcp.example.com", "SRV", vec!["10 20 5060 sip.example.com.".into()]),
        ],
        ..Default::default()
    };
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);

    let mx = store.records("example.com", RecordType::Mx);
    assert_eq!(mx.len(), 1);
    assert_eq!(mx[0].priority, Some(10));
    assert_eq!(mx[0].destination, "mail.example.com.");

    let srv = store.records("example.com", RecordType::Srv);
    assert_eq!(srv.len(), 1);
    assert_eq!((srv[0].priority, srv[0].weight, srv[0].port), (Some(10), Some(20), Some(5060)));
    assert_eq!(srv[0].destination, "sip.example.com.");
}

#[tokio::test]
async fn operations_run_in_delete_create_update_order() {
    let store = MockRecordStore::new();
    store.seed_with_id("example.com", RecordType::A, "1", ZoneRecord::new("old.example.com.", "1.1.1.1"));
    store.seed_with_id("example.com", RecordType::A, "2", ZoneRecord::new("www.example.com.", "2.2.2.2"));
    let engine = engine_for(&store);

    let changes = Changes {
        create: vec![Endpoint::new("new.example.com", "A", vec!["3.3.3.3".into()])],
        update_old: vec![existing("www.example.com.", "A", "2.2.2.2", "2")],
        update_new: vec![existing("www.example.com.", "A", "4.4.4.4", "2")],
        delete: vec![existing("old.example.com.", "A", "1.1.1.1", "1")],
    };
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);

    let log = store.call_log();
    assert_eq!(log.len(), 3);
    assert!(log[0].starts_with("delete example.com A 1"));
    assert!(log[1].starts_with("create example.com A new.example.com."));
    assert!(log[2].starts_with("update example.com A 2 4.4.4.4"));
}

#[tokio::test]
async fn deleting_absent_record_is_success() {
    let store = MockRecordStore::new();
    let engine = engine_for(&store);

    let changes = Changes {
        delete: vec![existing("gone.example.com.", "A", "1.1.1.1", "999")],
        ..Default::default()
    };

    tokio_test::assert_ok!(engine.apply_changes(&changes).await);
    assert_eq!(store.delete_calls(), 1);
}

#[tokio::test]
async fn reapplying_deletes_converges() {
    let store = MockRecordStore::new();
    let id = store.seed("example.com", RecordType::Txt, ZoneRecord::new("example.com.", "v=spf1 -all"));
    let engine = engine_for(&store);

    let changes = Changes {
        delete: vec![existing("example.com.", "TXT", "v=spf1 -all", &id)],
        ..Default::default()
    };

    tokio_test::assert_ok!(engine.apply_changes(&changes).await);
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);

    assert_eq!(store.delete_calls(), 2);
    assert!(store.records("example.com", RecordType::Txt).is_empty());
}

#[tokio::test]
async fn listed_endpoint_can_be_deleted_via_its_properties() {
    let store = MockRecordStore::new();
    store.seed_with_id(
        "example.com",
        RecordType::Cname,
        "77",
        ZoneRecord::new("alias.example.com.", "www.example.com."),
    );
    let engine = engine_for(&store);

    let mut listed = engine.list_records().await.into_result().unwrap();
    assert_eq!(listed.len(), 1);
    // external-dns may drop the set identifier; the property still identifies it
    listed[0].set_identifier.clear();

    let changes = Changes {
        delete: listed,
        ..Default::default()
    };
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);
    assert!(store.records("example.com", RecordType::Cname).is_empty());
}

#[tokio::test]
async fn empty_change_set_makes_no_calls() {
    let store = MockRecordStore::new();
    let engine = engine_for(&store);

    tokio_test::assert_ok!(engine.apply_changes(&Changes::default()).await);
    assert_eq!(store.total_calls(), 0);
}

#[tokio::test]
async fn subscribers_receive_operation_events() {
    let store = MockRecordStore::new();
    store.seed_with_id("example.com", RecordType::A, "5", ZoneRecord::new("old.example.com.", "1.1.1.1"));
    let mut engine = engine_for(&store);
    let mut events = engine.subscribe();

    let changes = Changes {
        create: vec![Endpoint::new("www.example.com", "A", vec!["1.2.3.4".into()])],
        delete: vec![existing("old.example.com.", "A", "1.1.1.1", "5")],
        ..Default::default()
    };
    tokio_test::assert_ok!(engine.apply_changes(&changes).await);

    match events.try_recv().expect("delete event") {
        SyncEvent::Deleted { id, zone, .. } => {
            assert_eq!(id, "5");
            assert_eq!(zone, "example.com");
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        events.try_recv().expect("create event"),
        SyncEvent::Created { id: Some(_), .. }
    ));
    assert!(events.try_recv().is_err());
}
