//! # Integrity Service Tests

use super::*;
use crate::adapters::InMemoryDocumentStore;
use crate::domain::errors::StoreError;
use crate::domain::partition::DocType;
use crate::domain::report::Anomaly;
use crate::test_utils::{populate, populate_actions, store_with_ranges, test_config, test_layout};

fn make_test_service(store: InMemoryDocumentStore) -> IntegrityService<InMemoryDocumentStore> {
    IntegrityService::new(store, test_config()).unwrap()
}

#[test]
fn test_invalid_config_rejected() {
    let config = test_config().with_duplicate_page_size(0);
    assert!(matches!(
        IntegrityService::new(InMemoryDocumentStore::new(), config),
        Err(IntegrityError::InvalidConfig { .. })
    ));
}

#[test]
fn test_healthy_store_reports_bounds() {
    let service = make_test_service(store_with_ranges(&[(100, 350)]));
    let report = service.full_integrity_check().unwrap();
    assert_eq!(report.first.global_block_num(), 100);
    assert_eq!(report.last.global_block_num(), 350);
    assert_eq!(report.delta_partitions, 3);
    assert_eq!(report.scan_windows, 3);
    assert!(report.histogram_queries > 0);
}

#[test]
fn test_empty_store_is_data_empty() {
    let service = make_test_service(InMemoryDocumentStore::new());
    assert!(matches!(service.full_integrity_check(), Err(IntegrityError::DataEmpty)));
    assert_eq!(service.first_indexed_block().unwrap(), None);
}

#[test]
fn test_empty_partitions_are_data_empty() {
    let mut store = InMemoryDocumentStore::new();
    store.create_index(test_layout().partition_name(DocType::Delta, 0));
    let mut service = make_test_service(store);
    assert!(matches!(service.repair(), Err(IntegrityError::DataEmpty)));
}

#[test]
fn test_duplicates_take_priority_over_gaps() {
    let layout = test_layout();
    let mut store = store_with_ranges(&[(100, 120), (122, 200)]);
    populate(&mut store, &layout, &[(150, 150)]);
    let service = make_test_service(store);

    match service.full_integrity_check() {
        Err(IntegrityError::DuplicatesFound { deltas, actions }) => {
            assert_eq!(deltas, [150].into_iter().collect());
            assert!(actions.is_empty());
        }
        other => panic!("expected duplicates, got {other:?}"),
    }
}

#[test]
fn test_transport_failure_is_not_corruption() {
    let mut store = store_with_ranges(&[(100, 200)]);
    store.set_unavailable(true);
    let mut service = make_test_service(store);

    let err = service.full_integrity_check().unwrap_err();
    assert!(matches!(err, IntegrityError::Catalog(StoreError::Unavailable { .. })));
    assert!(!err.is_corruption());
    assert!(service.repair().is_err());
}

#[test]
fn test_repair_duplicates_rolls_back_before_earliest() {
    let layout = test_layout();
    let mut store = store_with_ranges(&[(100, 200)]);
    populate(&mut store, &layout, &[(150, 151)]);
    populate_actions(&mut store, &layout, &[("0xaa", 110), ("0xaa", 115), ("0xbb", 140)]);
    let mut service = make_test_service(store);

    let report = service.repair().unwrap();
    assert!(matches!(report.repaired, Some(Anomaly::Duplicates { .. })));
    assert_eq!(report.resume.global_block, 109);
    assert_eq!(report.resume.native_block, 119);

    let last = service.last_indexed_block().unwrap().unwrap();
    assert_eq!(last.global_block_num(), 109);
    assert_eq!(service.store().document_count(&layout.pattern(DocType::Action)), 0);
    assert!(service.full_integrity_check().is_ok());
}

#[test]
fn test_repair_whole_partition_gap() {
    // native partition 1 (globals 90..=189) missing entirely
    let store = store_with_ranges(&[(0, 89), (190, 289)]);
    let mut service = make_test_service(store);

    assert!(matches!(
        service.full_integrity_check(),
        Err(IntegrityError::GapFound { block: 90 })
    ));

    let report = service.repair().unwrap();
    assert_eq!(report.resume.global_block, 89);
    assert_eq!(report.resume.native_block, 99);
    assert_eq!(
        report.partitions_deleted,
        vec![test_layout().partition_name(DocType::Delta, 2)]
    );
    assert_eq!(service.last_indexed_block().unwrap().unwrap().global_block_num(), 89);
}
