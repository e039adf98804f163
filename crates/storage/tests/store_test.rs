//! Integration tests for the sled-backed table store

use churnml_storage::{SledStore, StoreError, TableStore, WriteMode};
use churnml_types::{CustomerRecord, ScoredRecord, StoreConfig};
use tempfile::{NamedTempFile, TempDir};

fn open_store(dir: &TempDir) -> SledStore {
    SledStore::open(&StoreConfig::new(dir.path().join("db"))).unwrap()
}

fn customer(tenure: u32, churn: &str) -> CustomerRecord {
    CustomerRecord {
        tenure,
        monthly_charges: 50.0 + tenure as f64,
        total_charges: tenure as f64 * 50.0,
        senior_citizen: tenure % 2 == 0,
        churn: churn.to_string(),
    }
}

fn scored(index: usize, probability: f64, label: u8) -> ScoredRecord {
    ScoredRecord {
        tenure: index as f64,
        monthly_charges: 40.0 + index as f64,
        total_charges: index as f64 * 40.0,
        senior_citizen: 0.0,
        predicted_churn_prob: probability,
        actual_churn: label,
    }
}

#[test]
fn test_customer_round_trip_preserves_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let records: Vec<CustomerRecord> = (0..50)
        .map(|i| customer(i, if i % 4 == 0 { "Yes" } else { "No" }))
        .collect();

    assert_eq!(store.replace_customers(&records).unwrap(), 50);
    assert_eq!(store.load_customers().unwrap(), records);
}

#[test]
fn test_prediction_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let records: Vec<ScoredRecord> = (0..30).map(|i| scored(i, i as f64 / 30.0, (i % 3 == 0) as u8)).collect();

    let outcome = store.replace_predictions(&records, WriteMode::Replace).unwrap();
    assert_eq!(outcome.rows_written, 30);
    assert_eq!(outcome.stale_rows, 0);

    let read_back = store.read_predictions().unwrap();
    assert_eq!(read_back.len(), 30);
    assert_eq!(read_back, records);
    for (original, loaded) in records.iter().zip(read_back.iter()) {
        assert_eq!(loaded.actual_churn, original.actual_churn);
        assert!((loaded.predicted_churn_prob - original.predicted_churn_prob).abs() < 1e-12);
    }
}

#[test]
fn test_stale_rows_fully_superseded() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let stale: Vec<ScoredRecord> = (0..500).map(|i| scored(i, 0.99, 1)).collect();
    store.replace_predictions(&stale, WriteMode::Replace).unwrap();

    let fresh: Vec<ScoredRecord> = (0..300).map(|i| scored(i + 10_000, 0.01, 0)).collect();
    let outcome = store.replace_predictions(&fresh, WriteMode::Replace).unwrap();

    assert_eq!(outcome.stale_rows, 500);
    assert_eq!(outcome.rows_written, 300);

    let read_back = store.read_predictions().unwrap();
    assert_eq!(read_back.len(), 300);
    assert!(read_back.iter().all(|r| r.tenure >= 10_000.0));
}

#[test]
fn test_truncate_append_mode() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let stale: Vec<ScoredRecord> = (0..10).map(|i| scored(i, 0.5, 0)).collect();
    store.replace_predictions(&stale, WriteMode::Replace).unwrap();

    let fresh: Vec<ScoredRecord> = (0..25).map(|i| scored(i + 100, 0.25, 0)).collect();
    let outcome = store
        .replace_predictions(&fresh, WriteMode::TruncateAppend)
        .unwrap();

    assert_eq!(outcome.stale_rows, 10);
    assert_eq!(store.read_predictions().unwrap(), fresh);
}

#[test]
fn test_run_state_tracks_completed_runs() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert_eq!(store.run_state().run_counter, 0);
    assert!(store.run_state().completed_at.is_none());

    let records: Vec<ScoredRecord> = (0..5).map(|i| scored(i, 0.5, 0)).collect();
    store.replace_predictions(&records, WriteMode::Replace).unwrap();

    let state = store.run_state();
    assert_eq!(state.run_counter, 1);
    assert_eq!(state.rows_written, 5);
    assert!(state.completed_at.is_some());

    store.replace_predictions(&records, WriteMode::Replace).unwrap();
    assert_eq!(store.run_state().run_counter, 2);
}

#[test]
fn test_run_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db");

    {
        let store = SledStore::open(&StoreConfig::new(&path)).unwrap();
        let records: Vec<ScoredRecord> = (0..7).map(|i| scored(i, 0.5, 0)).collect();
        store.replace_predictions(&records, WriteMode::Replace).unwrap();
    }

    let reopened = SledStore::open(&StoreConfig::new(&path)).unwrap();
    let state = reopened.run_state();
    assert_eq!(state.run_counter, 1);
    assert_eq!(state.rows_written, 7);
    assert_eq!(reopened.read_predictions().unwrap().len(), 7);
}

#[test]
fn test_unopenable_path_is_connectivity_error() {
    // A plain file where the database directory should be
    let file = NamedTempFile::new().unwrap();

    let err = SledStore::open(&StoreConfig::new(file.path())).unwrap_err();
    assert!(matches!(err, StoreError::Connectivity { .. }));
}

#[test]
fn test_empty_tables_read_empty() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert!(store.load_customers().unwrap().is_empty());
    assert!(store.read_predictions().unwrap().is_empty());
}
