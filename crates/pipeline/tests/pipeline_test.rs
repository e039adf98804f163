//! End-to-end pipeline tests against a scratch sled store

use churnml_model::ForestConfig;
use churnml_pipeline::{run, PipelineConfig, PipelineError};
use churnml_storage::{SledStore, TableStore, WriteMode};
use churnml_types::{CustomerRecord, DataError, ScoredRecord, StoreConfig};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> SledStore {
    SledStore::open(&StoreConfig::new(dir.path().join("db"))).unwrap()
}

/// 1000 customers, 260 churners. Churners have short tenure and high
/// monthly charges; deterministic jitter keeps rows distinct.
fn synthetic_customers() -> Vec<CustomerRecord> {
    let mut records = Vec::with_capacity(1000);

    for i in 0..1000usize {
        let jitter = (i % 17) as f64;
        if i < 260 {
            records.push(CustomerRecord {
                tenure: 1 + (i % 6) as u32,
                monthly_charges: 85.0 + jitter,
                total_charges: 170.0 + jitter * 4.0,
                senior_citizen: i % 3 == 0,
                churn: "Yes".to_string(),
            });
        } else {
            records.push(CustomerRecord {
                tenure: 24 + (i % 48) as u32,
                monthly_charges: 30.0 + jitter,
                total_charges: 1200.0 + jitter * 20.0,
                senior_citizen: i % 9 == 0,
                churn: "No".to_string(),
            });
        }
    }

    records
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        forest: ForestConfig {
            num_trees: 16,
            max_depth: 8,
            ..ForestConfig::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_full_run_writes_evaluation_partition() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.replace_customers(&synthetic_customers()).unwrap();

    let (forest, summary) = run(&store, &test_config()).unwrap();

    assert_eq!(summary.rows_loaded, 1000);
    assert_eq!(summary.churned, 260);
    assert_eq!(summary.retained, 740);
    // 0.30 split with per-class rounding: 78 + 222 held out
    assert_eq!(summary.test_rows, 300);
    assert_eq!(summary.train_rows, 700);
    assert_eq!(summary.rows_written, 300);

    let written = store.read_predictions().unwrap();
    assert_eq!(written.len(), 300);
    assert_eq!(
        written.iter().map(|r| r.actual_churn as usize).sum::<usize>(),
        78
    );
    assert!(written
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.predicted_churn_prob)));

    // Tier counts cover every scored row
    assert_eq!(
        summary.tiers.low + summary.tiers.medium + summary.tiers.high,
        300
    );

    // Importances: one entry per feature, normalized
    assert_eq!(summary.importances.len(), 4);
    let total: f64 = summary.importances.iter().map(|e| e.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);

    // Separable structure should rank well
    assert!(summary.report.roc_auc > 0.9);
    assert_eq!(forest.feature_count(), 4);
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.replace_customers(&synthetic_customers()).unwrap();

    let config = test_config();
    let (_, summary1) = run(&store, &config).unwrap();
    let first = store.read_predictions().unwrap();

    let (_, summary2) = run(&store, &config).unwrap();
    let second = store.read_predictions().unwrap();

    assert_eq!(first, second);
    assert_eq!(summary1.model_hash, summary2.model_hash);
    assert_eq!(store.run_state().run_counter, 2);
}

#[test]
fn test_stale_predictions_fully_superseded() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.replace_customers(&synthetic_customers()).unwrap();

    // 500 stale rows with a marker probability no real run produces
    let stale: Vec<ScoredRecord> = (0..500)
        .map(|i| ScoredRecord::from_row(&[i as f64, 0.0, 0.0, 0.0], -1.0, 0))
        .collect();
    store
        .replace_predictions(&stale, WriteMode::Replace)
        .unwrap();

    let (_, summary) = run(&store, &test_config()).unwrap();

    assert_eq!(summary.stale_rows, 500);
    let written = store.read_predictions().unwrap();
    assert_eq!(written.len(), 300);
    assert!(written.iter().all(|r| r.predicted_churn_prob >= 0.0));
}

#[test]
fn test_unknown_churn_aborts_before_write() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let mut records = synthetic_customers();
    records[500].churn = "Unknown".to_string();
    store.replace_customers(&records).unwrap();

    // Pre-populate the destination so an erroneous write would be visible
    let stale: Vec<ScoredRecord> = (0..5)
        .map(|i| ScoredRecord::from_row(&[i as f64, 0.0, 0.0, 0.0], 0.5, 0))
        .collect();
    store
        .replace_predictions(&stale, WriteMode::Replace)
        .unwrap();

    let err = run(&store, &test_config()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Data(DataError::UnknownChurnValue { row: 500, .. })
    ));

    // The destination table was never touched
    assert_eq!(store.read_predictions().unwrap(), stale);
}

#[test]
fn test_single_class_source_aborts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let records: Vec<CustomerRecord> = synthetic_customers()
        .into_iter()
        .map(|mut r| {
            r.churn = "No".to_string();
            r
        })
        .collect();
    store.replace_customers(&records).unwrap();

    assert!(matches!(
        run(&store, &test_config()),
        Err(PipelineError::Model(_))
    ));
}

#[test]
fn test_truncate_append_mode_equivalent_content() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.replace_customers(&synthetic_customers()).unwrap();

    let mut config = test_config();
    run(&store, &config).unwrap();
    let replace_rows = store.read_predictions().unwrap();

    config.write_mode = WriteMode::TruncateAppend;
    run(&store, &config).unwrap();
    let append_rows = store.read_predictions().unwrap();

    assert_eq!(replace_rows, append_rows);
}

#[test]
fn test_empty_source_aborts() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert!(matches!(
        run(&store, &test_config()),
        Err(PipelineError::Data(DataError::Empty))
    ));
}
