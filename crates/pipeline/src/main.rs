//! Churn scoring CLI
//!
//! Single-shot batch job: optionally ingest a customer CSV snapshot,
//! then fit, score, and replace the prediction table.

use anyhow::{Context, Result};
use churnml_model::ForestConfig;
use churnml_pipeline::{read_customers_csv, run, PipelineConfig};
use churnml_storage::{SledStore, TableStore, WriteMode};
use churnml_types::StoreConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "churn-score")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch churn scoring: fit, score, and replace the prediction table", long_about = None)]
struct Args {
    /// Path of the sled database directory
    #[arg(short, long)]
    db: PathBuf,

    /// Replace the customer table with this CSV snapshot before scoring
    #[arg(long)]
    import_csv: Option<PathBuf>,

    /// Seed for the splitter and the forest
    #[arg(long, default_value = "42")]
    seed: i64,

    /// Held-out fraction for evaluation
    #[arg(long, default_value = "0.3")]
    test_fraction: f64,

    /// Number of trees in the forest
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "12")]
    max_depth: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Probability at or above which a row is predicted as churn
    #[arg(long, default_value = "0.5")]
    threshold: f64,

    /// Insert row-by-row after the clear instead of one batched apply
    #[arg(long)]
    truncate_append: bool,

    /// Output directory for the model artifact (model.json + model.hash)
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("churn-score v{}", env!("CARGO_PKG_VERSION"));

    let store =
        SledStore::open(&StoreConfig::new(&args.db)).context("Failed to open table store")?;

    if let Some(csv) = &args.import_csv {
        info!("Importing customer snapshot from: {}", csv.display());
        let records = read_customers_csv(csv).context("Failed to parse customer CSV")?;
        let rows = store
            .replace_customers(&records)
            .context("Failed to write customer snapshot")?;
        info!("Imported {} customer rows", rows);
    }

    let config = PipelineConfig {
        test_fraction: args.test_fraction,
        seed: args.seed,
        forest: ForestConfig {
            num_trees: args.trees,
            max_depth: args.max_depth,
            min_samples_leaf: args.min_samples_leaf,
            decision_threshold: args.threshold,
            seed: args.seed,
            ..ForestConfig::default()
        },
        write_mode: if args.truncate_append {
            WriteMode::TruncateAppend
        } else {
            WriteMode::Replace
        },
    };

    info!("Run configuration:");
    info!("  Seed: {}", config.seed);
    info!("  Test fraction: {}", config.test_fraction);
    info!("  Trees: {}", config.forest.num_trees);
    info!("  Max depth: {}", config.forest.max_depth);
    info!("  Min samples per leaf: {}", config.forest.min_samples_leaf);
    info!("  Decision threshold: {}", config.forest.decision_threshold);
    info!("  Write mode: {:?}", config.write_mode);

    let (forest, summary) = run(&store, &config)?;

    info!("Run complete");
    info!(
        "  Rows: {} loaded ({} churned, {} retained)",
        summary.rows_loaded, summary.churned, summary.retained
    );
    info!(
        "  Split: {} train / {} test",
        summary.train_rows, summary.test_rows
    );
    info!("  ROC AUC: {:.4}", summary.report.roc_auc);
    info!("  Accuracy: {:.4}", summary.report.accuracy);
    info!(
        "  Churn class: precision {:.3}, recall {:.3}, f1 {:.3} (support {})",
        summary.report.positive.precision,
        summary.report.positive.recall,
        summary.report.positive.f1,
        summary.report.positive.support
    );
    info!("  Feature importance:");
    for entry in &summary.importances {
        info!("    {:<16} {:.4}", entry.column, entry.importance);
    }
    info!(
        "  Risk tiers: {} low / {} medium / {} high",
        summary.tiers.low, summary.tiers.medium, summary.tiers.high
    );
    info!(
        "  Destination: {} rows written ({} stale rows superseded)",
        summary.rows_written, summary.stale_rows
    );
    info!("  Model hash: {}", summary.model_hash);

    if let Some(out_dir) = &args.model_out {
        std::fs::create_dir_all(out_dir).context("Failed to create model output directory")?;

        let (json, hash) = forest.to_artifact().context("Failed to serialize model")?;

        let model_path = out_dir.join("model.json");
        std::fs::write(&model_path, &json).context("Failed to write model file")?;

        let hash_path = out_dir.join("model.hash");
        std::fs::write(&hash_path, &hash).context("Failed to write hash file")?;

        info!("  Model artifact: {} ({})", model_path.display(), hash);
    }

    Ok(())
}
