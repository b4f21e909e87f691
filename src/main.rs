//! Command-line entry point: clean one customer export into SQLite.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use customer_cleaning::config::{
    DataPaths, FutureSignupPolicy, LoadOptions, PipelineOptions, StoreOptions, ValidationMode,
    DEFAULT_TABLE,
};
use customer_cleaning::pipeline::observability::{
    CompositeObserver, FileObserver, PipelineObserver, TracingObserver,
};
use customer_cleaning::pipeline::Pipeline;

/// Clean a customer export and replace the `customers` relation in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "customer-cleaning", version, about, long_about = None)]
struct Cli {
    /// Delimited file to load
    #[arg(default_value = "data/raw/customers.csv")]
    source: PathBuf,

    /// SQLite database to write (defaults to data/cleaned_customers.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Relation replaced on every run
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    /// Field delimiter (single byte); inferred from the extension if omitted
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Warn instead of failing when required columns are missing
    #[arg(long)]
    lenient: bool,

    /// Report negative day counts for signups in the future
    #[arg(long)]
    allow_negative_days: bool,

    /// Append stage events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(filter),
        )
        .init();

    let delimiter = match cli.delimiter.map(u8::try_from).transpose() {
        Ok(d) => d,
        Err(_) => {
            error!("delimiter must be a single-byte character");
            return ExitCode::FAILURE;
        }
    };

    let mut observers: Vec<Arc<dyn PipelineObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = cli.log_file.as_ref() {
        observers.push(Arc::new(FileObserver::new(path)));
    }

    let options = PipelineOptions {
        load: LoadOptions { delimiter },
        validation: if cli.lenient {
            ValidationMode::Lenient
        } else {
            ValidationMode::Strict
        },
        future_signups: if cli.allow_negative_days {
            FutureSignupPolicy::AllowNegative
        } else {
            FutureSignupPolicy::ClampToZero
        },
        store: StoreOptions {
            database_path: cli.db.unwrap_or_else(|| DataPaths::default().database()),
            table: cli.table,
        },
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        ..Default::default()
    };

    match Pipeline::new(options).run(&cli.source) {
        Ok(summary) => {
            println!(
                "{} -> {} ({}): {} rows written, {} dropped",
                summary.source.display(),
                summary.database_path.display(),
                summary.table,
                summary.rows_persisted,
                summary.rows_dropped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
