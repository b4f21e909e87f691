//! Pipeline orchestrator.
//!
//! [`Pipeline::run`] executes the stages strictly in order:
//!
//! `Loading -> Validating -> Cleaning -> Transforming -> Persisting -> Done`
//!
//! The dataset is owned by the run and handed from stage to stage by value. The first failing
//! stage ends the run: the dataset is dropped and the stage's [`PipelineError`] is returned
//! as-is. Nothing is written to the store unless every earlier stage succeeded.
//!
//! If an [`observability::PipelineObserver`] is configured, every stage start, success and
//! failure is reported to it, and failures at or above
//! [`crate::config::PipelineOptions::alert_at_or_above`] also trigger `on_alert`.

pub mod observability;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use crate::config::PipelineOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::stages::{self, CleanOutcome, PersistStats, ValidationReport};
use crate::types::DataSet;

use observability::{PipelineSeverity, StageContext, StageStats};

/// States of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    /// Reading the source file.
    Loading,
    /// Checking required columns.
    Validating,
    /// Normalizing and typing columns, dropping unusable rows.
    Cleaning,
    /// Deriving `days_since_signup`.
    Transforming,
    /// Replacing the destination relation.
    Persisting,
    /// Every stage completed.
    Done,
}

impl PipelineStage {
    /// The state that follows this one (`Done` is terminal).
    pub fn next(self) -> Self {
        match self {
            Self::Loading => Self::Validating,
            Self::Validating => Self::Cleaning,
            Self::Cleaning => Self::Transforming,
            Self::Transforming => Self::Persisting,
            Self::Persisting | Self::Done => Self::Done,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Validating => "validating",
            Self::Cleaning => "cleaning",
            Self::Transforming => "transforming",
            Self::Persisting => "persisting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Report of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Source the run read from.
    pub source: PathBuf,
    /// Rows read by the load stage.
    pub rows_loaded: usize,
    /// Rows removed by the clean stage for missing `id`/`email`.
    pub rows_dropped: usize,
    /// Rows now in the destination relation.
    pub rows_persisted: usize,
    /// Validation outcome (only non-passing in lenient mode).
    pub validation: ValidationReport,
    /// Instant `days_since_signup` was computed against.
    pub now: NaiveDateTime,
    /// Database file written to.
    pub database_path: PathBuf,
    /// Relation that was replaced.
    pub table: String,
}

/// Runs the five stages against one source.
#[derive(Debug, Default)]
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with the given options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every stage against `source`, reading the wall clock when the transform stage starts.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails, unchanged.
    pub fn run(&self, source: impl AsRef<Path>) -> PipelineResult<RunSummary> {
        self.execute(source.as_ref(), || Local::now().naive_local())
    }

    /// Like [`Self::run`], but computes `days_since_signup` against a fixed `now`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails, unchanged.
    pub fn run_at(&self, source: impl AsRef<Path>, now: NaiveDateTime) -> PipelineResult<RunSummary> {
        self.execute(source.as_ref(), move || now)
    }

    fn execute<C>(&self, source: &Path, clock: C) -> PipelineResult<RunSummary>
    where
        C: FnOnce() -> NaiveDateTime,
    {
        let opts = &self.options;

        let dataset = self.stage(
            source,
            PipelineStage::Loading,
            || stages::load_from_path(source, &opts.load),
            DataSet::row_count,
        )?;
        let rows_loaded = dataset.row_count();

        let validation = self.stage(
            source,
            PipelineStage::Validating,
            || stages::validate(&dataset, opts.validation),
            |_| rows_loaded,
        )?;

        let CleanOutcome {
            dataset,
            rows_dropped,
        } = self.stage(
            source,
            PipelineStage::Cleaning,
            || stages::clean(dataset),
            |outcome: &CleanOutcome| outcome.dataset.row_count(),
        )?;

        let (dataset, now) = self.stage(
            source,
            PipelineStage::Transforming,
            || {
                let now = clock();
                stages::transform_at(dataset, now, opts.future_signups).map(|ds| (ds, now))
            },
            |(ds, _): &(DataSet, NaiveDateTime)| ds.row_count(),
        )?;

        let persisted = self.stage(
            source,
            PipelineStage::Persisting,
            || stages::persist(&dataset, &opts.store),
            |stats: &PersistStats| stats.rows_written,
        )?;
        drop(dataset);

        info!(
            source = %source.display(),
            rows_loaded,
            rows_dropped,
            rows_persisted = persisted.rows_written,
            "Pipeline finished."
        );
        Ok(RunSummary {
            source: source.to_path_buf(),
            rows_loaded,
            rows_dropped,
            rows_persisted: persisted.rows_written,
            validation,
            now,
            database_path: persisted.database_path,
            table: persisted.table,
        })
    }

    /// Run one stage, reporting its outcome to the observer (if any).
    fn stage<T, F, R>(&self, source: &Path, stage: PipelineStage, body: F, rows: R) -> PipelineResult<T>
    where
        F: FnOnce() -> PipelineResult<T>,
        R: Fn(&T) -> usize,
    {
        let ctx = StageContext {
            source: source.to_path_buf(),
            stage,
        };
        debug!(%stage, next = %stage.next(), "stage started");
        if let Some(obs) = self.options.observer.as_ref() {
            obs.on_stage_started(&ctx);
        }

        let start = Instant::now();
        let result = body();

        if let Some(obs) = self.options.observer.as_ref() {
            match &result {
                Ok(out) => obs.on_stage_finished(
                    &ctx,
                    StageStats {
                        rows: rows(out),
                        elapsed: start.elapsed(),
                    },
                ),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.options.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }
}

/// Run the pipeline against `source` with [`PipelineOptions::default`].
///
/// # Errors
///
/// Returns the error of the first stage that fails, unchanged.
pub fn run(source: impl AsRef<Path>) -> PipelineResult<RunSummary> {
    Pipeline::default().run(source)
}

/// Severity used for observer callbacks: infrastructure failures are `Critical`, data
/// failures are `Error`.
pub fn severity_for_error(e: &PipelineError) -> PipelineSeverity {
    match e {
        PipelineError::LoadingData { source: Some(err) } => match err.kind() {
            ::csv::ErrorKind::Io(_) => PipelineSeverity::Critical,
            _ => PipelineSeverity::Error,
        },
        PipelineError::LoadingData { source: None } => PipelineSeverity::Error,
        PipelineError::ColumnValidation { .. } | PipelineError::CleaningData { .. } => {
            PipelineSeverity::Error
        }
        PipelineError::StoreLocation { .. } => PipelineSeverity::Critical,
        PipelineError::Persisting(err) => match err.sqlite_error_code() {
            Some(
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::SystemIoFailure
                | rusqlite::ErrorCode::DiskFull
                | rusqlite::ErrorCode::ReadOnly
                | rusqlite::ErrorCode::PermissionDenied
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::NotADatabase,
            ) => PipelineSeverity::Critical,
            _ => PipelineSeverity::Error,
        },
    }
}
