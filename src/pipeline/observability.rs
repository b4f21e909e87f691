use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::error::PipelineError;

use super::PipelineStage;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the run failed on bad data).
    Error,
    /// Critical error (I/O or store failures).
    Critical,
}

/// Context about one stage of a run.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Source location the run was started with.
    pub source: PathBuf,
    /// Stage being executed.
    pub stage: PipelineStage,
}

/// Stats reported when a stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Rows in the dataset after the stage.
    pub rows: usize,
    /// Wall time spent in the stage.
    pub elapsed: Duration,
}

/// Observer interface for pipeline runs.
///
/// Implementors can record metrics, logs, or trigger alerts. Observers see errors by reference
/// and cannot change what [`crate::pipeline::Pipeline::run`] returns.
pub trait PipelineObserver: Send + Sync {
    /// Called before a stage starts.
    fn on_stage_started(&self, _ctx: &StageContext) {}

    /// Called when a stage succeeds.
    fn on_stage_finished(&self, _ctx: &StageContext, _stats: StageStats) {}

    /// Called when a stage fails; the run stops after this.
    fn on_failure(&self, _ctx: &StageContext, _severity: PipelineSeverity, _error: &PipelineError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_stage_started(&self, ctx: &StageContext) {
        for o in &self.observers {
            o.on_stage_started(ctx);
        }
    }

    fn on_stage_finished(&self, ctx: &StageContext, stats: StageStats) {
        for o in &self.observers {
            o.on_stage_finished(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage_finished(&self, ctx: &StageContext, stats: StageStats) {
        info!(
            stage = %ctx.stage,
            source = %ctx.source.display(),
            rows = stats.rows,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "stage finished"
        );
    }

    fn on_failure(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        warn!(
            stage = %ctx.stage,
            source = %ctx.source.display(),
            ?severity,
            %error,
            "stage failed"
        );
    }

    fn on_alert(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        error!(
            stage = %ctx.stage,
            source = %ctx.source.display(),
            ?severity,
            %error,
            "ALERT: pipeline run failed"
        );
    }
}

/// Appends pipeline events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_stage_finished(&self, ctx: &StageContext, stats: StageStats) {
        self.append_line(&format!(
            "{} ok stage={} source={} rows={} elapsed_ms={}",
            unix_ts(),
            ctx.stage,
            ctx.source.display(),
            stats.rows,
            stats.elapsed.as_millis()
        ));
    }

    fn on_failure(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={} source={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.source.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &StageContext, severity: PipelineSeverity, error: &PipelineError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={} source={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.source.display(),
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
