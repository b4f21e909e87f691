//! Pipeline configuration.
//!
//! Everything is a plain struct with a [`Default`] so callers only override what they need:
//!
//! ```rust
//! use customer_cleaning::config::{PipelineOptions, ValidationMode};
//!
//! let opts = PipelineOptions {
//!     validation: ValidationMode::Lenient,
//!     ..Default::default()
//! };
//! assert_eq!(opts.store.table, "customers");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::pipeline::observability::{PipelineObserver, PipelineSeverity};

/// Relation replaced by every successful run.
pub const DEFAULT_TABLE: &str = "customers";

/// File name of the SQLite database under [`DataPaths::root`].
pub const DEFAULT_DATABASE_FILE: &str = "cleaned_customers.db";

/// Conventional data directory layout (`raw/`, `interim/`, `processed/`, `external/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Root directory; every other path is derived from it.
    pub root: PathBuf,
}

impl DataPaths {
    /// Layout rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Untouched source extracts.
    pub fn raw(&self) -> PathBuf {
        self.root.join("raw")
    }

    /// Intermediate snapshots (see [`crate::cache::InterimCache`]).
    pub fn interim(&self) -> PathBuf {
        self.root.join("interim")
    }

    /// Final outputs.
    pub fn processed(&self) -> PathBuf {
        self.root.join("processed")
    }

    /// Third-party data.
    pub fn external(&self) -> PathBuf {
        self.root.join("external")
    }

    /// Default location of the cleaned-customer database.
    pub fn database(&self) -> PathBuf {
        self.root.join(DEFAULT_DATABASE_FILE)
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new("data")
    }
}

/// What the validate stage does when required columns are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Raise [`crate::PipelineError::ColumnValidation`] and abort the run.
    #[default]
    Strict,
    /// Log a warning and let the run continue.
    Lenient,
}

/// How the transform stage treats signup dates later than "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FutureSignupPolicy {
    /// Report 0 days.
    #[default]
    ClampToZero,
    /// Report a negative day count.
    AllowNegative,
}

/// Options for the load stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Field delimiter. If `None`, inferred from the file extension.
    pub delimiter: Option<u8>,
}

/// Options for the persist stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// SQLite database file. Parent directories are created on demand.
    pub database_path: PathBuf,
    /// Relation replaced on every run.
    pub table: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            database_path: DataPaths::default().database(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Options controlling a [`crate::pipeline::Pipeline`] run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Load stage options.
    pub load: LoadOptions,
    /// Behaviour when required columns are missing.
    pub validation: ValidationMode,
    /// Behaviour for signup dates in the future.
    pub future_signups: FutureSignupPolicy,
    /// Destination store.
    pub store: StoreOptions,
    /// Optional observer for stage events and alerts.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: PipelineSeverity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("load", &self.load)
            .field("validation", &self.validation)
            .field("future_signups", &self.future_signups)
            .field("store", &self.store)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            load: LoadOptions::default(),
            validation: ValidationMode::default(),
            future_signups: FutureSignupPolicy::default(),
            store: StoreOptions::default(),
            observer: None,
            alert_at_or_above: PipelineSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{DataPaths, PipelineOptions, ValidationMode};

    #[test]
    fn data_paths_follow_layout() {
        let paths = DataPaths::new("/srv/data");
        assert_eq!(paths.raw(), PathBuf::from("/srv/data/raw"));
        assert_eq!(paths.interim(), PathBuf::from("/srv/data/interim"));
        assert_eq!(paths.processed(), PathBuf::from("/srv/data/processed"));
        assert_eq!(paths.external(), PathBuf::from("/srv/data/external"));
        assert_eq!(paths.database(), PathBuf::from("/srv/data/cleaned_customers.db"));
    }

    #[test]
    fn defaults_are_strict_and_target_customers() {
        let opts = PipelineOptions::default();
        assert_eq!(opts.validation, ValidationMode::Strict);
        assert_eq!(opts.store.table, "customers");
        assert_eq!(opts.store.database_path, PathBuf::from("data/cleaned_customers.db"));
        assert!(format!("{opts:?}").contains("observer_set: false"));
    }
}
