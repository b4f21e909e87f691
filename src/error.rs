use std::path::PathBuf;

use thiserror::Error;

use crate::types::DataType;

/// Convenience result type for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Why a column could not be cleaned.
///
/// [`CleaningFailure::WrongDataType`] refines the generic failure: callers that only care that
/// cleaning failed match on [`PipelineError::CleaningData`], callers that care about type
/// mismatches also inspect this value (or use [`PipelineError::is_wrong_data_type`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleaningFailure {
    /// The column could not be cleaned (for example it is absent from the dataset).
    Unspecified,
    /// A value could not be coerced into the column's target type.
    WrongDataType {
        /// 1-based data row number (the header is not counted).
        row: usize,
        /// Raw value as it appeared in the dataset.
        raw: String,
        /// Type the value was being coerced into.
        expected: DataType,
    },
}

/// Error type returned by every pipeline stage and by [`crate::pipeline::Pipeline::run`].
///
/// The orchestrator never wraps these: the variant a caller sees is the one raised by the
/// stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source could not be read into a [`crate::types::DataSet`].
    #[error("Something went wrong while loading the file.")]
    LoadingData {
        #[source]
        source: Option<csv::Error>,
    },

    /// The required column set is not a subset of the dataset's columns.
    #[error("Could not validate schema: missing required column(s) {}.", .missing.join(", "))]
    ColumnValidation { missing: Vec<String> },

    /// Cleaning failed for `column`; see [`CleaningFailure`] for the refinement.
    #[error("Something went wrong during cleaning the column '{column}'.")]
    CleaningData {
        column: String,
        failure: CleaningFailure,
    },

    /// The directory holding the durable store could not be created.
    #[error("Something went wrong while preparing the database location {}: {source}", .path.display())]
    StoreLocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the relation to the durable store failed.
    #[error("Something went wrong while writing to the database: {0}")]
    Persisting(#[from] rusqlite::Error),
}

impl PipelineError {
    /// Loading failure without an underlying cause.
    pub fn loading() -> Self {
        Self::LoadingData { source: None }
    }

    /// Validation failure for the given missing columns.
    pub fn column_validation<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ColumnValidation {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Generic cleaning failure for `column`.
    pub fn cleaning(column: impl Into<String>) -> Self {
        Self::CleaningData {
            column: column.into(),
            failure: CleaningFailure::Unspecified,
        }
    }

    /// Type-coercion failure for `column`.
    pub fn wrong_data_type(
        column: impl Into<String>,
        row: usize,
        raw: impl Into<String>,
        expected: DataType,
    ) -> Self {
        Self::CleaningData {
            column: column.into(),
            failure: CleaningFailure::WrongDataType {
                row,
                raw: raw.into(),
                expected,
            },
        }
    }

    /// `true` for every cleaning failure, including type mismatches.
    pub fn is_cleaning_error(&self) -> bool {
        matches!(self, Self::CleaningData { .. })
    }

    /// `true` only for type-mismatch cleaning failures.
    pub fn is_wrong_data_type(&self) -> bool {
        matches!(
            self,
            Self::CleaningData {
                failure: CleaningFailure::WrongDataType { .. },
                ..
            }
        )
    }

    /// Offending column for cleaning failures.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::CleaningData { column, .. } => Some(column.as_str()),
            _ => None,
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        Self::LoadingData { source: Some(err) }
    }
}

/// Error type returned by [`crate::cache::InterimCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying I/O error (e.g. slot file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The slot file is not a serialized dataset.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Slot names must be plain, non-empty file stems.
    #[error("invalid cache slot name '{0}'")]
    InvalidSlot(String),
}
