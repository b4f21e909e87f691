//! Validate stage: check the required-column invariant.

use tracing::{debug, warn};

use crate::config::ValidationMode;
use crate::error::{PipelineError, PipelineResult};
use crate::types::DataSet;

use super::REQUIRED_COLUMNS;

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Required columns absent from the dataset, in required-column order.
    pub missing: Vec<String>,
}

impl ValidationReport {
    /// `true` when every required column is present.
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check that `id`, `name`, `email` and `signup_date` are all present.
///
/// The dataset is only borrowed, so validation can never change its rows or schema.
///
/// - [`ValidationMode::Strict`]: missing columns raise [`PipelineError::ColumnValidation`].
/// - [`ValidationMode::Lenient`]: missing columns are logged and reported, and the run goes on.
pub fn validate(dataset: &DataSet, mode: ValidationMode) -> PipelineResult<ValidationReport> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !dataset.schema.contains(col))
        .map(|col| (*col).to_string())
        .collect();

    let report = ValidationReport { missing };
    if report.passed() {
        debug!("required columns present");
        return Ok(report);
    }

    match mode {
        ValidationMode::Strict => Err(PipelineError::column_validation(report.missing)),
        ValidationMode::Lenient => {
            warn!(missing = ?report.missing, "Missing some columns...");
            Ok(report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validate;
    use crate::config::ValidationMode;
    use crate::error::PipelineError;
    use crate::types::{DataSet, Schema, Value};

    fn dataset(columns: &[&str]) -> DataSet {
        let row = columns.iter().map(|c| Value::Utf8((*c).to_string())).collect();
        DataSet::new(Schema::all_utf8(columns.iter().copied()), vec![row])
    }

    #[test]
    fn passes_with_required_columns_in_any_order() {
        let ds = dataset(&["signup_date", "extra", "email", "name", "id"]);
        let report = validate(&ds, ValidationMode::Strict).unwrap();
        assert!(report.passed());
    }

    #[test]
    fn strict_mode_raises_with_missing_columns() {
        let ds = dataset(&["id", "name"]);
        let err = validate(&ds, ValidationMode::Strict).unwrap_err();
        match err {
            PipelineError::ColumnValidation { missing } => {
                assert_eq!(missing, vec!["email".to_string(), "signup_date".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lenient_mode_reports_and_continues() {
        let ds = dataset(&["id", "name", "email"]);
        let report = validate(&ds, ValidationMode::Lenient).unwrap();
        assert!(!report.passed());
        assert_eq!(report.missing, vec!["signup_date".to_string()]);
    }

    #[test]
    fn validation_leaves_dataset_untouched() {
        let ds = dataset(&["id", "email"]);
        let before = ds.clone();
        let _ = validate(&ds, ValidationMode::Lenient).unwrap();
        let _ = validate(&ds, ValidationMode::Strict).unwrap_err();
        assert_eq!(ds, before);
    }
}
