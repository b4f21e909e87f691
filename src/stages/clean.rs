//! Clean stage: normalize `email`, type `signup_date` and `id`, drop unusable rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Value};

use super::{EMAIL, ID, SIGNUP_DATE};

/// Dataset produced by [`clean`] plus the row-count delta of the availability filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanOutcome {
    /// Cleaned dataset.
    pub dataset: DataSet,
    /// Rows removed because `id` or `email` was missing.
    pub rows_dropped: usize,
}

/// Clean a validated dataset.
///
/// Applied to every row, before any row is dropped:
///
/// 1. `email` is lowercased (no other change to the text).
/// 2. `signup_date` is parsed into a [`Value::Timestamp`] (see [`parse_timestamp`]).
///
/// `id` becomes an [`DataType::Int64`] column only when every non-null id is an integer
/// (`42` or `42.0`); otherwise it stays text. Rows whose `id` or `email` is null are then
/// removed. That is a data-reduction policy, not an error.
///
/// # Errors
///
/// - [`PipelineError::CleaningData`] with [`crate::CleaningFailure::Unspecified`] if `id`,
///   `email` or `signup_date` is not a column of the dataset.
/// - The same variant with [`crate::CleaningFailure::WrongDataType`] if an `email` or
///   `signup_date` value cannot be coerced; the error names the column and row.
pub fn clean(mut dataset: DataSet) -> PipelineResult<CleanOutcome> {
    let email_idx = required_index(&dataset, EMAIL)?;
    let date_idx = required_index(&dataset, SIGNUP_DATE)?;
    let id_idx = required_index(&dataset, ID)?;

    for (row_idx0, row) in dataset.rows.iter_mut().enumerate() {
        let row_num = row_idx0 + 1;
        if let Some(cell) = row.get_mut(email_idx) {
            *cell = lowercase_email(row_num, cell)?;
        }
        if let Some(cell) = row.get_mut(date_idx) {
            *cell = coerce_timestamp(row_num, cell)?;
        }
    }
    if let Some(field) = dataset.schema.fields.get_mut(date_idx) {
        field.data_type = DataType::Timestamp;
    }
    type_ids(&mut dataset, id_idx);

    let rows_before = dataset.row_count();
    let dataset = dataset.retain_rows(|row| {
        let present = |idx: usize| row.get(idx).is_some_and(|v| !v.is_null());
        present(id_idx) && present(email_idx)
    });
    let rows_dropped = rows_before - dataset.row_count();

    if rows_dropped > 0 {
        debug!(rows_dropped, "dropped rows missing id or email");
    }
    info!(rows = dataset.row_count(), dropped = rows_dropped, "Cleaning done.");

    Ok(CleanOutcome {
        dataset,
        rows_dropped,
    })
}

fn required_index(dataset: &DataSet, column: &str) -> PipelineResult<usize> {
    dataset
        .schema
        .index_of(column)
        .ok_or_else(|| PipelineError::cleaning(column))
}

fn lowercase_email(row: usize, value: &Value) -> PipelineResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Utf8(s) => Ok(Value::Utf8(s.to_lowercase())),
        other => Err(PipelineError::wrong_data_type(
            EMAIL,
            row,
            other.to_raw_string(),
            DataType::Utf8,
        )),
    }
}

fn coerce_timestamp(row: usize, value: &Value) -> PipelineResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
        Value::Utf8(s) => parse_timestamp(s).map(Value::Timestamp).ok_or_else(|| {
            PipelineError::wrong_data_type(SIGNUP_DATE, row, s.as_str(), DataType::Timestamp)
        }),
        other => Err(PipelineError::wrong_data_type(
            SIGNUP_DATE,
            row,
            other.to_raw_string(),
            DataType::Timestamp,
        )),
    }
}

/// Retype `id` as `Int64` if every non-null value is integral; leave it untouched otherwise.
fn type_ids(dataset: &mut DataSet, id_idx: usize) {
    let ids: Option<Vec<Value>> = dataset
        .rows
        .iter()
        .map(|row| match row.get(id_idx) {
            None | Some(Value::Null) => Some(Value::Null),
            Some(v) => integer_id(v).map(Value::Int64),
        })
        .collect();

    match ids {
        Some(ids) => {
            for (row, id) in dataset.rows.iter_mut().zip(ids) {
                if let Some(cell) = row.get_mut(id_idx) {
                    *cell = id;
                }
            }
            if let Some(field) = dataset.schema.fields.get_mut(id_idx) {
                field.data_type = DataType::Int64;
            }
        }
        None => debug!("id column kept as text"),
    }
}

fn integer_id(value: &Value) -> Option<i64> {
    match value {
        Value::Int64(v) => Some(*v),
        Value::Float64(f) => integral(*f),
        // Spreadsheet exports often write integer ids as "42.0".
        Value::Utf8(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        Value::Null | Value::Bool(_) | Value::Timestamp(_) => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Parse a signup date.
///
/// Accepted forms: `2023-01-10`, `2023/01/10`, `2023-01-10 08:30:00` (optional fraction),
/// `2023-01-10T08:30:00` (optional fraction), `2023-01-10 08:30`, and RFC 3339 with an offset
/// (converted to UTC). Dates without a time resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{clean, parse_timestamp};
    use crate::error::{CleaningFailure, PipelineError};
    use crate::types::{DataSet, DataType, Schema, Value};

    fn text(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn raw_customers(rows: Vec<[Value; 4]>) -> DataSet {
        DataSet::new(
            Schema::all_utf8(["id", "name", "email", "signup_date"]),
            rows.into_iter().map(Vec::from).collect(),
        )
    }

    fn midnight(y: i32, m: u32, d: u32) -> Value {
        Value::Timestamp(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn cleans_the_two_row_scenario() {
        let ds = raw_customers(vec![
            [text("1"), text("A"), text("A@X.com"), text("2023-01-10")],
            [text("2"), text("B"), Value::Null, text("2023-02-01")],
        ]);

        let out = clean(ds).unwrap();

        assert_eq!(out.rows_dropped, 1);
        assert_eq!(out.dataset.row_count(), 1);
        assert_eq!(
            out.dataset.rows[0],
            vec![Value::Int64(1), text("A"), text("a@x.com"), midnight(2023, 1, 10)]
        );
        let types: Vec<DataType> = out.dataset.schema.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Int64, DataType::Utf8, DataType::Utf8, DataType::Timestamp]
        );
    }

    #[test]
    fn rows_missing_id_are_dropped_and_null_dates_survive() {
        let ds = raw_customers(vec![
            [Value::Null, text("A"), text("a@x.com"), text("2023-01-10")],
            [text("7"), text("B"), text("B@Y.ORG"), Value::Null],
        ]);

        let out = clean(ds).unwrap();

        assert_eq!(out.rows_dropped, 1);
        assert_eq!(out.dataset.rows[0][0], Value::Int64(7));
        assert_eq!(out.dataset.rows[0][2], text("b@y.org"));
        assert_eq!(out.dataset.rows[0][3], Value::Null);
    }

    #[test]
    fn unparseable_signup_date_is_a_wrong_data_type_error() {
        let ds = raw_customers(vec![
            [text("1"), text("A"), text("a@x.com"), text("2023-01-10")],
            [text("2"), text("B"), text("b@x.com"), text("last tuesday")],
        ]);

        let err = clean(ds).unwrap_err();

        assert!(err.is_wrong_data_type());
        assert!(err.is_cleaning_error());
        assert_eq!(err.column(), Some("signup_date"));
        match err {
            PipelineError::CleaningData {
                failure: CleaningFailure::WrongDataType { row, raw, expected },
                ..
            } => {
                assert_eq!(row, 2);
                assert_eq!(raw, "last tuesday");
                assert_eq!(expected, DataType::Timestamp);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_date_fails_even_when_row_would_be_dropped() {
        let ds = raw_customers(vec![[text("1"), text("A"), Value::Null, text("2023-13-45")]]);
        let err = clean(ds).unwrap_err();
        assert_eq!(err.column(), Some("signup_date"));
    }

    #[test]
    fn text_ids_stay_text() {
        let ds = raw_customers(vec![
            [text("C-001"), text("A"), text("a@x.com"), text("2023-01-10")],
            [text("2"), text("B"), text("b@x.com"), text("2023-01-11")],
        ]);
        let out = clean(ds).unwrap();
        assert_eq!(out.dataset.schema.fields[0].data_type, DataType::Utf8);
        assert_eq!(out.dataset.rows[0][0], text("C-001"));
        assert_eq!(out.dataset.rows[1][0], text("2"));
    }

    #[test]
    fn email_is_only_lowercased() {
        let ds = raw_customers(vec![[text("1"), text("A"), text(" A@X.com "), text("2023-01-10")]]);
        let out = clean(ds).unwrap();
        assert_eq!(out.dataset.rows[0][2], text(" a@x.com "));
    }

    #[test]
    fn integral_float_ids_are_accepted() {
        let ds = raw_customers(vec![[text("42.0"), text("A"), text("a@x.com"), text("2023-01-10")]]);
        let out = clean(ds).unwrap();
        assert_eq!(out.dataset.rows[0][0], Value::Int64(42));
    }

    #[test]
    fn missing_column_is_a_generic_cleaning_error() {
        let ds = DataSet::new(
            Schema::all_utf8(["id", "name", "signup_date"]),
            vec![vec![text("1"), text("A"), text("2023-01-10")]],
        );
        let err = clean(ds).unwrap_err();
        assert!(err.is_cleaning_error());
        assert!(!err.is_wrong_data_type());
        assert_eq!(err.column(), Some("email"));
    }

    #[test]
    fn extra_columns_pass_through() {
        let ds = DataSet::new(
            Schema::all_utf8(["id", "name", "email", "signup_date", "plan"]),
            vec![vec![text("1"), text("A"), text("A@X.com"), text("2023-01-10"), text("Pro")]],
        );
        let out = clean(ds).unwrap();
        assert_eq!(out.dataset.rows[0][4], text("Pro"));
        assert_eq!(out.dataset.schema.fields[4].data_type, DataType::Utf8);
    }

    #[test]
    fn parse_timestamp_accepts_common_forms() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 10)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2023-01-10 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-10T08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-10 08:30"), Some(expected));
        assert_eq!(parse_timestamp("2023-01-10T10:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2023/01/10"),
            NaiveDate::from_ymd_opt(2023, 1, 10).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("10 Jan 2023"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
