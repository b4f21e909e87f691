//! Transform stage: derive `days_since_signup`.

use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::config::FutureSignupPolicy;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Field, Value};

use super::{DAYS_SINCE_SIGNUP, SIGNUP_DATE};

/// Derive `days_since_signup` using the local wall clock, read once for the whole dataset.
pub fn transform(dataset: DataSet, policy: FutureSignupPolicy) -> PipelineResult<DataSet> {
    transform_at(dataset, Local::now().naive_local(), policy)
}

/// Derive `days_since_signup` relative to `now`.
///
/// The value is the number of calendar days from the signup date to `now`'s date. Null signup
/// dates yield null. Signups after `now` follow `policy`. An existing `days_since_signup`
/// column is overwritten; no rows are added or removed.
///
/// # Errors
///
/// - [`PipelineError::CleaningData`] (generic) if `signup_date` is not a column.
/// - The type-mismatch refinement if a `signup_date` value is not a timestamp, i.e. the dataset
///   was not cleaned first.
pub fn transform_at(
    mut dataset: DataSet,
    now: NaiveDateTime,
    policy: FutureSignupPolicy,
) -> PipelineResult<DataSet> {
    let today = now.date();
    let date_idx = dataset
        .schema
        .index_of(SIGNUP_DATE)
        .ok_or_else(|| PipelineError::cleaning(SIGNUP_DATE))?;

    let mut days = Vec::with_capacity(dataset.row_count());
    for (row_idx0, row) in dataset.rows.iter().enumerate() {
        let value = match row.get(date_idx) {
            Some(Value::Timestamp(signed_up)) => {
                let elapsed = today.signed_duration_since(signed_up.date()).num_days();
                Value::Int64(match policy {
                    FutureSignupPolicy::ClampToZero => elapsed.max(0),
                    FutureSignupPolicy::AllowNegative => elapsed,
                })
            }
            Some(Value::Null) | None => Value::Null,
            Some(other) => {
                return Err(PipelineError::wrong_data_type(
                    SIGNUP_DATE,
                    row_idx0 + 1,
                    other.to_raw_string(),
                    DataType::Timestamp,
                ));
            }
        };
        days.push(value);
    }

    dataset.put_column(Field::new(DAYS_SINCE_SIGNUP, DataType::Int64), days);
    info!(rows = dataset.row_count(), now = %now, "Derived days_since_signup.");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::transform_at;
    use crate::config::FutureSignupPolicy;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn cleaned(dates: Vec<Value>) -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("signup_date", DataType::Timestamp),
        ]);
        let rows = dates
            .into_iter()
            .enumerate()
            .map(|(i, d)| vec![Value::Int64(i as i64 + 1), d])
            .collect();
        DataSet::new(schema, rows)
    }

    #[test]
    fn counts_whole_calendar_days() {
        let ds = cleaned(vec![
            Value::Timestamp(at(2023, 1, 10, 23)),
            Value::Timestamp(at(2024, 1, 10, 0)),
            Value::Null,
        ]);
        let out = transform_at(ds, at(2024, 1, 10, 9), FutureSignupPolicy::ClampToZero).unwrap();

        assert_eq!(out.column_count(), 3);
        assert_eq!(out.schema.fields[2], Field::new("days_since_signup", DataType::Int64));
        let days: Vec<Value> = out.column_values("days_since_signup").unwrap().cloned().collect();
        assert_eq!(days, vec![Value::Int64(365), Value::Int64(0), Value::Null]);
    }

    #[test]
    fn future_signups_follow_policy() {
        let now = at(2024, 1, 10, 12);
        let ds = cleaned(vec![Value::Timestamp(at(2024, 1, 15, 0))]);

        let clamped = transform_at(ds.clone(), now, FutureSignupPolicy::ClampToZero).unwrap();
        assert_eq!(clamped.rows[0][2], Value::Int64(0));

        let negative = transform_at(ds, now, FutureSignupPolicy::AllowNegative).unwrap();
        assert_eq!(negative.rows[0][2], Value::Int64(-5));
    }

    #[test]
    fn same_now_gives_same_values() {
        let now = at(2025, 6, 1, 8);
        let ds = cleaned(vec![Value::Timestamp(at(2023, 2, 1, 0))]);
        let once = transform_at(ds, now, FutureSignupPolicy::ClampToZero).unwrap();
        let twice = transform_at(once.clone(), now, FutureSignupPolicy::ClampToZero).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.column_count(), 3);
    }

    #[test]
    fn uncleaned_dates_are_rejected() {
        let schema = Schema::all_utf8(["id", "signup_date"]);
        let ds = DataSet::new(
            schema,
            vec![vec![Value::Utf8("1".into()), Value::Utf8("2023-01-10".into())]],
        );
        let err = transform_at(ds, at(2024, 1, 1, 0), FutureSignupPolicy::ClampToZero).unwrap_err();
        assert!(err.is_wrong_data_type());
        assert_eq!(err.column(), Some("signup_date"));
    }

    #[test]
    fn missing_signup_date_column_is_a_cleaning_error() {
        let ds = DataSet::new(Schema::all_utf8(["id"]), vec![]);
        let err = transform_at(ds, at(2024, 1, 1, 0), FutureSignupPolicy::ClampToZero).unwrap_err();
        assert!(err.is_cleaning_error());
        assert!(!err.is_wrong_data_type());
    }
}
