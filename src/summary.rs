//! Descriptive statistics for a loaded or cleaned [`DataSet`].
//!
//! - [`reduce()`]: single-column reductions (count/sum/min/max/mean)
//! - [`value_counts()`]: frequency table of one column
//! - [`describe()`]: one [`ColumnSummary`] per column (excluding `id`)
//!
//! ```rust
//! use customer_cleaning::summary::{reduce, ReduceOp};
//! use customer_cleaning::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let ds = DataSet::new(
//!     Schema::new(vec![Field::new("days_since_signup", DataType::Int64)]),
//!     vec![vec![Value::Int64(10)], vec![Value::Null], vec![Value::Int64(30)]],
//! );
//! assert_eq!(reduce(&ds, "days_since_signup", ReduceOp::Sum), Some(Value::Int64(40)));
//! assert_eq!(reduce(&ds, "days_since_signup", ReduceOp::Mean), Some(Value::Float64(20.0)));
//! ```

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::stages::ID;
use crate::types::{DataSet, DataType, Value};

/// Built-in reduction operations over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Count all rows (including nulls).
    Count,
    /// Sum numeric values, ignoring nulls.
    Sum,
    /// Minimum numeric or timestamp value, ignoring nulls.
    Min,
    /// Maximum numeric or timestamp value, ignoring nulls.
    Max,
    /// Arithmetic mean of numeric values as `Float64`, ignoring nulls.
    Mean,
}

/// Reduce a column using a built-in [`ReduceOp`].
///
/// - Returns `None` if `column` does not exist in the schema.
/// - For `Sum`/`Min`/`Max`/`Mean`, returns `Some(Value::Null)` if there are no non-null values
///   or the column type does not support the operation.
/// - For `Count`, always returns `Some(Value::Int64(row_count))`.
pub fn reduce(dataset: &DataSet, column: &str, op: ReduceOp) -> Option<Value> {
    let idx = dataset.schema.index_of(column)?;
    let data_type = dataset.schema.fields.get(idx)?.data_type;
    let values = || dataset.rows.iter().filter_map(move |row| row.get(idx));

    let out = match (op, data_type) {
        (ReduceOp::Count, _) => Value::Int64(dataset.row_count() as i64),
        (ReduceOp::Mean, DataType::Int64 | DataType::Float64) => {
            let nums: Vec<f64> = values().filter_map(as_f64).collect();
            mean(&nums).map(Value::Float64).unwrap_or(Value::Null)
        }
        (ReduceOp::Sum, DataType::Int64) => fold_i64(values(), |a, b| a.saturating_add(b)),
        (ReduceOp::Min, DataType::Int64) => fold_i64(values(), i64::min),
        (ReduceOp::Max, DataType::Int64) => fold_i64(values(), i64::max),
        (ReduceOp::Sum, DataType::Float64) => fold_f64(values(), |a, b| a + b),
        (ReduceOp::Min, DataType::Float64) => fold_f64(values(), f64::min),
        (ReduceOp::Max, DataType::Float64) => fold_f64(values(), f64::max),
        (ReduceOp::Min | ReduceOp::Max, DataType::Timestamp) => {
            let ts = values().filter_map(|v| match v {
                Value::Timestamp(t) => Some(*t),
                _ => None,
            });
            let picked = if op == ReduceOp::Min { ts.min() } else { ts.max() };
            picked.map(Value::Timestamp).unwrap_or(Value::Null)
        }
        _ => Value::Null,
    };
    Some(out)
}

fn fold_i64<'a>(values: impl Iterator<Item = &'a Value>, f: impl Fn(i64, i64) -> i64) -> Value {
    values
        .filter_map(|v| match v {
            Value::Int64(x) => Some(*x),
            _ => None,
        })
        .reduce(f)
        .map(Value::Int64)
        .unwrap_or(Value::Null)
}

fn fold_f64<'a>(values: impl Iterator<Item = &'a Value>, f: impl Fn(f64, f64) -> f64) -> Value {
    values
        .filter_map(|v| match v {
            Value::Float64(x) => Some(*x),
            _ => None,
        })
        .reduce(f)
        .map(Value::Float64)
        .unwrap_or(Value::Null)
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int64(x) => Some(*x as f64),
        Value::Float64(x) => Some(*x),
        _ => None,
    }
}

fn mean(nums: &[f64]) -> Option<f64> {
    if nums.is_empty() {
        None
    } else {
        Some(nums.iter().sum::<f64>() / nums.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator); needs at least two values.
fn std_dev(nums: &[f64]) -> Option<f64> {
    if nums.len() < 2 {
        return None;
    }
    let m = mean(nums)?;
    let var = nums.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (nums.len() - 1) as f64;
    Some(var.sqrt())
}

/// Hashable identity of a [`Value`]; floats compare by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ValueKey<'a> {
    Null,
    Int64(i64),
    Float64(u64),
    Bool(bool),
    Utf8(&'a str),
    Timestamp(NaiveDateTime),
}

impl<'a> From<&'a Value> for ValueKey<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Int64(x) => Self::Int64(*x),
            Value::Float64(x) => Self::Float64(x.to_bits()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Utf8(s) => Self::Utf8(s.as_str()),
            Value::Timestamp(t) => Self::Timestamp(*t),
        }
    }
}

/// Frequency of each non-null value in `column`, most frequent first.
///
/// Ties keep first-appearance order. Returns `None` if the column does not exist.
pub fn value_counts(dataset: &DataSet, column: &str) -> Option<Vec<(Value, usize)>> {
    let mut slots: HashMap<ValueKey<'_>, usize> = HashMap::new();
    let mut counts: Vec<(Value, usize)> = Vec::new();

    for v in dataset.column_values(column)?.filter(|v| !v.is_null()) {
        let key = ValueKey::from(v);
        match slots.get(&key) {
            Some(&slot) => {
                if let Some(entry) = counts.get_mut(slot) {
                    entry.1 += 1;
                }
            }
            None => {
                slots.insert(key, counts.len());
                counts.push((v.clone(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Some(counts)
}

/// Descriptive statistics for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    /// Column name.
    pub column: String,
    /// Column data type.
    pub data_type: DataType,
    /// Null count.
    pub missing: usize,
    /// Duplicate rows in the dataset (ignoring `id`); the same for every column.
    pub duplicates: usize,
    /// Distinct non-null values.
    pub unique: usize,
    /// Smallest value (numeric and timestamp columns).
    pub min: Option<Value>,
    /// Largest value (numeric and timestamp columns).
    pub max: Option<Value>,
    /// Mean (numeric columns).
    pub mean: Option<f64>,
    /// Sample standard deviation (numeric columns).
    pub std_dev: Option<f64>,
    /// Most frequent value (text columns).
    pub top: Option<Value>,
    /// Frequency of [`Self::top`].
    pub freq: Option<usize>,
}

/// Summarize every column except `id`.
pub fn describe(dataset: &DataSet) -> Vec<ColumnSummary> {
    let kept: Vec<usize> = dataset
        .schema
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.name != ID)
        .map(|(i, _)| i)
        .collect();
    let duplicates = duplicate_rows(dataset, &kept);

    kept.iter()
        .filter_map(|&idx| dataset.schema.fields.get(idx))
        .map(|field| {
            let name = field.name.as_str();
            let values: Vec<&Value> = dataset
                .column_values(name)
                .map(|it| it.collect())
                .unwrap_or_default();
            let missing = values.iter().filter(|v| v.is_null()).count();
            let unique = values
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| ValueKey::from(*v))
                .collect::<HashSet<_>>()
                .len();

            let mut summary = ColumnSummary {
                column: field.name.clone(),
                data_type: field.data_type,
                missing,
                duplicates,
                unique,
                min: None,
                max: None,
                mean: None,
                std_dev: None,
                top: None,
                freq: None,
            };

            match field.data_type {
                DataType::Int64 | DataType::Float64 | DataType::Timestamp => {
                    summary.min = reduce(dataset, name, ReduceOp::Min).filter(|v| !v.is_null());
                    summary.max = reduce(dataset, name, ReduceOp::Max).filter(|v| !v.is_null());
                    if field.data_type != DataType::Timestamp {
                        let nums: Vec<f64> = values.iter().filter_map(|v| as_f64(v)).collect();
                        summary.mean = mean(&nums);
                        summary.std_dev = std_dev(&nums);
                    }
                }
                DataType::Utf8 | DataType::Bool => {
                    if let Some((top, freq)) = value_counts(dataset, name).and_then(|c| c.into_iter().next()) {
                        summary.top = Some(top);
                        summary.freq = Some(freq);
                    }
                }
            }
            summary
        })
        .collect()
}

fn duplicate_rows(dataset: &DataSet, columns: &[usize]) -> usize {
    let mut seen: HashSet<Vec<ValueKey<'_>>> = HashSet::new();
    dataset
        .rows
        .iter()
        .filter(|row| {
            let projected = columns
                .iter()
                .map(|&i| row.get(i).map_or(ValueKey::Null, ValueKey::from))
                .collect();
            !seen.insert(projected)
        })
        .count()
}

/// One-line description: `The <name> dataset has <rows> rows and <cols> columns`.
pub fn shape_line(dataset: &DataSet) -> String {
    format!(
        "The {} dataset has {} rows and {} columns",
        dataset.name().unwrap_or("unnamed"),
        dataset.row_count(),
        dataset.column_count()
    )
}
