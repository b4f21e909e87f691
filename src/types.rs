//! Core data model types shared by every pipeline stage.
//!
//! A [`DataSet`] is the value threaded through the pipeline. Its [`Schema`] evolves as stages run:
//! loading produces all-[`DataType::Utf8`] columns, cleaning coerces `id` and `signup_date`, and
//! the transform stage appends a derived column.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Date and time without a time zone.
    Timestamp,
}

impl DataType {
    /// Name used in diagnostics and summary tables.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Utf8 => "utf8",
            Self::Timestamp => "timestamp",
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Schema where every column is [`DataType::Utf8`].
    pub fn all_utf8<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| Field::new(n, DataType::Utf8)).collect())
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns `true` if a field with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Date and time without a time zone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload of a [`Value::Utf8`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the value the way it appears in a delimited file (nulls render empty).
    pub fn to_raw_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int64(v) => v.to_string(),
            Self::Float64(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Utf8(s) => s.clone(),
            Self::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

static NULL: Value = Value::Null;

/// Text form used when a [`Value::Timestamp`] leaves the process (store, diagnostics).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
    /// Where the rows were loaded from, if they came from a file.
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema,
            rows,
            source: None,
        }
    }

    /// Record the location the dataset was loaded from.
    pub fn with_source(mut self, source: impl AsRef<Path>) -> Self {
        self.source = Some(source.as_ref().to_path_buf());
        self
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Short name derived from the source file stem (`data/raw/customers.csv` -> `customers`).
    pub fn name(&self) -> Option<&str> {
        self.source
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
    }

    /// Iterate the values of one column, or `None` if the column does not exist.
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Value> + use<'a>> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&NULL)))
    }

    /// Keep only rows that match `predicate`, consuming the dataset.
    ///
    /// The returned dataset preserves the original schema.
    pub fn retain_rows<F>(mut self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| predicate(row.as_slice()));
        self
    }

    /// Set the column named by `field` to `values`, appending it if it does not exist yet.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not contain exactly one value per row.
    pub fn put_column(&mut self, field: Field, values: Vec<Value>) {
        assert!(
            values.len() == self.rows.len(),
            "column length {} does not match row count {}",
            values.len(),
            self.rows.len()
        );

        match self.schema.index_of(&field.name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    if let Some(slot) = row.get_mut(idx) {
                        *slot = value;
                    }
                }
                if let Some(existing) = self.schema.fields.get_mut(idx) {
                    *existing = field;
                }
            }
            None => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
                self.schema.fields.push(field);
            }
        }
    }

    /// Reduce (fold) all rows into an accumulator value.
    ///
    /// This is similar to `Iterator::fold`, but provides each row as `&[Value]`.
    pub fn reduce_rows<A, F>(&self, init: A, mut reducer: F) -> A
    where
        F: FnMut(A, &[Value]) -> A,
    {
        self.rows
            .iter()
            .fold(init, |acc, row| reducer(acc, row.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("name", DataType::Utf8),
        ]);
        let rows = vec![
            vec![Value::Int64(1), Value::Utf8("a".to_string())],
            vec![Value::Int64(2), Value::Null],
            vec![Value::Int64(3), Value::Utf8("c".to_string())],
        ];
        DataSet::new(schema, rows)
    }

    #[test]
    fn schema_index_of_works() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.index_of("id"), Some(0));
        assert_eq!(ds.schema.index_of("name"), Some(1));
        assert_eq!(ds.schema.index_of("missing"), None);
        assert!(ds.schema.contains("name"));
    }

    #[test]
    fn retain_rows_keeps_schema() {
        let ds = sample_dataset();
        let schema = ds.schema.clone();
        let out = ds.retain_rows(|row| !row[1].is_null());
        assert_eq!(out.schema, schema);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows[1][0], Value::Int64(3));
    }

    #[test]
    fn put_column_appends_then_overwrites() {
        let mut ds = sample_dataset();
        ds.put_column(
            Field::new("score", DataType::Int64),
            vec![Value::Int64(7), Value::Int64(8), Value::Null],
        );
        assert_eq!(ds.column_count(), 3);
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Utf8("a".to_string()), Value::Int64(7)]);

        ds.put_column(
            Field::new("name", DataType::Utf8),
            vec![Value::Null, Value::Null, Value::Null],
        );
        assert_eq!(ds.column_count(), 3);
        assert!(ds.column_values("name").unwrap().all(Value::is_null));
    }

    #[test]
    #[should_panic(expected = "column length")]
    fn put_column_panics_on_wrong_length() {
        let mut ds = sample_dataset();
        ds.put_column(Field::new("x", DataType::Int64), vec![Value::Null]);
    }

    #[test]
    fn name_comes_from_source_stem() {
        let ds = sample_dataset().with_source("data/raw/customers.csv");
        assert_eq!(ds.name(), Some("customers"));
        assert_eq!(sample_dataset().name(), None);
    }
}
