//! Persist stage: replace a SQLite relation with the dataset's rows.

use std::fs;
use std::path::PathBuf;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::config::StoreOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Value, TIMESTAMP_FORMAT};

/// What [`persist`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistStats {
    /// Database file written to.
    pub database_path: PathBuf,
    /// Relation that was replaced.
    pub table: String,
    /// Rows now in the relation.
    pub rows_written: usize,
}

/// Write every row of `dataset` to `options.table`, replacing whatever the relation held.
///
/// The connection is opened here and dropped before returning, on success and on error. The
/// drop/create/insert sequence runs in a single transaction, so a failure leaves the previous
/// contents of the relation in place.
///
/// Column types map as `Int64`/`Bool` -> `INTEGER`, `Float64` -> `REAL`,
/// `Utf8`/`Timestamp` -> `TEXT` (timestamps as `YYYY-MM-DD HH:MM:SS`).
pub fn persist(dataset: &DataSet, options: &StoreOptions) -> PipelineResult<PersistStats> {
    let path = &options.database_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::StoreLocation {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut conn = Connection::open(path)?;
    debug!(path = %path.display(), "opened store connection");
    let rows_written = replace_table(&mut conn, dataset, &options.table)?;

    info!(
        path = %path.display(),
        table = %options.table,
        rows = rows_written,
        "Data written to database."
    );
    Ok(PersistStats {
        database_path: path.clone(),
        table: options.table.clone(),
        rows_written,
    })
}

fn replace_table(conn: &mut Connection, dataset: &DataSet, table: &str) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    let table = quote_ident(table);

    let columns = dataset
        .schema
        .fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), sql_type(f.data_type)))
        .collect::<Vec<_>>()
        .join(", ");
    tx.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
    tx.execute(&format!("CREATE TABLE {table} ({columns})"), [])?;

    {
        let placeholders = (1..=dataset.column_count())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = tx.prepare(&format!("INSERT INTO {table} VALUES ({placeholders})"))?;
        for row in &dataset.rows {
            stmt.execute(params_from_iter(row.iter().map(to_sql_value)))?;
        }
    }

    tx.commit()?;
    Ok(dataset.row_count())
}

fn sql_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Int64 | DataType::Bool => "INTEGER",
        DataType::Float64 => "REAL",
        DataType::Utf8 | DataType::Timestamp => "TEXT",
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Utf8(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(ts) => SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use chrono::NaiveDate;
    use rusqlite::Connection;

    use super::{persist, quote_ident};
    use crate::config::StoreOptions;
    use crate::error::PipelineError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn tmp_db(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("customer-cleaning-persist-{tag}-{nanos}.db"))
    }

    fn customers(n: i64) -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("email", DataType::Utf8),
            Field::new("signup_date", DataType::Timestamp),
            Field::new("vip", DataType::Bool),
        ]);
        let signup = NaiveDate::from_ymd_opt(2023, 1, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = (1..=n)
            .map(|i| {
                vec![
                    Value::Int64(i),
                    Value::Utf8(format!("user{i}@x.com")),
                    Value::Timestamp(signup),
                    Value::Bool(i % 2 == 0),
                ]
            })
            .collect();
        DataSet::new(schema, rows)
    }

    fn count(path: &Path, table: &str) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn writes_rows_with_mapped_types() {
        let path = tmp_db("types");
        let opts = StoreOptions {
            database_path: path.clone(),
            table: "customers".to_string(),
        };

        let stats = persist(&customers(2), &opts).unwrap();
        assert_eq!(stats.rows_written, 2);

        let conn = Connection::open(&path).unwrap();
        let (id, email, date, vip): (i64, String, String, i64) = conn
            .query_row(
                "SELECT id, email, signup_date, vip FROM customers WHERE id = 2",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!((id, email.as_str(), date.as_str(), vip), (2, "user2@x.com", "2023-01-10 00:00:00", 1));
    }

    #[test]
    fn second_write_replaces_the_relation() {
        let path = tmp_db("replace");
        let opts = StoreOptions {
            database_path: path.clone(),
            table: "customers".to_string(),
        };

        persist(&customers(5), &opts).unwrap();
        persist(&customers(2), &opts).unwrap();
        assert_eq!(count(&path, "customers"), 2);
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let path = tmp_db("rollback");
        let opts = StoreOptions {
            database_path: path.clone(),
            table: "customers".to_string(),
        };
        persist(&customers(3), &opts).unwrap();

        // A row longer than the schema makes the insert fail after DROP/CREATE ran.
        let mut bad = customers(1);
        bad.rows[0].push(Value::Int64(99));
        let err = persist(&bad, &opts).unwrap_err();

        assert!(matches!(err, PipelineError::Persisting(_)));
        assert_eq!(count(&path, "customers"), 3);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tmp_db("nested");
        let path = dir.join("deeper").join("out.db");
        let opts = StoreOptions {
            database_path: path.clone(),
            table: "odd \"name\"".to_string(),
        };
        persist(&customers(1), &opts).unwrap();
        assert_eq!(count(&path, "odd \"name\""), 1);
    }
}
