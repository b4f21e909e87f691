//! Load stage: read a delimited file into an all-text [`DataSet`].

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::config::LoadOptions;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Schema, Value};

/// Load a delimited file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - The file must have a header row; every header becomes a [`crate::types::DataType::Utf8`]
///   column (typing happens in the clean stage). Header names are trimmed.
/// - A repeated header gets a numeric suffix: the second `email` becomes `email.1`, the third
///   `email.2`.
/// - Empty cells become [`Value::Null`]; every other cell is kept exactly as written.
/// - Every record must have as many fields as the header.
///
/// Any failure (missing file, unreadable bytes, ragged records, no header) is reported as
/// [`PipelineError::LoadingData`].
pub fn load_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    let delimiter = options.delimiter.unwrap_or_else(|| infer_delimiter(path));

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_path(path)?;
    let ds = load_from_reader(&mut rdr)?.with_source(path);

    info!(
        path = %path.display(),
        rows = ds.row_count(),
        columns = ds.column_count(),
        "Data loaded successfully."
    );
    Ok(ds)
}

/// Load delimited data from an existing CSV reader.
pub fn load_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> PipelineResult<DataSet> {
    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PipelineError::loading());
    }
    let schema = Schema::all_utf8(dedupe_headers(headers.iter().map(str::trim)));

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(parse_cell).collect());
    }

    Ok(DataSet::new(schema, rows))
}

fn parse_cell(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Null
    } else {
        Value::Utf8(raw.to_owned())
    }
}

fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let names: Vec<&str> = names.collect();
    let mut taken: HashSet<String> = names.iter().map(|n| (*n).to_owned()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|&name| {
            if seen.insert(name) {
                return name.to_owned();
            }
            let counter = next_suffix.entry(name).or_insert(1);
            loop {
                let candidate = format!("{name}.{counter}");
                *counter += 1;
                if taken.insert(candidate.clone()) {
                    debug!(header = name, renamed = %candidate, "renamed duplicate header");
                    return candidate;
                }
            }
        })
        .collect()
}

/// Delimiter implied by a file extension (case-insensitive); comma when unknown.
pub fn infer_delimiter(path: &Path) -> u8 {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("tsv" | "tab") => b'\t',
        Some("psv") => b'|',
        _ => b',',
    }
}
