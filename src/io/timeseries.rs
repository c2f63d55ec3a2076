//! Time series input from CSV files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Column of a CSV file, by position or by header title.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Index(usize),
    Title(String),
}

impl Default for ColumnSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Reads one numeric column of a CSV file with a header row.
///
/// # Arguments
///
/// * `path` - CSV file
/// * `separator` - Single-byte field delimiter
/// * `column` - Column to read
///
/// # Errors
///
/// Returns a `ConfigError` addressed at `field` if the file cannot be read,
/// the column does not exist or a cell is not a number.
pub fn read_column(
    field: &str,
    path: &Path,
    separator: u8,
    column: &ColumnSelector,
) -> Result<Vec<f64>, ConfigError> {
    let file = File::open(path)
        .map_err(|e| ConfigError::new(field, format!("{}: {e}", path.display())))?;
    read_column_from(field, file, separator, column)
}

/// Like [`read_column`], from any reader.
///
/// # Errors
///
/// See [`read_column`].
pub fn read_column_from(
    field: &str,
    reader: impl Read,
    separator: u8,
    column: &ColumnSelector,
) -> Result<Vec<f64>, ConfigError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(separator)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| ConfigError::new(field, e.to_string()))?;
    let index = match column {
        ColumnSelector::Index(i) if *i < headers.len() => *i,
        ColumnSelector::Index(i) => {
            return Err(ConfigError::new(
                field,
                format!("column {i} out of range, file has {} columns", headers.len()),
            ));
        }
        ColumnSelector::Title(title) => headers
            .iter()
            .position(|h| h == title)
            .ok_or_else(|| ConfigError::new(field, format!("no column titled \"{title}\"")))?,
    };

    let mut values = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| ConfigError::new(field, e.to_string()))?;
        let cell = record.get(index).unwrap_or_default();
        let value = cell.parse::<f64>().map_err(|_| {
            ConfigError::new(field, format!("row {}: \"{cell}\" is not a number", row + 1))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Parses a one-character separator such as `","` or `";"`.
///
/// # Errors
///
/// Returns a `ConfigError` if `separator` is not a single ASCII character.
pub fn separator_byte(field: &str, separator: &str) -> Result<u8, ConfigError> {
    match separator.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ConfigError::new(
            field,
            format!("must be a single ASCII character, got \"{separator}\""),
        )),
    }
}
