//! CSV reading and value cleaning
//!
//! Files are decoded to UTF-8 up front (raw INEP microdata ships as Latin-1),
//! then parsed with the `csv` crate. Rows are exposed by column name so the
//! document builders do not depend on column order.

use super::LoadError;
use crate::config::CsvEncoding;
use encoding_rs::WINDOWS_1252;
use std::collections::HashMap;
use std::path::Path;

/// A parsed CSV file
#[derive(Debug, Clone)]
pub struct CsvTable {
    columns: HashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

/// One row of a [`CsvTable`]
#[derive(Debug, Clone, Copy)]
pub struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

fn decode(bytes: &[u8], encoding: CsvEncoding) -> String {
    match encoding {
        CsvEncoding::Latin1 => WINDOWS_1252.decode(bytes).0.into_owned(),
        CsvEncoding::Utf8 => {
            let text = String::from_utf8_lossy(bytes);
            text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
        }
    }
}

impl CsvTable {
    /// Read and parse `path`
    pub fn read(path: &Path, delimiter: u8, encoding: CsvEncoding) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&decode(&bytes, encoding), delimiter).map_err(|source| LoadError::Csv {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse CSV text with a header row
    pub fn parse(text: &str, delimiter: u8) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns, rows })
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the file has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the header row names `column`
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Rows in file order
    pub fn rows(&self) -> impl Iterator<Item = CsvRow<'_>> {
        self.rows.iter().map(move |record| CsvRow {
            columns: &self.columns,
            record,
        })
    }
}

impl<'a> CsvRow<'a> {
    fn raw(&self, column: &str) -> Option<&'a str> {
        let index = *self.columns.get(column)?;
        self.record.get(index)
    }

    /// Cleaned text; empty cells and `nan` are missing
    pub fn text(&self, column: &str) -> Option<String> {
        let value = self.raw(column)?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Integer cell; accepts float notation such as `"3.0"`
    pub fn int(&self, column: &str) -> Option<i64> {
        let value = self.text(column)?;
        value
            .parse::<i64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
    }

    /// Float cell
    pub fn float(&self, column: &str) -> Option<f64> {
        self.text(column)?.parse::<f64>().ok().filter(|f| f.is_finite())
    }

    /// Boolean cell: `1`, `TRUE`, `SIM` and `S` are true, anything else false
    pub fn flag(&self, column: &str) -> Option<bool> {
        let value = self.text(column)?.to_uppercase();
        Some(matches!(value.as_str(), "1" | "TRUE" | "SIM" | "S" | "1.0"))
    }
}
