use drivebucket_config::StorageSettings;
use serde::{Deserialize, Serialize};

use super::CodecError;

/// Rows of optional cells under named columns. `None` marks an NA cell.
/// Every row is exactly as wide as the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), CodecError> {
        if row.len() != self.columns.len() {
            return Err(CodecError::Shape {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[index].as_deref()).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }
}

/// Converts between raw bytes and tables.
pub trait TableCodec: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Table, CodecError>;
    fn serialize(&self, table: &Table) -> Result<Vec<u8>, CodecError>;
}

/// Delimited text with a header row and no index column. Empty cells and
/// any configured NA token parse as `None`; `None` is written as an empty
/// cell.
#[derive(Debug, Clone)]
pub struct CsvTableCodec {
    delimiter: u8,
    na_values: Vec<String>,
}

impl Default for CsvTableCodec {
    fn default() -> Self {
        Self {
            delimiter: b',',
            na_values: vec!["na".to_string()],
        }
    }
}

impl CsvTableCodec {
    pub fn new(delimiter: u8, na_values: Vec<String>) -> Self {
        Self {
            delimiter,
            na_values,
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        let delimiter = match settings.csv_delimiter.as_bytes() {
            [byte] => *byte,
            _ => b',',
        };
        Self::new(delimiter, settings.na_values.clone())
    }

    fn cell(&self, raw: &str) -> Option<String> {
        if raw.is_empty() || self.na_values.iter().any(|na| na == raw) {
            None
        } else {
            Some(raw.to_string())
        }
    }
}

impl TableCodec for CsvTableCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Table, CodecError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(bytes);

        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(|c| self.cell(c)).collect())?;
        }
        Ok(table)
    }

    fn serialize(&self, table: &Table) -> Result<Vec<u8>, CodecError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        writer
            .into_inner()
            .map_err(|e| CodecError::Csv(e.into_error().into()))
    }
}
