//! CSV-backed product table.
//!
//! Cells are plain strings. Short rows are padded so every row has one cell
//! per header. One column can be marked protected; writes to it are refused.

use std::path::{Path, PathBuf};

use crate::error::TableError;

/// In-memory product table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    protected: Option<String>,
}

impl Table {
    /// Build a table from headers and rows (rows are padded to the header width).
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut table = Self {
            headers,
            rows,
            protected: None,
        };
        table.pad_rows();
        table
    }

    /// Read a CSV file. The first record is the header.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let read_err = |message: String| TableError::Read {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| read_err(e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| read_err(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| read_err(e.to_string()))
            })
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        tracing::debug!("Loaded {} rows from {:?}", rows.len(), path);
        Ok(Self::new(headers, rows))
    }

    /// Write the table as CSV, atomically (temp file in the same directory, then rename).
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let write_err = |message: String| TableError::Write {
            path: path.to_path_buf(),
            message,
        };

        let tmp = temp_path(path);
        {
            let mut writer = csv::Writer::from_path(&tmp).map_err(|e| write_err(e.to_string()))?;
            writer
                .write_record(&self.headers)
                .map_err(|e| write_err(e.to_string()))?;
            for row in &self.rows {
                writer
                    .write_record(row)
                    .map_err(|e| write_err(e.to_string()))?;
            }
            writer.flush().map_err(|e| write_err(e.to_string()))?;
        }

        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            write_err(e.to_string())
        })?;
        tracing::debug!("Saved {} rows to {:?}", self.rows.len(), path);
        Ok(())
    }

    /// Refuse writes to `column` from now on.
    pub fn protect(&mut self, column: &str) {
        self.protected = Some(column.to_string());
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.to_string(),
                available: self.headers.join(", "),
            })
    }

    /// Index of `name`, appending an empty column if it is absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Cell value; out-of-range cells read as empty.
    pub fn get(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Overwrite a cell.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) -> Result<(), TableError> {
        let header = self.headers.get(col).cloned().unwrap_or_default();
        if self.protected.as_deref() == Some(header.as_str()) {
            return Err(TableError::ProtectedColumn(header));
        }
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
        Ok(())
    }

    /// True when the cell is empty or whitespace.
    pub fn is_blank(&self, row: usize, col: usize) -> bool {
        self.get(row, col).trim().is_empty()
    }

    fn pad_rows(&mut self) {
        let width = self.headers.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table.csv".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
