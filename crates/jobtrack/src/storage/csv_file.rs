use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::StoreError;
use crate::record::{Row, COLUMNS};

use super::TabularStore;

/// Secondary store: a CSV file with a header row in [`COLUMNS`] order.
pub struct CsvFileStore {
    path: PathBuf,
}

impl CsvFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads back all data rows. Rows with the wrong field count are skipped.
    pub fn read_rows(&self) -> Result<Vec<Row>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.csv_error(e))?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.csv_error(e))?;
            let fields: Vec<String> = record.iter().map(String::from).collect();
            if let Ok(row) = Row::try_from(fields) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn needs_header(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true)
    }

    fn csv_error(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::WriteFile {
            path: self.path.clone(),
            source,
        }
    }
}

impl TabularStore for CsvFileStore {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn append_rows(&self, rows: &[Row]) -> Result<(), StoreError> {
        // Encode the whole batch first so the file sees a single write.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if self.needs_header() {
            writer
                .write_record(COLUMNS)
                .map_err(|e| self.csv_error(e))?;
        }
        for row in rows {
            writer.write_record(row).map_err(|e| self.csv_error(e))?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| self.write_error(e.into_error()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        file.write_all(&buffer).map_err(|e| self.write_error(e))?;
        file.flush().map_err(|e| self.write_error(e))?;

        debug!("Appended {} row(s) to {}", rows.len(), self.path.display());
        Ok(())
    }
}
