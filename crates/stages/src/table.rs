//! Minimal in-memory CSV table

use std::path::Path;

use contracts::{StageError, StageResult};

/// Header plus string cells; empty cells are missing values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path) -> StageResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| StageError::other(format!("failed to open {}", path.display()), e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| StageError::other("failed to read csv header", e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| StageError::other("failed to read csv record", e))?;
            let mut row: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: &Path) -> StageResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| StageError::other(format!("failed to create {}", path.display()), e))?;
        writer
            .write_record(&self.headers)
            .map_err(|e| StageError::other("failed to write csv header", e))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| StageError::other("failed to write csv record", e))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse a cell as a number; empty or non-numeric is `None`
pub fn numeric(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}
