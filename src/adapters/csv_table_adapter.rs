//! CSV template reader and output writer.

use crate::domain::error::EquiscoreError;
use crate::domain::reconcile::{CellValue, OutputTable};
use crate::ports::table_port::TablePort;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTableAdapter;

impl TablePort for CsvTableAdapter {
    fn read_table(&self, path: &Path) -> Result<OutputTable, EquiscoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| EquiscoreError::Template {
                reason: format!("failed to open {}: {}", path.display(), e),
            })?;

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(EquiscoreError::Template {
                reason: format!("{} has no header row", path.display()),
            });
        }

        let mut table = OutputTable::new(headers);
        for record in rdr.records() {
            let record = record?;
            table.push_row(record.iter().map(CellValue::parse).collect());
        }
        Ok(table)
    }

    fn write_table(&self, table: &OutputTable, path: &Path) -> Result<(), EquiscoreError> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&table.headers)?;
        for row in &table.rows {
            wtr.write_record(row.iter().map(|c| c.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
