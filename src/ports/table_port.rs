//! Tabular template source and output sink.

use crate::domain::error::EquiscoreError;
use crate::domain::reconcile::OutputTable;
use std::path::Path;

pub trait TablePort {
    fn read_table(&self, path: &Path) -> Result<OutputTable, EquiscoreError>;
    fn write_table(&self, table: &OutputTable, path: &Path) -> Result<(), EquiscoreError>;
}
