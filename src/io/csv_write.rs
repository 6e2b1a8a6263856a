use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::tables::CategoryTable;

/// Writes a category table to `<dir>/<prefix>_<category>.csv` and returns the
/// path written.
pub fn write_table(dir: &Path, table: &CategoryTable) -> Result<PathBuf> {
    let path = dir.join(table.file_name());
    let mut writer = csv::Writer::from_path(&path)?;

    writer.write_record(&table.columns)?;
    for (date, values) in &table.rows {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(date.clone());
        record.extend(values.iter().map(u64::to_string));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(path)
}
