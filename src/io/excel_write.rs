use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::tables::CategoryTable;

/// Longest sheet name Excel accepts.
const MAX_SHEET_NAME: usize = 31;

/// Writes the tables of one store to a workbook, one sheet per category.
pub fn write_workbook(path: &Path, tables: &[CategoryTable]) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(sheet_name(&table.stem()))?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, (date, values)) in table.rows.iter().enumerate() {
            let row = (row_idx + 1) as u32;
            worksheet.write_string(row, 0, date)?;
            for (col_idx, value) in values.iter().enumerate() {
                worksheet.write_number(row, (col_idx + 1) as u16, *value as f64)?;
            }
        }

        let mut excel_table = rust_xlsxwriter::Table::new();
        excel_table.set_autofilter(true);
        let col_end = (table.columns.len() as u16).saturating_sub(1);
        let row_end = table.rows.len() as u32;
        worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
    }

    workbook_writer.save(path)?;
    Ok(())
}

fn sheet_name(stem: &str) -> String {
    stem.chars().take(MAX_SHEET_NAME).collect()
}
