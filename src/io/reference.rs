//! Reference data stored as JSON: hospital info and the exception table.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::canonical::ExceptionTable;
use crate::error::{Result, ToolError};
use crate::model::HospitalInfoTable;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Loads the exception table and checks that it resolves names stably.
pub fn load_exceptions(path: &Path) -> Result<ExceptionTable> {
    let table: ExceptionTable = read_json(path)?;
    table.validate()?;
    Ok(table)
}

/// Loads the hospital reference info keyed by canonical name.
pub fn load_hospital_info(path: &Path) -> Result<HospitalInfoTable> {
    read_json(path)
}

/// Rewrites the hospital info file, keys sorted.
pub fn save_hospital_info(path: &Path, info: &HospitalInfoTable) -> Result<()> {
    let json_string = serde_json::to_string_pretty(info)?;
    fs::write(path, json_string)?;
    Ok(())
}
