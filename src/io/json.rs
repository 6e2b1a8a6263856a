use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;

/// Writes a document as pretty-printed JSON.
pub fn write_document(path: &Path, document: &Value) -> Result<()> {
    let mut json_string = serde_json::to_string_pretty(document)?;
    json_string.push('\n');
    fs::write(path, json_string)?;
    Ok(())
}
