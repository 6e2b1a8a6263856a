//! Input/output adapters.
//!
//! - snapshot discovery + CSV parsing (`snapshot`)
//! - reference JSON files (`reference`)
//! - combined documents (`json`), category tables (`csv_write`, `excel_write`)

pub mod csv_write;
pub mod excel_write;
pub mod json;
pub mod reference;
pub mod snapshot;
