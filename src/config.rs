//! Run settings and their defaults.

use std::path::PathBuf;

/// Number of place entities, region total included, in a complete case set.
pub const DEFAULT_EXPECTED_PLACES: usize = 11;
/// Name of the region-wide aggregate.
pub const DEFAULT_REGION: &str = "Veneto";
/// Number of similar names offered per unresolved hospital.
pub const DEFAULT_CANDIDATES: usize = 5;

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory searched recursively for snapshot files.
    pub base_dir: PathBuf,
    /// Where combined JSON documents are written.
    pub json_dir: PathBuf,
    /// Where per-category CSV tables are written.
    pub csv_dir: PathBuf,
    pub hospital_info: PathBuf,
    pub exceptions: PathBuf,
    /// When set, one workbook per store is also written here.
    pub workbook_dir: Option<PathBuf>,
    pub expected_places: usize,
    pub region: String,
    pub candidates: usize,
}

impl PipelineConfig {
    /// Configuration with the default expectations.
    pub fn new(
        base_dir: impl Into<PathBuf>,
        json_dir: impl Into<PathBuf>,
        csv_dir: impl Into<PathBuf>,
        hospital_info: impl Into<PathBuf>,
        exceptions: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            json_dir: json_dir.into(),
            csv_dir: csv_dir.into(),
            hospital_info: hospital_info.into(),
            exceptions: exceptions.into(),
            workbook_dir: None,
            expected_places: DEFAULT_EXPECTED_PLACES,
            region: DEFAULT_REGION.to_string(),
            candidates: DEFAULT_CANDIDATES,
        }
    }
}
