//! Discovery and parsing of dated CSV snapshots.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::error::{Result, ToolError};
use crate::model::{EntityKind, RawRow, RawValue, Snapshot, SnapshotDate};

/// The two families of dated source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFamily {
    /// `cases<YYYYMMDD>.csv`
    Cases,
    /// `hospitals<YYYYMMDD>.csv`
    Hospitals,
}

impl SnapshotFamily {
    /// File name prefix, also used for exported tables.
    pub fn prefix(self) -> &'static str {
        match self {
            SnapshotFamily::Cases => "cases",
            SnapshotFamily::Hospitals => "hospitals",
        }
    }

    /// Kind of the entities listed in this family.
    pub fn kind(self) -> EntityKind {
        match self {
            SnapshotFamily::Cases => EntityKind::Place,
            SnapshotFamily::Hospitals => EntityKind::Hospital,
        }
    }

    fn file_pattern(self) -> Regex {
        Regex::new(&format!(r"^{}(\d{{8}})\.csv$", self.prefix()))
            .expect("snapshot file pattern is valid")
    }
}

/// Recursively finds the snapshot files of `family` under `base_dir`, keyed by
/// the date embedded in their name.
#[instrument(level = "debug", skip_all, fields(base_dir = %base_dir.display(), family = family.prefix()))]
pub fn discover(base_dir: &Path, family: SnapshotFamily) -> Result<BTreeMap<SnapshotDate, PathBuf>> {
    if !base_dir.is_dir() {
        return Err(ToolError::MissingInput(base_dir.to_path_buf()));
    }

    let pattern = family.file_pattern();
    let mut files: BTreeMap<SnapshotDate, PathBuf> = BTreeMap::new();

    for entry in WalkDir::new(base_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(captures) = pattern.captures(file_name) else {
            continue;
        };

        let date = SnapshotDate::parse(&captures[1])?;
        let path = entry.path().to_path_buf();
        if let Some(first) = files.get(&date) {
            return Err(ToolError::DuplicateSnapshot {
                date: date.to_string(),
                first: first.clone(),
                second: path,
            });
        }
        debug!(%date, path = %path.display(), "found snapshot");
        files.insert(date, path);
    }

    info!(count = files.len(), family = family.prefix(), "discovered snapshots");
    Ok(files)
}

/// Parses a single snapshot file.
pub fn read_snapshot(path: &Path, date: SnapshotDate) -> Result<Snapshot> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(idx + 2);

        let cells = columns
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| (column.clone(), RawValue::from_cell(cell)))
            .collect();
        rows.push(RawRow { line, cells });
    }

    Ok(Snapshot {
        date,
        source: path.to_path_buf(),
        columns,
        rows,
    })
}

/// Reads every discovered snapshot, in ascending date order.
pub fn read_all(files: &BTreeMap<SnapshotDate, PathBuf>) -> Result<Vec<Snapshot>> {
    files
        .iter()
        .map(|(date, path)| read_snapshot(path, date.clone()))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}
