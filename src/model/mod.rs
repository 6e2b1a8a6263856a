use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

/// Integer count reported for a category on a given date.
pub type Count = u64;

/// Date → value mapping for one (entity, category) pair.
pub type TimeSeries = BTreeMap<SnapshotDate, Count>;

/// Date key of a snapshot in `YYYYMMDD` form. Lexical order is chronological
/// order, which keeps every map keyed by date sorted by time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotDate(String);

impl SnapshotDate {
    /// Validates and wraps a `YYYYMMDD` key.
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == 8
            && raw.bytes().all(|byte| byte.is_ascii_digit())
            && (1..=12).contains(&raw[4..6].parse::<u8>().unwrap_or(0))
            && (1..=31).contains(&raw[6..8].parse::<u8>().unwrap_or(0));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ToolError::InvalidDate(raw.to_string()))
        }
    }

    /// The date as written in file names, `YYYYMMDD`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SnapshotDate {
    type Error = ToolError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SnapshotDate> for String {
    fn from(date: SnapshotDate) -> Self {
        date.0
    }
}

/// The two families of source entities. Exception lookups are scoped by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// Cities, provinces and other residence labels from case snapshots.
    Place,
    /// Hospital facilities from occupancy snapshots.
    Hospital,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Place => write!(f, "place"),
            EntityKind::Hospital => write!(f, "hospital"),
        }
    }
}

/// Whether an entity was read from snapshots or computed from other entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Observed,
    Synthetic,
}

/// Numeric metrics tracked per entity.
///
/// Variants are declared in the lexical order of their wire names so that
/// ordered maps keyed by category iterate alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Deaths,
    Discharged,
    Isolation,
    NonCritical,
    IntensiveCare,
    TotalPositives,
}

impl Category {
    /// Every category, in wire-name order.
    pub const ALL: [Category; 6] = [
        Category::Deaths,
        Category::Discharged,
        Category::Isolation,
        Category::NonCritical,
        Category::IntensiveCare,
        Category::TotalPositives,
    ];

    /// Name used both as CSV column header and as key in exported documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Deaths => "decessi",
            Category::Discharged => "dimessi",
            Category::Isolation => "isolamento",
            Category::NonCritical => "non critici",
            Category::IntensiveCare => "terapia intensiva",
            Category::TotalPositives => "totale positivi",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell as read from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Free text.
    Text(String),
    /// Cell that parsed as a finite number.
    Number(f64),
    /// Blank cell or column absent from the row.
    Missing,
}

impl RawValue {
    /// Classifies a raw CSV cell.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return RawValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => RawValue::Number(number),
            _ => RawValue::Text(cell.to_string()),
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            RawValue::Text(text) => format!("text '{text}'"),
            RawValue::Number(number) => format!("number {number}"),
            RawValue::Missing => "an empty cell".to_string(),
        }
    }
}

/// One data row of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Column name → cell.
    pub cells: BTreeMap<String, RawValue>,
}

impl RawRow {
    /// Cell of `column`, [`RawValue::Missing`] when the row has none.
    pub fn get(&self, column: &str) -> &RawValue {
        self.cells.get(column).unwrap_or(&RawValue::Missing)
    }
}

/// One source file for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub date: SnapshotDate,
    pub source: PathBuf,
    /// Header columns, in file order.
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Snapshot {
    /// True when the header row contains `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|candidate| candidate == column)
    }
}

/// A canonical place, hospital, or aggregate together with its series.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub origin: Origin,
    /// Date on which the entity was first reported. `None` for aggregates.
    pub first_seen: Option<SnapshotDate>,
    pub series: BTreeMap<Category, TimeSeries>,
}

impl Entity {
    /// Creates an entity read from a snapshot on `date`.
    pub fn observed(name: impl Into<String>, date: SnapshotDate) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Observed,
            first_seen: Some(date),
            series: BTreeMap::new(),
        }
    }

    /// Creates an empty aggregate entity.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Synthetic,
            first_seen: None,
            series: BTreeMap::new(),
        }
    }

    /// True for aggregates computed by the pipeline.
    pub fn is_synthetic(&self) -> bool {
        self.origin == Origin::Synthetic
    }

    /// Value of `category` on `date`, if reported.
    pub fn value(&self, category: Category, date: &SnapshotDate) -> Option<Count> {
        self.series
            .get(&category)
            .and_then(|series| series.get(date))
            .copied()
    }
}

/// The accumulating store owned by the pipeline for one family of snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStore {
    pub kind: EntityKind,
    /// Every snapshot date covered, ascending.
    pub dates: Vec<SnapshotDate>,
    /// Canonical name → entity.
    pub entities: BTreeMap<String, Entity>,
}

impl SeriesStore {
    /// Empty store with no dates.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            dates: Vec::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Entities read from snapshots, skipping aggregates.
    pub fn observed(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|entity| !entity.is_synthetic())
    }

    /// Categories reported by at least one entity.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| {
                self.entities
                    .values()
                    .any(|entity| entity.series.contains_key(category))
            })
            .collect()
    }

    /// Records `date` keeping `dates` sorted and free of duplicates.
    pub fn register_date(&mut self, date: &SnapshotDate) {
        if let Err(position) = self.dates.binary_search(date) {
            self.dates.insert(position, date.clone());
        }
    }
}

/// Geographic position of a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Static reference data for a canonical hospital.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalInfo {
    pub short_name: String,
    pub city: String,
    pub province: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Canonical hospital name → reference data.
pub type HospitalInfoTable = BTreeMap<String, HospitalInfo>;
