#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use veneto_epi_tools::canonical::{Canonicalizer, ExceptionTable};
use veneto_epi_tools::model::{
    Category, Entity, EntityKind, RawRow, RawValue, SeriesStore, Snapshot, SnapshotDate,
};
use veneto_epi_tools::series::build_series;

pub const PLACE_COLUMNS: &[&str] = &["residenza", "totale positivi"];
pub const HOSPITAL_COLUMNS: &[&str] = &[
    "struttura",
    "non critici",
    "terapia intensiva",
    "dimessi",
    "decessi",
];

pub fn date(raw: &str) -> SnapshotDate {
    SnapshotDate::parse(raw).expect("valid snapshot date")
}

/// Builds an in-memory snapshot whose cells are classified like CSV cells.
pub fn snapshot(raw_date: &str, columns: &[&str], rows: &[&[&str]]) -> Snapshot {
    Snapshot {
        date: date(raw_date),
        source: PathBuf::from(format!("snapshot{raw_date}.csv")),
        columns: columns.iter().map(|column| column.to_string()).collect(),
        rows: rows
            .iter()
            .enumerate()
            .map(|(idx, cells)| RawRow {
                line: idx + 2,
                cells: columns
                    .iter()
                    .zip(cells.iter())
                    .map(|(column, cell)| (column.to_string(), RawValue::from_cell(cell)))
                    .collect(),
            })
            .collect(),
    }
}

pub fn build(kind: EntityKind, snapshots: &[Snapshot]) -> SeriesStore {
    build_with(kind, snapshots, ExceptionTable::default())
}

pub fn build_with(kind: EntityKind, snapshots: &[Snapshot], exceptions: ExceptionTable) -> SeriesStore {
    let mut canonicalizer = Canonicalizer::new(exceptions);
    build_series(kind, snapshots, &mut canonicalizer).expect("series built")
}

/// Observed entity with a single category series.
pub fn entity_with(name: &str, category: Category, values: &[(&str, u64)]) -> Entity {
    let mut entity = Entity::observed(name, date(values[0].0));
    entity
        .series
        .insert(category, values.iter().map(|(raw, value)| (date(raw), *value)).collect());
    entity
}

pub fn store_of(kind: EntityKind, entities: Vec<Entity>) -> SeriesStore {
    let mut store = SeriesStore::new(kind);
    for entity in entities {
        for series in entity.series.values() {
            for date in series.keys() {
                store.register_date(date);
            }
        }
        store.entities.insert(entity.name.clone(), entity);
    }
    store
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("fixture directory created");
    let path = dir.join(name);
    fs::write(&path, content).expect("fixture written");
    path
}
