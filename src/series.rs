//! Accumulation of snapshots into per-entity, per-category time series.

use std::collections::BTreeSet;

use tracing::{info, instrument, warn};

use crate::canonical::{Canonicalizer, RowLocation};
use crate::error::{Result, ToolError};
use crate::model::{Category, Count, Entity, EntityKind, RawValue, SeriesStore, Snapshot};

/// Whether a category column must be present in every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    /// Columns introduced after the series started. A snapshot without the
    /// column contributes no value for that date, not a zero.
    Optional,
}

/// Columns read from the snapshots of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSchema {
    pub kind: EntityKind,
    pub identity_column: &'static str,
    pub categories: &'static [(Category, Presence)],
}

pub const PLACE_SCHEMA: SnapshotSchema = SnapshotSchema {
    kind: EntityKind::Place,
    identity_column: "residenza",
    categories: &[
        (Category::TotalPositives, Presence::Required),
        (Category::Isolation, Presence::Optional),
    ],
};

pub const HOSPITAL_SCHEMA: SnapshotSchema = SnapshotSchema {
    kind: EntityKind::Hospital,
    identity_column: "struttura",
    categories: &[
        (Category::NonCritical, Presence::Required),
        (Category::IntensiveCare, Presence::Required),
        (Category::Discharged, Presence::Required),
        (Category::Deaths, Presence::Required),
    ],
};

impl SnapshotSchema {
    /// Schema of the snapshots of `kind`.
    pub fn for_kind(kind: EntityKind) -> &'static SnapshotSchema {
        match kind {
            EntityKind::Place => &PLACE_SCHEMA,
            EntityKind::Hospital => &HOSPITAL_SCHEMA,
        }
    }
}

/// Builds a fresh store from `snapshots`.
///
/// Snapshots are processed in ascending date order whatever order they are
/// given in, so the result only depends on the snapshot set.
#[instrument(level = "info", skip_all, fields(kind = %kind, snapshots = snapshots.len()))]
pub fn build_series(
    kind: EntityKind,
    snapshots: &[Snapshot],
    canonicalizer: &mut Canonicalizer,
) -> Result<SeriesStore> {
    let schema = SnapshotSchema::for_kind(kind);
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by(|lhs, rhs| lhs.date.cmp(&rhs.date));

    let mut store = SeriesStore::new(kind);
    for snapshot in ordered {
        accumulate(&mut store, snapshot, schema, canonicalizer)?;
    }

    info!(
        entities = store.entities.len(),
        dates = store.dates.len(),
        "time series assembled"
    );
    Ok(store)
}

/// Writes every row of `snapshot` into `store` at the snapshot's date.
pub fn accumulate(
    store: &mut SeriesStore,
    snapshot: &Snapshot,
    schema: &SnapshotSchema,
    canonicalizer: &mut Canonicalizer,
) -> Result<()> {
    for (category, presence) in schema.categories {
        if *presence == Presence::Required && !snapshot.has_column(category.as_str()) {
            return Err(ToolError::MissingColumn {
                file: snapshot.source.clone(),
                column: category.as_str().to_string(),
            });
        }
    }
    let reported: Vec<Category> = schema
        .categories
        .iter()
        .map(|(category, _)| *category)
        .filter(|category| snapshot.has_column(category.as_str()))
        .collect();

    store.register_date(&snapshot.date);
    let mut rows_in_snapshot = BTreeSet::new();

    for row in &snapshot.rows {
        let location = RowLocation {
            file: &snapshot.source,
            line: row.line,
            column: schema.identity_column,
        };
        let canonical =
            canonicalizer.canonicalize(schema.kind, row.get(schema.identity_column), &location)?;

        if canonical.is_new && store.dates.first() != Some(&snapshot.date) {
            warn!(
                entity = %canonical.name,
                date = %snapshot.date,
                "entity first reported after the first snapshot"
            );
        }
        if !rows_in_snapshot.insert(canonical.name.clone()) {
            return Err(ToolError::DuplicateEntity {
                name: canonical.name,
                context: format!("in {}", snapshot.source.display()),
            });
        }

        let mut values = Vec::with_capacity(reported.len());
        for category in &reported {
            let column = category.as_str();
            let location = RowLocation {
                file: &snapshot.source,
                line: row.line,
                column,
            };
            values.push((*category, coerce_count(row.get(column), &location)?));
        }

        let entity = store
            .entities
            .entry(canonical.name.clone())
            .or_insert_with(|| Entity::observed(canonical.name.clone(), snapshot.date.clone()));
        for (category, value) in values {
            entity
                .series
                .entry(category)
                .or_default()
                .insert(snapshot.date.clone(), value);
        }
    }

    Ok(())
}

/// Converts a cell into a count. Blank cells count as zero.
pub fn coerce_count(value: &RawValue, location: &RowLocation<'_>) -> Result<Count> {
    let invalid = |shown: String| ToolError::InvalidNumber {
        file: location.file.to_path_buf(),
        line: location.line,
        column: location.column.to_string(),
        value: shown,
    };

    let number = match value {
        RawValue::Missing => return Ok(0),
        RawValue::Number(number) => *number,
        RawValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(text.clone()))?,
    };

    if !number.is_finite() || number < 0.0 || number.fract() != 0.0 || number > u64::MAX as f64 {
        return Err(invalid(number.to_string()));
    }
    Ok(number as Count)
}
