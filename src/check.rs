//! Structural checks and data-quality warnings run before export.
//!
//! Every series of a store must cover every date its category was reported
//! on, otherwise the run aborts. Place stores must also hold the expected
//! number of entities. Hospital count and naming discrepancies only produce
//! findings, which feed the reconciliation step. Decreasing cumulative counts
//! are always advisory.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{info, warn};

use crate::error::{Result, ToolError};
use crate::model::{Category, Count, HospitalInfoTable, SeriesStore, SnapshotDate};

/// Cumulative categories watched for decreases in place stores.
pub const PLACE_REGRESSION_CATEGORIES: &[Category] = &[Category::TotalPositives];
/// Cumulative categories watched for decreases in hospital stores.
pub const HOSPITAL_REGRESSION_CATEGORIES: &[Category] = &[Category::Discharged, Category::Deaths];

/// An advisory observation about a store.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// A cumulative series went down from one populated date to the next.
    Regression {
        entity: String,
        category: Category,
        previous_date: SnapshotDate,
        previous: Count,
        date: SnapshotDate,
        value: Count,
    },
    /// The number of entities differs from the reference.
    EntityCount { expected: usize, found: usize },
    /// An observed hospital has no reference entry.
    Unreferenced { entity: String },
    /// A reference hospital never appears in the snapshots.
    Unreported { entity: String },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Regression {
                entity,
                category,
                previous_date,
                previous,
                date,
                value,
            } => write!(
                f,
                "decrease in {category} for {entity} on {date} ({value}) after {previous_date} ({previous})"
            ),
            Finding::EntityCount { expected, found } => {
                write!(f, "{found} entities observed, reference lists {expected}")
            }
            Finding::Unreferenced { entity } => write!(f, "{entity} has no reference entry"),
            Finding::Unreported { entity } => write!(f, "{entity} is never reported"),
        }
    }
}

/// Findings collected for one store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    pub findings: Vec<Finding>,
}

impl CheckReport {
    /// True when nothing was found.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// The decreases of cumulative series, in detection order.
    pub fn regressions(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| matches!(finding, Finding::Regression { .. }))
    }

    fn push(&mut self, finding: Finding) {
        warn!("{finding}");
        self.findings.push(finding);
    }
}

/// Validates a place store, including its aggregates.
///
/// Fails when the entity count differs from `expected` or when a series
/// misses a date its category was reported on.
pub fn check_places(store: &SeriesStore, expected: usize) -> Result<CheckReport> {
    let found = store.entities.len();
    if found != expected {
        return Err(ToolError::EntityCount {
            kind: store.kind.to_string(),
            expected,
            found,
        });
    }
    require_complete_series(store)?;

    let mut report = CheckReport::default();
    detect_regressions(store, PLACE_REGRESSION_CATEGORIES, &mut report);
    info!(
        entities = found,
        warnings = report.findings.len(),
        "place checks complete"
    );
    Ok(report)
}

/// Compares a hospital store against the reference info.
///
/// Count and naming discrepancies are reported so that they can be
/// reconciled. Series completeness is checked separately by
/// [`require_complete_series`] once reconciliation is over.
pub fn check_hospitals(store: &SeriesStore, info: &HospitalInfoTable) -> CheckReport {
    let mut report = CheckReport::default();

    let observed = store.observed().count();
    if observed != info.len() {
        report.push(Finding::EntityCount {
            expected: info.len(),
            found: observed,
        });
    }
    for entity in store.observed() {
        if !info.contains_key(&entity.name) {
            report.push(Finding::Unreferenced {
                entity: entity.name.clone(),
            });
        }
    }
    for name in info.keys() {
        if !store.entities.contains_key(name) {
            report.push(Finding::Unreported {
                entity: name.clone(),
            });
        }
    }

    detect_regressions(store, HOSPITAL_REGRESSION_CATEGORIES, &mut report);
    info!(
        hospitals = observed,
        findings = report.findings.len(),
        "hospital checks complete"
    );
    report
}

/// Fails on the first series, in entity name order, that misses a date on
/// which some entity of the store reported its category.
///
/// A category first reported partway through the snapshots is only expected
/// from that date on.
pub fn require_complete_series(store: &SeriesStore) -> Result<()> {
    let mut reported: BTreeMap<Category, BTreeSet<&SnapshotDate>> = BTreeMap::new();
    for entity in store.entities.values() {
        for (category, series) in &entity.series {
            reported.entry(*category).or_default().extend(series.keys());
        }
    }

    for entity in store.entities.values() {
        for (category, series) in &entity.series {
            let expected = reported.get(category).map_or(0, BTreeSet::len);
            if series.len() < expected {
                return Err(ToolError::SeriesLength {
                    entity: entity.name.clone(),
                    category: category.to_string(),
                    expected,
                    found: series.len(),
                });
            }
        }
    }
    Ok(())
}

/// Reports every decrease of the listed cumulative categories, comparing each
/// populated date with the one before it.
pub fn detect_regressions(store: &SeriesStore, categories: &[Category], report: &mut CheckReport) {
    for entity in store.entities.values() {
        for category in categories {
            let Some(series) = entity.series.get(category) else {
                continue;
            };
            let mut previous: Option<(&SnapshotDate, Count)> = None;
            for (date, value) in series {
                if let Some((previous_date, previous_value)) = previous {
                    if *value < previous_value {
                        report.push(Finding::Regression {
                            entity: entity.name.clone(),
                            category: *category,
                            previous_date: previous_date.clone(),
                            previous: previous_value,
                            date: date.clone(),
                            value: *value,
                        });
                    }
                }
                previous = Some((date, *value));
            }
        }
    }
}
