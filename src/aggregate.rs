//! Synthetic entities computed by summing groups of observed entities.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::{Result, ToolError};
use crate::model::{Entity, HospitalInfoTable, SeriesStore, SnapshotDate};

/// Sums observed entities grouped by `grouping`.
///
/// Every (category, date) pair reported by at least one member of a group is
/// present in the group's aggregate; members that did not report it count as
/// zero. Aggregates already in the store never take part.
pub fn aggregate_by<F>(store: &SeriesStore, grouping: F) -> BTreeMap<String, Entity>
where
    F: Fn(&Entity) -> Option<String>,
{
    let mut groups: BTreeMap<String, Entity> = BTreeMap::new();

    for entity in store.observed() {
        let Some(group) = grouping(entity) else {
            continue;
        };
        let aggregate = groups
            .entry(group.clone())
            .or_insert_with(|| Entity::synthetic(group));
        for (category, series) in &entity.series {
            let target = aggregate.series.entry(*category).or_default();
            for (date, value) in series {
                *target.entry(date.clone()).or_insert(0) += value;
            }
        }
    }

    groups
}

/// Grand total over every observed entity of the store.
pub fn region_total(store: &SeriesStore, name: &str) -> Entity {
    aggregate_by(store, |_| Some(name.to_string()))
        .remove(name)
        .unwrap_or_else(|| Entity::synthetic(name))
}

/// Inserts an aggregate into the store. Names must stay unique.
pub fn add_synthetic(store: &mut SeriesStore, entity: Entity) -> Result<()> {
    if store.entities.contains_key(&entity.name) {
        return Err(ToolError::DuplicateEntity {
            name: entity.name,
            context: format!("among {} entities", store.kind),
        });
    }
    debug!(entity = %entity.name, "adding aggregate");
    store.entities.insert(entity.name.clone(), entity);
    Ok(())
}

/// Hospital totals per province.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceTotals {
    /// Province name → aggregate.
    pub provinces: BTreeMap<String, Entity>,
    /// Hospitals left out because no province is known for them.
    pub ungrouped: Vec<String>,
}

/// Groups hospitals by the province recorded in the reference info.
pub fn province_totals(hospitals: &SeriesStore, info: &HospitalInfoTable) -> ProvinceTotals {
    let province_of = |entity: &Entity| {
        info.get(&entity.name)
            .map(|entry| entry.province.trim())
            .filter(|province| !province.is_empty())
            .map(str::to_string)
    };

    let ungrouped: Vec<String> = hospitals
        .observed()
        .filter(|entity| province_of(entity).is_none())
        .map(|entity| entity.name.clone())
        .collect();
    for name in &ungrouped {
        warn!(hospital = %name, "no province known, left out of province totals");
    }

    ProvinceTotals {
        provinces: aggregate_by(hospitals, province_of),
        ungrouped,
    }
}

/// Merges the categories of `aggregates` into the matching entities of
/// `target`.
///
/// Category sets are unioned: a category the target entity already has is
/// kept as is. Aggregates with no matching entity are added as new synthetic
/// entities. The target's dates become the union of both date sets.
pub fn merge_categories(
    target: &mut SeriesStore,
    aggregates: BTreeMap<String, Entity>,
    dates: &[SnapshotDate],
) {
    for date in dates {
        target.register_date(date);
    }

    for (name, aggregate) in aggregates {
        match target.entities.get_mut(&name) {
            Some(entity) => {
                for (category, series) in aggregate.series {
                    if entity.series.contains_key(&category) {
                        debug!(entity = %name, %category, "category already present, kept");
                        continue;
                    }
                    entity.series.insert(category, series);
                }
            }
            None => {
                info!(entity = %name, "aggregate has no matching entity, added");
                target.entities.insert(name, aggregate);
            }
        }
    }
}
