//! Shaping of series stores into export tables and interchange documents.
//!
//! Tables are the flat per-category view written as CSV and workbook sheets;
//! the combined document is the nested JSON view of a whole store.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{Category, Count, SeriesStore};

/// Header of the first column of every category table.
pub const DATE_COLUMN: &str = "date";
/// Key of the date list in combined documents.
pub const DATES_KEY: &str = "dates";

/// A flat table for one category: one row per date, one column per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    /// File and sheet prefix, e.g. `cases`.
    pub prefix: String,
    pub category: Category,
    /// `date` followed by entity names.
    pub columns: Vec<String>,
    /// Date followed by one value per entity.
    pub rows: Vec<(String, Vec<Count>)>,
}

impl CategoryTable {
    /// Name of the table without extension, spaces replaced by underscores.
    pub fn stem(&self) -> String {
        format!("{}_{}", self.prefix, self.category.as_str()).replace(' ', "_")
    }

    /// CSV file name of the table.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.stem())
    }
}

/// Builds one table per category present in the store.
///
/// Only entities that report the category become columns. A date an entity
/// did not report is filled with 0 here and nowhere else.
pub fn category_tables(prefix: &str, store: &SeriesStore) -> Vec<CategoryTable> {
    store
        .categories()
        .into_iter()
        .map(|category| {
            let members: Vec<_> = store
                .entities
                .values()
                .filter_map(|entity| entity.series.get(&category).map(|series| (entity, series)))
                .collect();

            let mut columns = Vec::with_capacity(members.len() + 1);
            columns.push(DATE_COLUMN.to_string());
            columns.extend(members.iter().map(|(entity, _)| entity.name.clone()));

            let rows = store
                .dates
                .iter()
                .map(|date| {
                    let values = members
                        .iter()
                        .map(|(_, series)| series.get(date).copied().unwrap_or(0))
                        .collect();
                    (date.to_string(), values)
                })
                .collect();

            CategoryTable {
                prefix: prefix.to_string(),
                category,
                columns,
                rows,
            }
        })
        .collect()
}

/// Builds the combined interchange document
/// `{ key: { entity: { category: { date: value } } }, "dates": [...] }`.
///
/// Every object is backed by a sorted map, so serializing the same store
/// always yields the same bytes.
pub fn combined_document(key: &str, store: &SeriesStore) -> Result<Value> {
    let entities: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, Count>>> = store
        .entities
        .values()
        .map(|entity| {
            let categories = entity
                .series
                .iter()
                .map(|(category, series)| {
                    let values = series
                        .iter()
                        .map(|(date, value)| (date.as_str(), *value))
                        .collect();
                    (category.as_str(), values)
                })
                .collect();
            (entity.name.as_str(), categories)
        })
        .collect();

    let mut root = Map::new();
    root.insert(key.to_string(), serde_json::to_value(entities)?);
    root.insert(DATES_KEY.to_string(), serde_json::to_value(&store.dates)?);
    Ok(Value::Object(root))
}
