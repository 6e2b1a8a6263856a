//! Mapping of raw, inconsistently written labels onto canonical entity names.
//!
//! Resolution happens in two composable stages: the structural cleanup rules
//! implemented here, followed by a lookup in the [`ExceptionTable`] loaded from
//! disk. Rules are code, exceptions are data.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::{EntityKind, RawValue};

static FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[°^]").expect("footnote pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Kind-scoped lexical variants, rewritten until none is left.
const HOSPITAL_VARIANTS: &[(&str, &str)] = &[("Ospedale di ", "Ospedale ")];

fn lexical_variants(kind: EntityKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        EntityKind::Place => &[],
        EntityKind::Hospital => HOSPITAL_VARIANTS,
    }
}

/// Applies the structural cleanup rules to a raw label.
///
/// The result is a fixed point: cleaning it again returns it unchanged.
pub fn clean_label(kind: EntityKind, raw: &str) -> String {
    let label = raw.replace(['\n', '\r'], " ");
    let label = FOOTNOTE.replace_all(&label, "");
    let mut label = WHITESPACE.replace_all(&label, " ").into_owned();

    for (pattern, replacement) in lexical_variants(kind) {
        while label.contains(pattern) {
            label = label.replace(pattern, replacement);
        }
    }

    WHITESPACE.replace_all(label.trim(), " ").into_owned()
}

/// Raw observed label → canonical label, scoped by entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionTable {
    pub places: BTreeMap<String, String>,
    pub hospitals: BTreeMap<String, String>,
}

impl ExceptionTable {
    /// The mappings that apply to `kind`.
    pub fn scope(&self, kind: EntityKind) -> &BTreeMap<String, String> {
        match kind {
            EntityKind::Place => &self.places,
            EntityKind::Hospital => &self.hospitals,
        }
    }

    /// Looks up an already cleaned label.
    pub fn lookup(&self, kind: EntityKind, cleaned: &str) -> Option<&str> {
        self.scope(kind).get(cleaned).map(String::as_str)
    }

    /// Keys are matched against cleaned labels, so they must be clean
    /// themselves. Every target must be a clean label and must not be remapped
    /// itself, otherwise canonicalizing a canonical name could change it.
    pub fn validate(&self) -> Result<()> {
        for kind in [EntityKind::Place, EntityKind::Hospital] {
            let scope = self.scope(kind);
            for (raw, target) in scope {
                let cleaned = clean_label(kind, raw);
                if cleaned != *raw {
                    return Err(ToolError::InvalidExceptionTable(format!(
                        "{kind} key '{raw}' can never match, labels are looked up as '{cleaned}'"
                    )));
                }
                if clean_label(kind, target) != *target {
                    return Err(ToolError::InvalidExceptionTable(format!(
                        "{kind} target '{target}' for '{raw}' is not a clean label"
                    )));
                }
                if scope.contains_key(target) {
                    return Err(ToolError::InvalidExceptionTable(format!(
                        "{kind} target '{target}' for '{raw}' is itself remapped"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A resolved label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    pub name: String,
    /// True the first time this name is produced for its kind.
    pub is_new: bool,
}

/// Stateful resolver used for the duration of a single run.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    exceptions: ExceptionTable,
    seen: BTreeMap<EntityKind, BTreeSet<String>>,
}

impl Canonicalizer {
    /// Resolver with an empty set of seen names.
    pub fn new(exceptions: ExceptionTable) -> Self {
        Self {
            exceptions,
            seen: BTreeMap::new(),
        }
    }

    /// Resolves a label without recording it as seen.
    pub fn resolve(&self, kind: EntityKind, label: &str) -> String {
        let cleaned = clean_label(kind, label);
        match self.exceptions.lookup(kind, &cleaned) {
            Some(mapped) => mapped.to_string(),
            None => cleaned,
        }
    }

    /// Resolves the identity cell of a row.
    ///
    /// Anything other than text is rejected: a row that cannot be identified
    /// cannot be aggregated.
    pub fn canonicalize(
        &mut self,
        kind: EntityKind,
        value: &RawValue,
        location: &RowLocation<'_>,
    ) -> Result<Canonical> {
        let RawValue::Text(label) = value else {
            return Err(ToolError::MalformedRow {
                file: location.file.to_path_buf(),
                line: location.line,
                column: location.column.to_string(),
                found: value.describe(),
            });
        };

        let name = self.resolve(kind, label);
        let is_new = self.seen.entry(kind).or_default().insert(name.clone());
        if is_new {
            debug!(%kind, raw = %label, canonical = %name, "new entity");
        }
        Ok(Canonical { name, is_new })
    }
}

/// Where a cell came from, for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct RowLocation<'a> {
    pub file: &'a Path,
    pub line: usize,
    pub column: &'a str,
}
