//! End-to-end orchestration of a run.
//!
//! Stages run in a fixed order and each one only writes its outputs after its
//! checks have passed, so a fatal error never leaves a half-written stage:
//!
//! 1. places: build, add region total, check, export `cases.*`
//! 2. hospitals: build, add region total, check, reconcile, require complete
//!    series, export `hospitals.*`
//! 3. provinces: places merged with hospital totals, export `provinces.*`
//! 4. hospital info rewritten if reconciliation added entries

use std::fs;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::aggregate::{self, ProvinceTotals};
use crate::canonical::Canonicalizer;
use crate::check::{self, CheckReport};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::io::snapshot::{self, SnapshotFamily};
use crate::io::{csv_write, excel_write, json, reference};
use crate::model::{HospitalInfoTable, SeriesStore};
use crate::reconcile::{self, DecisionProvider, ReconcileOutcome};
use crate::series;
use crate::tables;

/// Document key of each exported store.
pub const PLACES_KEY: &str = "places";
pub const HOSPITALS_KEY: &str = "hospitals";
pub const PROVINCES_KEY: &str = "provinces";

/// What a completed run found and wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub places: CheckReport,
    /// Hospital findings after reconciliation.
    pub hospitals: CheckReport,
    pub reconciliation: ReconcileOutcome,
    /// Hospitals left out of the province totals.
    pub ungrouped_hospitals: Vec<String>,
    pub written: Vec<PathBuf>,
}

/// Runs the whole pipeline described by `config`.
#[instrument(
    level = "info",
    skip_all,
    fields(base_dir = %config.base_dir.display())
)]
pub fn run(config: &PipelineConfig, provider: &mut dyn DecisionProvider) -> Result<RunSummary> {
    let exceptions = reference::load_exceptions(&config.exceptions)?;
    let mut hospital_info = reference::load_hospital_info(&config.hospital_info)?;
    let mut canonicalizer = Canonicalizer::new(exceptions);
    let mut summary = RunSummary::default();

    let places = build_store(config, SnapshotFamily::Cases, &mut canonicalizer)?;
    summary.places = check::check_places(&places, config.expected_places)?;
    summary
        .written
        .extend(export_store(config, PLACES_KEY, SnapshotFamily::Cases.prefix(), &places)?);

    let hospitals = build_store(config, SnapshotFamily::Hospitals, &mut canonicalizer)?;
    let (hospital_report, outcome) =
        check_and_reconcile(config, &hospitals, &mut hospital_info, provider)?;
    summary.hospitals = hospital_report;
    summary.reconciliation = outcome;
    summary.written.extend(export_store(
        config,
        HOSPITALS_KEY,
        SnapshotFamily::Hospitals.prefix(),
        &hospitals,
    )?);

    let (provinces, ungrouped) = province_view(&places, &hospitals, &hospital_info, &config.region);
    summary.ungrouped_hospitals = ungrouped;
    summary
        .written
        .extend(export_store(config, PROVINCES_KEY, PROVINCES_KEY, &provinces)?);

    if summary.reconciliation.changed_reference() {
        reference::save_hospital_info(&config.hospital_info, &hospital_info)?;
        info!(
            added = summary.reconciliation.added.len(),
            path = %config.hospital_info.display(),
            "hospital info updated"
        );
        summary.written.push(config.hospital_info.clone());
    }

    info!(files = summary.written.len(), "run complete");
    Ok(summary)
}

/// Discovers, reads and accumulates one snapshot family, then adds the
/// region total.
pub fn build_store(
    config: &PipelineConfig,
    family: SnapshotFamily,
    canonicalizer: &mut Canonicalizer,
) -> Result<SeriesStore> {
    let files = snapshot::discover(&config.base_dir, family)?;
    let snapshots = snapshot::read_all(&files)?;
    let mut store = series::build_series(family.kind(), &snapshots, canonicalizer)?;

    let total = aggregate::region_total(&store, &config.region);
    aggregate::add_synthetic(&mut store, total)?;
    Ok(store)
}

/// Checks hospitals against the reference info and, when names are missing
/// from it, asks `provider` what to do. The returned report reflects the
/// reference after reconciliation.
///
/// Declined names stay as findings. A series missing a date is fatal once
/// reconciliation is over.
pub fn check_and_reconcile(
    config: &PipelineConfig,
    hospitals: &SeriesStore,
    hospital_info: &mut HospitalInfoTable,
    provider: &mut dyn DecisionProvider,
) -> Result<(CheckReport, ReconcileOutcome)> {
    let report = check::check_hospitals(hospitals, hospital_info);
    let unresolved = reconcile::unresolved_hospitals(hospitals, hospital_info, config.candidates);

    let (report, outcome) = if unresolved.is_empty() {
        (report, ReconcileOutcome::default())
    } else {
        let outcome = reconcile::reconcile(&unresolved, hospital_info, provider)?;
        let report = if outcome.changed_reference() {
            check::check_hospitals(hospitals, hospital_info)
        } else {
            report
        };
        if !outcome.skipped.is_empty() {
            warn!(
                skipped = outcome.skipped.len(),
                "hospital reference still incomplete, continuing"
            );
        }
        (report, outcome)
    };

    check::require_complete_series(hospitals)?;
    Ok((report, outcome))
}

/// Places with the hospital categories of their province merged in, plus the
/// hospital region total merged into the region entity.
pub fn province_view(
    places: &SeriesStore,
    hospitals: &SeriesStore,
    hospital_info: &HospitalInfoTable,
    region: &str,
) -> (SeriesStore, Vec<String>) {
    let ProvinceTotals {
        mut provinces,
        ungrouped,
    } = aggregate::province_totals(hospitals, hospital_info);
    provinces.insert(region.to_string(), aggregate::region_total(hospitals, region));

    let mut view = places.clone();
    aggregate::merge_categories(&mut view, provinces, &hospitals.dates);
    (view, ungrouped)
}

/// Writes the combined document and the category tables of one store.
pub fn export_store(
    config: &PipelineConfig,
    key: &str,
    prefix: &str,
    store: &SeriesStore,
) -> Result<Vec<PathBuf>> {
    let document = tables::combined_document(key, store)?;
    let category_tables = tables::category_tables(prefix, store);

    fs::create_dir_all(&config.json_dir)?;
    fs::create_dir_all(&config.csv_dir)?;

    let mut written = Vec::with_capacity(category_tables.len() + 2);
    let json_path = config.json_dir.join(format!("{prefix}.json"));
    json::write_document(&json_path, &document)?;
    written.push(json_path);

    for table in &category_tables {
        written.push(csv_write::write_table(&config.csv_dir, table)?);
    }

    if let Some(dir) = &config.workbook_dir {
        fs::create_dir_all(dir)?;
        let workbook_path = dir.join(format!("{prefix}.xlsx"));
        excel_write::write_workbook(&workbook_path, &category_tables)?;
        written.push(workbook_path);
    }

    info!(%key, tables = category_tables.len(), "store exported");
    Ok(written)
}
