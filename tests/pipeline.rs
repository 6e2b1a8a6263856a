mod common;

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{DataType, Reader, Xlsx, open_workbook};
use common::write_file;
use tempfile::{TempDir, tempdir};
use veneto_epi_tools::ToolError;
use veneto_epi_tools::config::PipelineConfig;
use veneto_epi_tools::io::reference;
use veneto_epi_tools::pipeline;
use veneto_epi_tools::reconcile::{AcceptAll, DeclineAll};

const EXCEPTIONS: &str = r#"{
    "places": {
        "Padova (escluso domiciliati Vo')": "Padova"
    },
    "hospitals": {
        "Ospedale Villa Salus": "Ospedale Villa Salus-Mestre"
    }
}"#;

const HOSPITAL_INFO: &str = r#"{
    "Ospedale Padova": {
        "short_name": "Padova",
        "city": "Padova",
        "province": "Padova",
        "coordinates": { "lat": 45.40, "lon": 11.88 }
    },
    "Ospedale Treviso": {
        "short_name": "Treviso",
        "city": "Treviso",
        "province": "Treviso"
    }
}"#;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().expect("temporary directory");
        let root = dir.path().to_path_buf();
        let raw = root.join("raw");

        write_file(
            &raw.join("2020-03-01"),
            "cases20200301.csv",
            "residenza,totale positivi\n\"Padova (escluso domiciliati Vo')\",10\nTreviso,3\n",
        );
        write_file(
            &raw.join("2020-03-02"),
            "cases20200302.csv",
            "residenza,totale positivi,isolamento\nPadova,15,7\nTreviso,4,2\n",
        );
        write_file(
            &raw.join("2020-03-01"),
            "hospitals20200301.csv",
            "struttura,non critici,terapia intensiva,dimessi,decessi\n\
             Ospedale di Treviso,5,1,0,0\n\
             Ospedale Padova °,8,2,1,0\n",
        );
        write_file(
            &raw.join("2020-03-02"),
            "hospitals20200302.csv",
            "struttura,non critici,terapia intensiva,dimessi,decessi\n\
             \"Ospedale  Treviso\",6,1,1,0\n\
             Ospedale Padova,9,3,2,1\n",
        );
        write_file(&raw, "notes.csv", "not,a,snapshot\n");
        write_file(&root, "exceptions.json", EXCEPTIONS);
        write_file(&root, "hospital_info.json", HOSPITAL_INFO);

        Self { _dir: dir, root }
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(
            self.root.join("raw"),
            self.root.join("json"),
            self.root.join("csv"),
            self.root.join("hospital_info.json"),
            self.root.join("exceptions.json"),
        );
        config.expected_places = 3;
        config
    }

    fn hospital_snapshot(&self, day: &str) -> PathBuf {
        self.root
            .join(format!("raw/2020-03-{day}"))
            .join(format!("hospitals202003{day}.csv"))
    }

    fn add_hospital_row(&self, day: &str, row: &str) {
        let path = self.hospital_snapshot(day);
        let mut content = fs::read_to_string(&path).expect("snapshot read");
        content.push_str(row);
        fs::write(&path, content).expect("snapshot rewritten");
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    let data = fs::read_to_string(path).expect("JSON output read");
    serde_json::from_str(&data).expect("JSON output parsed")
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("CSV output read")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn full_run_writes_every_dataset() {
    let fixture = Fixture::new();
    let config = fixture.config();

    let summary = pipeline::run(&config, &mut DeclineAll).expect("pipeline run");

    assert!(summary.places.is_clean());
    assert!(summary.hospitals.is_clean());
    assert!(summary.reconciliation.added.is_empty());
    assert!(summary.ungrouped_hospitals.is_empty());

    let cases = read_json(&config.json_dir.join("cases.json"));
    assert_eq!(cases["dates"], serde_json::json!(["20200301", "20200302"]));
    assert_eq!(
        cases["places"]["Padova"]["totale positivi"],
        serde_json::json!({"20200301": 10, "20200302": 15})
    );
    assert_eq!(
        cases["places"]["Veneto"]["totale positivi"],
        serde_json::json!({"20200301": 13, "20200302": 19})
    );
    assert_eq!(
        cases["places"]["Veneto"]["isolamento"],
        serde_json::json!({"20200302": 9})
    );

    let hospitals = read_json(&config.json_dir.join("hospitals.json"));
    let hospital_names: Vec<&String> = hospitals["hospitals"]
        .as_object()
        .expect("hospitals object")
        .keys()
        .collect();
    assert_eq!(
        hospital_names,
        vec!["Ospedale Padova", "Ospedale Treviso", "Veneto"]
    );
    assert_eq!(
        hospitals["hospitals"]["Ospedale Treviso"]["non critici"],
        serde_json::json!({"20200301": 5, "20200302": 6})
    );

    let provinces = read_json(&config.json_dir.join("provinces.json"));
    assert_eq!(
        provinces["provinces"]["Padova"]["totale positivi"]["20200302"],
        15
    );
    assert_eq!(
        provinces["provinces"]["Padova"]["terapia intensiva"],
        serde_json::json!({"20200301": 2, "20200302": 3})
    );
    assert_eq!(
        provinces["provinces"]["Veneto"]["dimessi"],
        serde_json::json!({"20200301": 1, "20200302": 3})
    );

    assert_eq!(
        read_lines(&config.csv_dir.join("cases_totale_positivi.csv")),
        vec![
            "date,Padova,Treviso,Veneto",
            "20200301,10,3,13",
            "20200302,15,4,19"
        ]
    );
    assert_eq!(
        read_lines(&config.csv_dir.join("cases_isolamento.csv")),
        vec!["date,Padova,Treviso,Veneto", "20200301,0,0,0", "20200302,7,2,9"]
    );
    assert_eq!(
        read_lines(&config.csv_dir.join("hospitals_terapia_intensiva.csv"))[0],
        "date,Ospedale Padova,Ospedale Treviso,Veneto"
    );
    assert!(config.csv_dir.join("provinces_non_critici.csv").exists());
}

#[test]
fn repeated_runs_produce_identical_documents() {
    let fixture = Fixture::new();
    let config = fixture.config();

    pipeline::run(&config, &mut DeclineAll).expect("first run");
    let first: Vec<Vec<u8>> = ["cases.json", "hospitals.json", "provinces.json"]
        .iter()
        .map(|name| fs::read(config.json_dir.join(name)).expect("first output read"))
        .collect();

    pipeline::run(&config, &mut DeclineAll).expect("second run");
    let second: Vec<Vec<u8>> = ["cases.json", "hospitals.json", "provinces.json"]
        .iter()
        .map(|name| fs::read(config.json_dir.join(name)).expect("second output read"))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn wrong_place_count_stops_before_any_export() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.expected_places = 11;

    let error = pipeline::run(&config, &mut DeclineAll).expect_err("count mismatch is fatal");

    assert!(matches!(
        error,
        ToolError::EntityCount {
            expected: 11,
            found: 3,
            ..
        }
    ));
    assert!(!config.json_dir.join("cases.json").exists());
    assert!(!config.csv_dir.exists());
}

#[test]
fn malformed_hospital_row_keeps_hospital_outputs_unwritten() {
    let fixture = Fixture::new();
    let config = fixture.config();
    fixture.add_hospital_row("02", "Ospedale Rovigo,tre,0,0,0\n");

    let error = pipeline::run(&config, &mut DeclineAll).expect_err("bad count is fatal");

    assert!(matches!(error, ToolError::InvalidNumber { ref value, .. } if value == "tre"));
    assert!(config.json_dir.join("cases.json").exists());
    assert!(!config.json_dir.join("hospitals.json").exists());
}

#[test]
fn declined_hospitals_are_reported_and_export_continues() {
    let fixture = Fixture::new();
    let config = fixture.config();
    fixture.add_hospital_row("01", "Ospedale Villa Salus,1,0,0,0\n");
    fixture.add_hospital_row("02", "Ospedale Villa Salus,2,0,0,0\n");
    let info_before = fs::read_to_string(&config.hospital_info).expect("info read");

    let summary = pipeline::run(&config, &mut DeclineAll).expect("pipeline run");

    assert_eq!(
        summary.reconciliation.skipped,
        vec!["Ospedale Villa Salus-Mestre".to_string()]
    );
    assert!(!summary.hospitals.is_clean());
    assert_eq!(
        summary.ungrouped_hospitals,
        vec!["Ospedale Villa Salus-Mestre".to_string()]
    );
    assert!(config.json_dir.join("hospitals.json").exists());
    assert_eq!(
        fs::read_to_string(&config.hospital_info).expect("info read"),
        info_before
    );
}

#[test]
fn hospital_missing_from_a_snapshot_stops_the_hospital_stage() {
    let fixture = Fixture::new();
    let config = fixture.config();
    fs::write(
        fixture.hospital_snapshot("02"),
        "struttura,non critici,terapia intensiva,dimessi,decessi\n\
         Ospedale Treviso,6,1,1,0\n",
    )
    .expect("snapshot rewritten");
    let info_before = fs::read_to_string(&config.hospital_info).expect("info read");

    let error = pipeline::run(&config, &mut AcceptAll).expect_err("missing date is fatal");

    match error {
        ToolError::SeriesLength {
            entity,
            expected,
            found,
            ..
        } => {
            assert_eq!(entity, "Ospedale Padova");
            assert_eq!(expected, 2);
            assert_eq!(found, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(config.json_dir.join("cases.json").exists());
    assert!(!config.json_dir.join("hospitals.json").exists());
    assert!(!config.json_dir.join("provinces.json").exists());
    assert_eq!(
        fs::read_to_string(&config.hospital_info).expect("info read"),
        info_before
    );
}

#[test]
fn late_hospital_is_fatal_even_when_added_to_the_reference() {
    let fixture = Fixture::new();
    let config = fixture.config();
    fixture.add_hospital_row("02", "Ospedale Villa Salus,2,0,0,0\n");

    let error = pipeline::run(&config, &mut AcceptAll).expect_err("missing date is fatal");

    assert!(matches!(
        error,
        ToolError::SeriesLength { ref entity, .. } if entity == "Ospedale Villa Salus-Mestre"
    ));
    assert!(!config.json_dir.join("hospitals.json").exists());
}

#[test]
fn accepted_hospitals_are_added_to_the_reference_file() {
    let fixture = Fixture::new();
    let config = fixture.config();
    fixture.add_hospital_row("01", "Ospedale Villa Salus,1,0,0,0\n");
    fixture.add_hospital_row("02", "Ospedale Villa Salus,2,0,0,0\n");

    let summary = pipeline::run(&config, &mut AcceptAll).expect("pipeline run");

    assert_eq!(
        summary.reconciliation.added,
        vec!["Ospedale Villa Salus-Mestre".to_string()]
    );
    assert!(summary.written.contains(&config.hospital_info));

    let info = reference::load_hospital_info(&config.hospital_info).expect("info reloaded");
    assert_eq!(info.len(), 3);
    assert_eq!(info["Ospedale Villa Salus-Mestre"].province, "");
    assert_eq!(info["Ospedale Padova"].province, "Padova");
    assert!(info["Ospedale Padova"].coordinates.is_some());
}

#[test]
fn workbook_holds_one_sheet_per_category() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.workbook_dir = Some(fixture.root.join("xlsx"));

    pipeline::run(&config, &mut DeclineAll).expect("pipeline run");

    let path = fixture.root.join("xlsx").join("cases.xlsx");
    let mut workbook: Xlsx<_> = open_workbook(&path).expect("workbook opened");
    assert_eq!(
        workbook.sheet_names().to_vec(),
        vec!["cases_isolamento", "cases_totale_positivi"]
    );

    let range = workbook
        .worksheet_range("cases_totale_positivi")
        .expect("sheet present")
        .expect("sheet read");
    assert_eq!(
        range.get_value((0, 1)),
        Some(&DataType::String("Padova".to_string()))
    );
    assert_eq!(range.get_value((2, 3)), Some(&DataType::Float(19.0)));
}

#[test]
fn missing_reference_file_is_reported() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.exceptions = fixture.root.join("absent.json");

    let error = pipeline::run(&config, &mut DeclineAll).expect_err("missing file is fatal");

    assert!(matches!(error, ToolError::MissingInput(ref path) if path == &config.exceptions));
}
