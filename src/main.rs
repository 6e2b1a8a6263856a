use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use veneto_epi_tools::config::{
    DEFAULT_CANDIDATES, DEFAULT_EXPECTED_PLACES, DEFAULT_REGION, PipelineConfig,
};
use veneto_epi_tools::pipeline;
use veneto_epi_tools::reconcile::{DeclineAll, PromptDecider};
use veneto_epi_tools::{Result, ToolError};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;

    let assume_no = cli.assume_no;
    let config = cli.into_config();
    let summary = if assume_no {
        pipeline::run(&config, &mut DeclineAll)?
    } else {
        let mut prompt = PromptDecider::new(BufReader::new(io::stdin()), io::stderr());
        pipeline::run(&config, &mut prompt)?
    };

    for name in &summary.reconciliation.skipped {
        eprintln!("warning: {name} is still missing from the hospital info");
    }
    println!("wrote {} files", summary.written.len());
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Build case and hospital time series from daily CSV snapshots."
)]
struct Cli {
    /// Folder searched recursively for casesYYYYMMDD.csv and hospitalsYYYYMMDD.csv.
    #[arg(long)]
    base_dir: PathBuf,

    /// Output folder for the combined JSON documents.
    #[arg(long)]
    json_dir: PathBuf,

    /// Output folder for the per-category CSV tables.
    #[arg(long)]
    csv_dir: PathBuf,

    /// Hospital info JSON file. Rewritten when new hospitals are accepted.
    #[arg(long)]
    hospital_info: PathBuf,

    /// Exception table JSON file mapping raw labels to canonical names.
    #[arg(long)]
    exceptions: PathBuf,

    /// Optional output folder for one Excel workbook per dataset.
    #[arg(long)]
    workbook_dir: Option<PathBuf>,

    /// Number of place entities expected, region total included.
    #[arg(long, default_value_t = DEFAULT_EXPECTED_PLACES)]
    expected_places: usize,

    /// Name of the region-wide aggregate.
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Similar names shown for each unknown hospital.
    #[arg(long, default_value_t = DEFAULT_CANDIDATES)]
    candidates: usize,

    /// Do not prompt; leave unknown hospitals out of the hospital info.
    #[arg(long)]
    assume_no: bool,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(
            self.base_dir,
            self.json_dir,
            self.csv_dir,
            self.hospital_info,
            self.exceptions,
        );
        config.workbook_dir = self.workbook_dir;
        config.expected_places = self.expected_places;
        config.region = self.region;
        config.candidates = self.candidates;
        config
    }
}
