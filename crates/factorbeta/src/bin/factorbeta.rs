//! Factor beta estimation CLI.
//!
//! Usage: `factorbeta estimate --definitions F --observations F --securities F --prices-dir D`
//!        `factorbeta calibrate-lag --definitions F --observations F --prices-dir D [--dry-run]`

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use factorbeta::{
    io::{
        CsvFactorDefinitions, CsvFactorObservations, CsvPriceSource, MemoryEstimateStore,
        PriceSourceConfig, read_securities, write_csv, write_estimates,
    },
    model::{BatchRunner, LagCalibration, RunConfig, calibrate_lags},
    primitives::{BetaEstimate, FactorCode, FactorDefinition},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(Parser)]
#[command(name = "factorbeta")]
#[command(about = "Overlap-aware factor beta estimation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate single- and multi-factor betas for every security
    Estimate {
        #[command(flatten)]
        common: CommonArgs,

        /// Security master CSV (security_code, security_name, price_symbol)
        #[arg(long)]
        securities: PathBuf,

        /// Where to write the run report (stdout when absent)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Where to write the estimates
        #[arg(long)]
        estimates_out: Option<PathBuf>,

        /// Override the trailing window
        #[arg(long)]
        window_days: Option<usize>,

        /// Override the minimum overlap
        #[arg(long)]
        min_nobs: Option<usize>,
    },

    /// Pick the best lag of each daily factor against its reference security
    CalibrateLag {
        #[command(flatten)]
        common: CommonArgs,

        /// Only calibrate these factors
        #[arg(long, value_delimiter = ',')]
        factor_codes: Vec<String>,

        /// Report the best lags without writing them back
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Factor metadata CSV
    #[arg(long)]
    definitions: PathBuf,

    /// Factor observations CSV (factor_code, date, value)
    #[arg(long)]
    observations: PathBuf,

    /// Directory of `<symbol>.csv` price files
    #[arg(long)]
    prices_dir: PathBuf,

    /// TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Last date of the run (today when absent)
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl CommonArgs {
    fn load_config(&self) -> Result<RunConfig, Box<dyn std::error::Error>> {
        Ok(match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        })
    }

    fn end(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| Local::now().date_naive())
    }

    fn price_source(&self, config: &RunConfig) -> CsvPriceSource {
        let min_prices = config.engine.min_nobs + 5;
        CsvPriceSource::with_config(&self.prices_dir, PriceSourceConfig { min_prices })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate { common, securities, report, estimates_out, window_days, min_nobs } => {
            let mut config = common.load_config()?;
            if let Some(window_days) = window_days {
                config.engine.window_days = window_days;
            }
            if let Some(min_nobs) = min_nobs {
                config.engine.min_nobs = min_nobs;
            }
            estimate(&common, &config, &securities, report.as_deref(), estimates_out.as_deref())
        }
        Commands::CalibrateLag { common, factor_codes, dry_run } => {
            let config = common.load_config()?;
            calibrate(&common, &config, &factor_codes, dry_run)
        }
    }
}

fn estimate(
    common: &CommonArgs,
    config: &RunConfig,
    securities: &Path,
    report_path: Option<&Path>,
    estimates_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = BatchRunner::new(config.clone())?;
    let (definitions, rejected) = CsvFactorDefinitions::from_path(&common.definitions)?.partition();
    let securities = read_securities(securities)?;
    let factors = CsvFactorObservations::from_path(&common.observations)?;
    let prices = common.price_source(config);
    let end = common.end();

    info!(%end, factors = definitions.len(), securities = securities.len(), "starting run");
    let output =
        runner.run_with_rejected(&definitions, &rejected, &securities, &factors, &prices, end)?;

    for exclusion in &output.exclusions {
        info!(factor = %exclusion.code, reason = %exclusion.reason, "factor excluded");
    }

    let mut store = MemoryEstimateStore::new();
    runner.persist(&output.estimates, &mut store)?;
    let stored: Vec<BetaEstimate> = store.estimates().cloned().collect();

    if let Some(path) = estimates_path {
        write_estimates(File::create(path)?, &stored)?;
        info!(path = %path.display(), rows = stored.len(), "estimates written");
    }
    match report_path {
        Some(path) => write_csv(File::create(path)?, &output.report)?,
        None => write_csv(io::stdout().lock(), &output.report)?,
    }

    let summary = output.summary();
    eprintln!(
        "OK={} SKIP={} FAIL={} estimates={}",
        summary.ok,
        summary.skip,
        summary.fail,
        stored.len()
    );
    Ok(())
}

fn calibrate(
    common: &CommonArgs,
    config: &RunConfig,
    factor_codes: &[String],
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let mut metadata = CsvFactorDefinitions::from_path(&common.definitions)?;
    let wanted: Vec<FactorCode> = factor_codes.iter().map(|c| FactorCode::new(c.trim())).collect();
    let definitions: Vec<FactorDefinition> = metadata
        .definitions()
        .into_iter()
        .filter(|d| wanted.is_empty() || wanted.contains(&d.code))
        .collect();
    let factors = CsvFactorObservations::from_path(&common.observations)?;
    let prices = common.price_source(config);

    let calibrations =
        calibrate_lags(&definitions, &factors, &prices, &mut metadata, config, common.end(), dry_run)?;

    let mut out = io::stdout().lock();
    for calibration in &calibrations {
        writeln!(out, "{}", describe(calibration))?;
    }
    Ok(())
}

fn describe(calibration: &LagCalibration) -> String {
    let head = format!("{} vs {}", calibration.factor_code, calibration.reference);
    match (&calibration.best, &calibration.reason) {
        (Some(best), _) => format!(
            "{head}: lag={} r2={:.4} beta={:.4} n={}{}",
            best.lag,
            best.r_squared,
            best.beta,
            best.n_obs,
            if calibration.written { " (written)" } else { "" }
        ),
        (None, Some(reason)) => format!("{head}: {reason}"),
        (None, None) => format!("{head}: no result"),
    }
}
