use link_validator_lib::{checker, input_loader, logger, processor};
use link_validator_lib::config::{DEFAULT_DELAY_MS, DEFAULT_TIMEOUT_SECS};
use link_validator_lib::delay_manager::Throttle;
use link_validator_lib::{HttpConfig, LinkResearcher, UrlValidator};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use clap::{Args, Parser, Subcommand};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log every request and decision
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate links and repair broken ones from each tool's homepage
    Research(RunArgs),
    /// Only report link status, writing an annotated copy of the input
    Check(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input CSV file
    input: PathBuf,

    /// First line to process (1-indexed, header excluded)
    #[arg(default_value_t = 1)]
    start: usize,

    /// Last line to process, inclusive (default: end of file)
    end: Option<usize>,

    /// Output CSV path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for the validation logs (default: next to the output)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Pause between requests
    #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
    delay_ms: u64,

    /// Per-request timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Field delimiter of input and output
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Send this user agent instead of rotating through browser ones
    #[arg(long)]
    user_agent: Option<String>,

    /// Ignore proxy settings from the environment
    #[arg(long)]
    no_proxy: bool,
}

impl RunArgs {
    fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            delay: Duration::from_millis(self.delay_ms),
            user_agent: self.user_agent.clone(),
            system_proxy: !self.no_proxy,
        }
    }

    fn delimiter(&self) -> Result<u8, Box<dyn Error>> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| format!("delimiter {:?} is not a single ASCII character", self.delimiter).into())
    }

    fn output_path(&self, suffix: &str) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            self.input.with_file_name(format!("{}_{}.csv", stem, suffix))
        })
    }
}

fn research(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let delimiter = args.delimiter()?;
    let records = input_loader::load_records(&args.input, delimiter)?;
    let output_csv = args.output_path("VALIDATED");

    info!("Starting validation of {:?}", args.input);
    let mut researcher = LinkResearcher::from_config(&args.http_config())?;
    let (rows, log) = processor::run(&mut researcher, &records, args.start, args.end)?;

    input_loader::write_records(&output_csv, &rows, delimiter)?;
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| output_csv.parent().map(Path::to_path_buf).unwrap_or_default());
    let (json_log, _) = log.save(&log_dir)?;

    let summary = log.summary();
    info!("Processing complete. Processed: {}, changed: {}", summary.total_processed, summary.total_changed);
    info!("Output CSV: {:?}", output_csv);
    info!("Results log: {:?}", json_log);
    Ok(())
}

fn check(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let delimiter = args.delimiter()?;
    let records = input_loader::load_records(&args.input, delimiter)?;
    let output_csv = args.output_path("CHECKED");
    let config = args.http_config();

    let probe = UrlValidator::new(config.clone())?;
    let mut throttle = Throttle::new(config.delay);
    let report = checker::check_rows(&probe, &mut throttle, &records, args.start, args.end)?;

    input_loader::write_records(&output_csv, &report.rows, delimiter)?;
    info!("Checked {} rows, {} failing links. Output: {:?}", report.checked, report.failing_links, output_csv);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match &cli.command {
        Command::Research(args) => research(args),
        Command::Check(args) => check(args),
    }
}
