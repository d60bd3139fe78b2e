use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::{debug, warn};

use kira_assembly_fetch::app::Fetcher;
use kira_assembly_fetch::config::{ConfigLoader, ConfigOverrides};
use kira_assembly_fetch::domain::AssemblyFormat;
use kira_assembly_fetch::error::KiraError;
use kira_assembly_fetch::interrupt::Interrupt;
use kira_assembly_fetch::logging;
use kira_assembly_fetch::output::{OutputMode, RunReport, report_summary};
use kira_assembly_fetch::remote::AnonymousClient;
use kira_assembly_fetch::store::OutputDir;

const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "kira-fetch")]
#[command(about = "Fetch NCBI genome assembly files and verify their MD5 checksums")]
#[command(version, author)]
struct Cli {
    /// File with one assembly directory URL per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Assembly files to fetch
    #[arg(short, long, num_args = 1.., value_enum)]
    format: Vec<AssemblyFormat>,

    /// Existing directory that receives the files
    #[arg(short, long)]
    output_dir: Option<Utf8PathBuf>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::Cancelled => EXIT_CANCELLED,
        KiraError::MissingInput
        | KiraError::MissingOutputDir
        | KiraError::OutputDir(_)
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::InputRead(_)
        | KiraError::InvalidFormat(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Log
    };

    let overrides = ConfigOverrides {
        input: cli.input,
        formats: cli.format,
        output_dir: cli.output_dir,
        timeout_secs: cli.timeout,
    };
    let resolved = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    debug!(
        schema_version = resolved.schema_version,
        assemblies = resolved.urls.len(),
        "configuration resolved"
    );

    let output = OutputDir::open(resolved.output_dir.clone())?;
    let client = AnonymousClient::new(resolved.timeout)?;
    let interrupt = install_interrupt_handler()?;

    let started_at = Utc::now();
    let fetcher = Fetcher::new(client, output, interrupt);
    let summary = fetcher
        .fetch_all(&resolved.urls, &resolved.formats)
        .map_err(KiraError::from)?;

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        output_dir: resolved.output_dir.to_string(),
        assemblies: resolved.urls.len(),
        formats: resolved.formats.clone(),
        summary,
    };
    report_summary(output_mode, &report, std::io::stdout()).into_diagnostic()?;
    Ok(())
}

/// First Ctrl-C aborts the transfer in flight and stops the run; a second one
/// exits right away.
fn install_interrupt_handler() -> Result<Interrupt, KiraError> {
    let interrupt = Interrupt::new();
    let handle = interrupt.clone();
    ctrlc::set_handler(move || {
        if handle.is_requested() {
            std::process::exit(i32::from(EXIT_CANCELLED));
        }
        warn!("Interrupt received, stopping the current transfer");
        handle.request();
    })
    .map_err(|err| KiraError::InterruptHandler(err.to_string()))?;
    Ok(interrupt)
}
