mod paths;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use url::Url;
use vldx_cli::fixture::Fixture;
use vldx_cli::OracleOverride;

/// Exit status for fixture and configuration errors.
const EXIT_FIXTURE_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "vldx")]
#[command(about = "Run form validation fixtures through the vldx validator", long_about = None)]
#[command(version)]
struct Cli {
    /// Log to stderr instead of the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attempt a submission of the form in a fixture
    Check {
        /// Path to the JSON fixture
        fixture: PathBuf,

        /// Use a fixed verification score
        #[arg(long, conflicts_with = "endpoint")]
        score: Option<f64>,

        /// Query this scoring service for the verification score
        #[arg(long, env = "VLDX_ENDPOINT")]
        endpoint: Option<Url>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    if verbose {
        if let Err(e) = TermLogger::init(
            LevelFilter::Debug,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ) {
            eprintln!("Failed to initialize logger: {e}");
        }
        return;
    }

    let log_file = match paths::ensure_log_file().and_then(File::create) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: {e}");
            return;
        }
    };
    if let Err(e) = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file) {
        eprintln!("Failed to initialize logger: {e}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            fixture,
            score,
            endpoint,
            json,
        } => {
            let loaded = match Fixture::load(&fixture) {
                Ok(loaded) => loaded,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(EXIT_FIXTURE_ERROR);
                }
            };

            let report = match vldx_cli::check(&loaded, OracleOverride { score, endpoint }).await {
                Ok(report) => report,
                Err(e) => {
                    log::error!("{}: {e}", fixture.display());
                    eprintln!("Error: {e}");
                    return ExitCode::from(EXIT_FIXTURE_ERROR);
                }
            };

            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{out}"),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        return ExitCode::from(EXIT_FIXTURE_ERROR);
                    }
                }
            } else {
                println!("{}", report.to_text());
            }

            ExitCode::from(report.exit_code())
        }
    }
}
