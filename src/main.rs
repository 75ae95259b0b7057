use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use batch_geocode::{init_tracing, run, AppConfig, ConfigOverrides};

#[derive(Parser)]
#[command(name = "batch-geocode")]
#[command(about = "Enriches tabular business records with the best-matching geocoded place")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Input file
    #[arg(long, short = 'i')]
    input_file: Option<PathBuf>,

    /// Output file
    #[arg(long, short = 'o')]
    output_file: Option<PathBuf>,

    /// Geocoder API key
    #[arg(long, short = 'k')]
    api_key: Option<String>,

    /// Decimal places coordinates are rounded to
    #[arg(long)]
    lat_lng_scale: Option<u32>,

    /// Delay in seconds after every provider call
    #[arg(long)]
    sleep: Option<f64>,

    /// Delay in seconds after every record
    #[arg(long)]
    line_sleep: Option<f64>,

    /// Prior-run status to skip on resume. Repeatable.
    #[arg(long, value_name = "STATUS")]
    skip_status: Vec<String>,

    /// Drop skipped rows from the output instead of passing them through
    #[arg(long)]
    exclude_skipped: bool,

    /// Place type that earns the place-type bonus. Repeatable.
    #[arg(long, value_name = "TYPE")]
    limit_place_type: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        input_file: cli.input_file,
        output_file: cli.output_file,
        geocoder_api_key: cli.api_key,
        lat_lng_scale: cli.lat_lng_scale,
        sleep: cli.sleep,
        line_sleep: cli.line_sleep,
        skip_status: (!cli.skip_status.is_empty()).then_some(cli.skip_status),
        exclude_skipped: cli.exclude_skipped.then_some(true),
        limit_place_types: (!cli.limit_place_type.is_empty()).then_some(cli.limit_place_type),
    };

    let config = match AppConfig::load(&cli.config, overrides) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                resolved = summary.resolved,
                unresolved = summary.unresolved,
                failed = summary.failed,
                skipped = summary.skipped,
                written = summary.written,
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run aborted");
            ExitCode::FAILURE
        }
    }
}
