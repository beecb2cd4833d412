// daystar entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Load .env (base dir, or the nearest one above the current directory)
// 3. Initialize tracing (stderr, or a log file with --log-file)
// 4. Load config (only for commands that need it)
// 5. Run the command and print its results to stdout

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use daystar_app::config::{self, Config};
use daystar_app::credentials;
use daystar_app::{commands, pipeline};
use daystar_core::MeasurementModel;
use daystar_sheets::source::{CsvFileSource, GoogleSheetsClient, SheetSource};
use tracing::{debug, info};

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a tab from the spreadsheet and save it as CSV
    Fetch {
        /// Tab to read (defaults to sheets.default_tab)
        #[arg(short, long)]
        tab: Option<String>,
    },
    /// Score every action row of a tab and save the results as CSV
    Score {
        /// Tab to read (defaults to sheets.default_tab)
        #[arg(short, long)]
        tab: Option<String>,

        /// Score a local CSV export instead of the live spreadsheet
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Score a single measurement
    Rate {
        /// Measurement model: exact or range
        #[arg(short, long)]
        model: MeasurementModel,

        #[arg(long, allow_hyphen_values = true)]
        actual: i64,

        #[arg(long, allow_hyphen_values = true)]
        target: i64,

        /// Upper limit for the range model's bonus region
        #[arg(long, allow_hyphen_values = true)]
        upper_limit: Option<i64>,
    },
    /// Validate a star value and print it clamped to 0..=10
    Stars {
        /// Integer or integer string
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Show the loaded config and which credentials would be used
    Check,
}

#[derive(Parser, Debug)]
#[command(name = "daystar")]
#[command(about = "Daily action star scoring over Google Sheets", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding config/ and defaults/ (defaults to the current directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = cli.base_dir.as_deref();

    // Before tracing, so RUST_LOG may come from .env.
    let dotenv = credentials::load_dotenv(base_dir).context("failed to load .env")?;
    init_tracing(cli.verbose, cli.log_file.as_deref())?;
    debug!(?cli, "parsed command line");
    if let Some(path) = &dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    match cli.command {
        Commands::Fetch { tab } => run_fetch(base_dir, tab).await,
        Commands::Score { tab, input } => run_score(base_dir, tab, input).await,
        Commands::Rate {
            model,
            actual,
            target,
            upper_limit,
        } => run_rate(model, actual, target, upper_limit),
        Commands::Stars { value } => run_stars(value),
        Commands::Check => run_check(base_dir, dotenv.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_fetch(base_dir: Option<&Path>, tab: Option<String>) -> anyhow::Result<()> {
    let config = load_config(base_dir)?;
    let tab = tab.unwrap_or_else(|| config.sheets.default_tab.clone());
    let client = sheets_client(&config).await?;

    println!("Reading tab: {tab}");
    let outcome = pipeline::fetch_tab(&client, &tab, &config.export_dir()).await?;

    println!("Rows read: {}", outcome.table.len());
    match outcome.table.first_record() {
        Some(record) => println!("First row: {}", serde_json::to_string(&record)?),
        None => println!("No data found in this tab."),
    }
    println!("Saved to: {}", outcome.path.display());
    Ok(())
}

async fn run_score(
    base_dir: Option<&Path>,
    tab: Option<String>,
    input: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(base_dir)?;

    let (source, tab): (Box<dyn SheetSource>, String) = match input {
        Some(path) => {
            let tab = tab
                .or_else(|| {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                })
                .unwrap_or_else(|| config.sheets.default_tab.clone());
            info!(path = %path.display(), "scoring local CSV");
            (Box::new(CsvFileSource::file(path)), tab)
        }
        None => {
            let tab = tab.unwrap_or_else(|| config.sheets.default_tab.clone());
            (Box::new(sheets_client(&config).await?), tab)
        }
    };

    let outcome =
        pipeline::score_tab(source.as_ref(), &tab, &config.columns, &config.export_dir()).await?;

    for scored in &outcome.scored {
        let row = &scored.row;
        let date = row
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "row {:>4}  {date:<10}  {:<24} {:<5} {:>2} stars",
            row.row_number,
            row.action,
            row.measurement.model,
            scored.stars
        );
    }
    for skipped in &outcome.skipped {
        println!("row {:>4}  skipped: {}", skipped.row_number, skipped.reason);
    }
    println!(
        "Scored {} rows ({} skipped), {} stars total",
        outcome.scored.len(),
        outcome.skipped.len(),
        outcome.total_stars()
    );
    println!("Saved to: {}", outcome.path.display());
    Ok(())
}

fn run_rate(
    model: MeasurementModel,
    actual: i64,
    target: i64,
    upper_limit: Option<i64>,
) -> anyhow::Result<()> {
    let stars = commands::rate(model, actual, target, upper_limit)
        .with_context(|| format!("cannot score {model} measurement"))?;
    println!("{stars}");
    Ok(())
}

fn run_stars(value: String) -> anyhow::Result<()> {
    println!("{}", commands::stars(&value)?);
    Ok(())
}

fn run_check(base_dir: Option<&Path>, dotenv: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(base_dir)?;
    for line in commands::check_report(&config, dotenv, |name| std::env::var(name).ok()) {
        println!("{line}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(base_dir: Option<&Path>) -> anyhow::Result<Config> {
    let config = config::load_config(base_dir).context("failed to load configuration")?;
    info!(
        spreadsheet = %config.sheets.spreadsheet_id,
        tab = %config.sheets.default_tab,
        "config loaded"
    );
    Ok(config)
}

async fn sheets_client(config: &Config) -> anyhow::Result<GoogleSheetsClient> {
    let resolved = credentials::resolve_auth(&config.credentials)?;
    info!(
        auth = resolved.credential.kind(),
        source = %resolved.source,
        "using Google Sheets credentials"
    );
    let auth = resolved
        .into_sheets_auth()
        .await
        .context("failed to obtain Google Sheets access token")?;
    Ok(
        GoogleSheetsClient::new(config.sheets.spreadsheet_id.clone(), auth)
            .with_base_url(config.sheets.api_base_url.clone()),
    )
}

/// Initialize tracing. Logs go to stderr so stdout stays clean for results,
/// or to `log_file` when one is given. `RUST_LOG` overrides the filter.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "daystar={level},daystar_app={level},daystar_sheets={level},daystar_core={level},warn"
        ))
    });

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(verbose);

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let subscriber = builder
                .with_writer(file)
                .with_ansi(false)
                .with_line_number(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}
