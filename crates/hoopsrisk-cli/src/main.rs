// hoopsrisk entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout stays machine-readable)
// 2. Load config, copying shipped defaults on first run
// 3. Load the seasons CSV
// 4. Run the pipeline for one player, or score every player in the file
// 5. Write JSON or CSV to stdout

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Datelike;
use clap::Parser;
use hoopsrisk::config;
use hoopsrisk::csv_provider::CsvStatsProvider;
use hoopsrisk::report::{self, OutputFormat};
use hoopsrisk_core::features::RollingWeighting;
use hoopsrisk_core::{Pipeline, PipelineOptions};
use tracing::info;

#[derive(Parser)]
#[command(name = "hoopsrisk")]
#[command(about = "Career risk scores from NBA season statistics")]
#[command(version)]
struct Cli {
    /// Roster name or player id. Omit to score every player in the file
    #[arg(short, long)]
    player: Option<String>,

    /// Seasons CSV, overriding data_paths.seasons
    #[arg(long)]
    seasons: Option<PathBuf>,

    /// Year YEARS_FROM_DRAFT counts to (defaults to config, then today)
    #[arg(long)]
    current_year: Option<i32>,

    /// Renormalize rolling averages over short careers
    #[arg(long)]
    renormalize: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Directory holding defaults/ and config/ (defaults to the working directory)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read working directory")?,
    };
    let config = config::load_config(&base_dir).context("failed to load configuration")?;

    let seasons_path = cli
        .seasons
        .unwrap_or_else(|| config.seasons_path(&base_dir));
    let provider =
        CsvStatsProvider::from_path(&seasons_path).context("failed to load season data")?;

    let current_year = cli
        .current_year
        .or(config.current_year)
        .unwrap_or_else(|| chrono::Utc::now().year());
    let rolling = if cli.renormalize {
        RollingWeighting::Renormalized
    } else {
        config.rolling
    };
    let pipeline = Pipeline::new(PipelineOptions {
        current_year,
        rolling,
    });
    info!("scoring against {} with {:?} rolling weights", current_year, rolling);

    let stdout = io::stdout().lock();
    match cli.player {
        Some(name) => {
            let player_id = config.resolve_player(&name);
            let report = pipeline
                .run_player(&provider, &player_id)
                .with_context(|| format!("failed to score player {name}"))?;
            info!(
                "player {} ({}): risk score {:.1}",
                name, player_id, report.risk.score
            );
            match cli.format {
                OutputFormat::Json => report::write_json(&report, stdout)?,
                OutputFormat::Csv => report::write_feature_csv(&report.seasons, stdout)?,
            }
        }
        None => match cli.format {
            OutputFormat::Json => {
                let scores = pipeline
                    .score_players(provider.table())
                    .context("failed to score players")?;
                report::write_scores_json(&scores, stdout)?;
            }
            OutputFormat::Csv => {
                let seasons = pipeline
                    .process_players(provider.table())
                    .context("failed to build features")?;
                report::write_feature_csv(&seasons, stdout)?;
            }
        },
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopsrisk=info,hoopsrisk_core=info,warn")),
        )
        .with_writer(io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
