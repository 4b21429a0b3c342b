use anyhow::Context;
use clap::Parser;
use lineupopt::application::LineupView;
use lineupopt::infrastructure::LoggingConfig;
use lineupopt::{GenerationReport, LineupOptimizer, PlayerPool, RequestDocument};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// Generate diversified daily-fantasy lineups from a TOML request file
#[derive(Parser, Debug)]
#[command(name = "lineupopt")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Request file with a `[request]` table and `[[players]]` records
    request: PathBuf,

    /// Override the number of lineups to generate
    #[arg(short = 'n', long)]
    lineups: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: pretty or json
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

#[derive(Serialize)]
struct Output<'a> {
    lineups: Vec<LineupView>,
    report: &'a GenerationReport,
}

fn main() {
    let cli = Cli::parse();
    LoggingConfig::new(&cli.log_level, &cli.log_format).init();

    if let Err(e) = run(&cli) {
        error!(error = format!("{e:#}"), "lineup generation failed");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let document = RequestDocument::load(&cli.request)
        .with_context(|| format!("failed to load {}", cli.request.display()))?;

    let mut request = document.request;
    if let Some(lineups) = cli.lineups {
        request.lineup_count = lineups;
    }
    if cli.seed.is_some() {
        request.seed = cli.seed;
    }

    let pool = PlayerPool::new(document.players)?;
    let optimizer = LineupOptimizer::from_settings(&request.solver)?;
    let outcome = optimizer.optimize(&pool, &request)?;

    info!(
        produced = outcome.report.produced,
        requested = outcome.report.requested,
        complete = outcome.report.is_complete(),
        warnings = outcome.report.warnings.len(),
        "lineups generated"
    );

    let output = Output {
        lineups: outcome.lineup_views(&pool),
        report: &outcome.report,
    };
    let json = serde_json::to_string_pretty(&output)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
