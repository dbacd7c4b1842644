//! Slug history sweep
//!
//! Finds history rows that violate the slug rules (invalid charset, orphaned
//! owner, collision with a live slug, redundant self-address) and optionally
//! deletes them. Dry-run by default; exits non-zero when violations exist so
//! it can gate a deploy or run under cron with alerting.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use waypost_common::{
    config::AppConfig,
    db::{DbPool, SlugRepository, SlugStore, SweepReport},
    metrics,
};

#[derive(Parser)]
#[command(name = "slug-sweep")]
#[command(about = "Find and delete slug history rows that violate the slug rules", long_about = None)]
#[command(version)]
struct Cli {
    /// Actually delete rows (default: dry-run)
    #[arg(long)]
    apply: bool,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SweepOutput {
    mode: &'static str,
    #[serde(flatten)]
    report: SweepReport,
    total: u64,
}

fn print_text(mode: &str, report: &SweepReport) {
    println!("=== Slug history sweep ===");
    println!("- mode: {mode}");
    println!("- invalid old_slug: {}", report.invalid);
    println!("- orphaned rows: {}", report.orphaned);
    println!("- collisions with live slugs: {}", report.collisions);
    println!("- redundant rows: {}", report.redundant);
    println!("- total: {}", report.total());
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load()?;
    let pool = DbPool::new(&config.database).await?;
    let store = SlugRepository::new(pool);

    let mode = if cli.apply { "APPLY" } else { "DRY-RUN" };

    let report = if cli.apply {
        let report = store.delete_violating_history().await?;
        metrics::record_sweep(&report);
        report
    } else {
        store.find_violating_history().await?
    };

    if cli.json {
        let output = SweepOutput {
            mode,
            report,
            total: report.total(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(mode, &report);
    }

    if report.is_clean() {
        if !cli.json {
            println!("No rows to fix.");
        }
        return Ok(ExitCode::SUCCESS);
    }

    if cli.apply {
        if !cli.json {
            println!("Deleted {} history rows.", report.total());
        }
        Ok(ExitCode::SUCCESS)
    } else {
        if !cli.json {
            eprintln!("Found violating rows. Run with --apply to delete them.");
        }
        Ok(ExitCode::from(1))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Report lines go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    metrics::register_metrics();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("slug-sweep: {err:#}");
            ExitCode::FAILURE
        }
    }
}
