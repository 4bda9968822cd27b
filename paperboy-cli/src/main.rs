//! Paperboy CLI — one invocation, one digest run.
//!
//! Designed to be driven by cron: exit code 0 means a usable report was
//! produced (including an empty one), non-zero means configuration
//! problems, an unrecoverable pipeline break, or a failed email send.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use paperboy_core::pipeline::{RunFlags, RunOutcome, run};
use paperboy_core::types::Classification;

/// Daily ArXiv RecSys & LLM industry-paper digest
#[derive(Parser, Debug)]
#[command(name = "paperboy", version, about, long_about = None)]
struct Cli {
    /// Fetch and classify but send no email, write no files, and leave
    /// run state untouched
    #[arg(long)]
    dry_run: bool,

    /// Skip the email send; still write the local report files
    #[arg(long)]
    no_email: bool,

    /// Override: how many days back to search (default: auto from the
    /// state file)
    #[arg(long, value_name = "N")]
    lookback_days: Option<i64>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress the end-of-run summary on stdout
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("paperboy={0},paperboy_core={0}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_summary(outcome: &RunOutcome) {
    let line = "=".repeat(60);
    println!("\n{line}");
    println!(
        "  {} industry papers found (out of {} total)",
        outcome.report.papers.len(),
        outcome.report.total_fetched
    );
    println!(
        "  LLM API calls: {} / {}",
        outcome.llm_calls_used, outcome.llm_calls_max
    );
    match &outcome.report_path {
        Some(path) => println!("  Report: {}", path.display()),
        None => println!("  Report: (dry run, not written)"),
    }
    println!("{line}\n");

    for cp in &outcome.report.papers {
        let label = match &cp.classification {
            Classification::Industry { companies, .. } if !companies.is_empty() => {
                format!("[{}]", companies)
            }
            _ => "[industry]".to_string(),
        };
        println!("  {} {}", label, cp.paper.title);
        println!("    {}\n", cp.paper.url);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before reading any configuration.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = paperboy_core::load_config(cli.config.as_deref())?;
    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }

    let flags = RunFlags {
        dry_run: cli.dry_run,
        no_email: cli.no_email,
        lookback_days: cli.lookback_days,
    };

    let outcome = run(&config, flags).await?;

    if !cli.quiet {
        print_summary(&outcome);
    }

    Ok(())
}
