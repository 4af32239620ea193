//! Campaign Diagnostic - per-audience quadrant reports for contact-center campaigns
//!
//! Loads a performance table, aggregates CSAT and adherence per business and
//! campaign, flags campaigns below the global baselines and delivers one
//! rendered diagnostic per configured audience.
//!
//! Exit codes:
//!   0 - Success (every rendered report was delivered)
//!   1 - Runtime error (unreadable input, bad config, empty dataset, etc.)
//!   2 - At least one report could not be delivered
//!   130 - Interrupted (Ctrl-C) while delivering

mod analysis;
mod cli;
mod config;
mod delivery;
mod error;
mod models;
mod pipeline;
mod report;
mod source;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use delivery::Sink;
use pipeline::RunOptions;
use source::{load_table, ColumnMapping, Field, Table};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit code for a run interrupted during delivery (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Campaign Diagnostic v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_diagnostic(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Diagnostic failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .diagnostic.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to add audiences, column aliases and thresholds.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete workflow. Returns the exit code (0, 2 or 130).
async fn run_diagnostic(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input = args
        .input
        .as_deref()
        .context("An input file is required (use --input)")?;

    // Step 1: Load the table and map its columns
    info!("Loading performance table: {}", input.display());
    let table = load_table(input, config.input.delimiter_byte()?)?;
    let mapping = ColumnMapping::resolve(&table.headers, &config.columns);
    let records = table.records(&mapping);
    info!(
        "Built {} records from {} rows",
        records.len(),
        table.rows.len()
    );

    if args.dry_run {
        return handle_dry_run(&table, &mapping, records.len());
    }

    // Step 2: Resolve audiences and the delivery sink
    let audiences = config.select_audiences(&args.audiences)?;
    let sink = Sink::from_config(&config, args.format, args.slack_token.as_deref())?;
    let cutoff = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let options = RunOptions::from_config(&config, cutoff);

    // Ctrl-C stops the audience loop between audiences.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing the current audience");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    // Step 3: Diagnose and render
    let summary = pipeline::run_audiences(&records, &audiences, &options, &cancel)?;

    // Step 4: Deliver; a Ctrl-C here abandons whatever is still in flight.
    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let Some(outcomes) = delivery::deliver_until(&sink, &summary.reports, interrupted).await
    else {
        eprintln!("\n⛔ Interrupted during delivery. Pending reports were not delivered.");
        return Ok(EXIT_INTERRUPTED);
    };
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.audience_id.as_str())
        .collect();

    if !args.quiet {
        eprintln!("\n📊 Diagnostic Summary:");
        eprintln!("   Records: {}", records.len());
        eprintln!("   Audiences: {}", audiences.len());
        eprintln!("   Delivered: {}", outcomes.len() - failed.len());
        for skipped in &summary.skipped {
            eprintln!("   ⏭️  Skipped {}: {}", skipped.audience_id, skipped.reason);
        }
        if summary.cancelled {
            eprintln!("   ⚠️  Cancelled before all audiences were processed");
        }
        eprintln!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    }

    if !failed.is_empty() {
        eprintln!(
            "\n⛔ Delivery failed for: {}. Failing (exit code 2).",
            failed.join(", ")
        );
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: show the table shape and column mapping, render nothing.
fn handle_dry_run(table: &Table, mapping: &ColumnMapping, record_count: usize) -> Result<i32> {
    println!("\n🔍 Dry run: column mapping (nothing rendered or delivered)...\n");

    println!("   Headers: {}", table.headers.join(" | "));
    for field in Field::ALL {
        match mapping.get(field) {
            Some(index) => println!(
                "     ✔ {} -> column {} ({})",
                field,
                index,
                table.headers.get(index).map(String::as_str).unwrap_or("")
            ),
            None => println!("     ✘ {} -> not found", field),
        }
    }

    let unresolved = mapping.unresolved();
    if !unresolved.is_empty() {
        println!(
            "\n   {} fields unresolved; they will read as absent.",
            unresolved.len()
        );
    }

    println!("\n   Total: {} records", record_count);
    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
