//! HRV Dashboard CLI
//!
//! Health metric aggregation with rolling history.

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use hrv_dashboard::{
    config::{Config, DisplaySettings},
    core::{
        AuthorizationStatus, MetricAggregator, MetricKind, RefreshScheduler, RefreshTrigger,
        Snapshot, TrendSummary,
    },
    sources::{FixtureSource, NoDataSource, Sources, SystemClock},
    store::{load_hrv_history, FileStore},
    transparency::{create_shared_log_with_persistence, TransparencyLog},
    PRIVACY_DECLARATION, VERSION,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hrv-dash")]
#[command(version = VERSION)]
#[command(about = "Health metric aggregation with rolling history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep refreshing until Ctrl+C (press Enter to refresh now)
    Run {
        /// Read metrics from a JSON fixture instead of the platform store
        #[arg(long)]
        fixture: Option<PathBuf>,
    },

    /// Run a single refresh and print the snapshot
    Refresh {
        /// Read metrics from a JSON fixture instead of the platform store
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Include metrics hidden in the display settings
        #[arg(long)]
        all: bool,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current status and cumulative statistics
    Status,

    /// Print the persisted HRV history
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize the persisted HRV history
    Trends,

    /// Print the value shown by the home-screen widget
    Widget,

    /// Show a metric on the dashboard
    Show {
        /// Metric name (hrv, resting-hr, sleep, mindful, steps, energy)
        metric: String,
    },

    /// Hide a metric from the dashboard
    Hide {
        /// Metric name (hrv, resting-hr, sleep, mindful, steps, energy)
        metric: String,
    },

    /// Display the health data declaration
    Privacy,

    /// Show configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { fixture } => cmd_run(fixture),
        Commands::Refresh { fixture, all, json } => cmd_refresh(fixture, all, json),
        Commands::Status => cmd_status(),
        Commands::History { json } => cmd_history(json),
        Commands::Trends => cmd_trends(),
        Commands::Widget => cmd_widget(),
        Commands::Show { metric } => cmd_set_visible(&metric, true),
        Commands::Hide { metric } => cmd_set_visible(&metric, false),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config => cmd_config(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(fixture: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Config::load()?;
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("HRV Dashboard v{VERSION}");
    println!();
    println!("  Refresh interval: {}s", config.refresh_interval.as_secs());
    println!("  Data path: {:?}", config.data_path);
    match fixture {
        Some(ref path) => println!("  Source: fixture {path:?}"),
        None => println!("  Source: platform store"),
    }
    println!();
    println!("Press Enter to refresh, Ctrl+C to stop");
    println!();

    let transparency_log = create_shared_log_with_persistence(config.transparency_path());
    let mut aggregator =
        build_aggregator(&config, fixture)?.with_transparency_log(transparency_log.clone());
    let updates = aggregator.subscribe();

    let scheduler = RefreshScheduler::new();
    let handle = scheduler.handle();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    // Enter on stdin requests a refresh.
    let stdin_handle = scheduler.handle();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if line.is_err() {
                break;
            }
            stdin_handle.request(RefreshTrigger::UserRequested);
        }
    });

    // Sources are readable from the start; treat that as the initial grant.
    handle.authorization_changed(AuthorizationStatus::Granted);
    let mut last_timer = Instant::now();

    while running.load(Ordering::SeqCst) {
        if last_timer.elapsed() >= config.refresh_interval {
            handle.request(RefreshTrigger::Timer);
            last_timer = Instant::now();
        }

        match scheduler.run_next(&mut aggregator, Duration::from_millis(100)) {
            Ok(trigger) => tracing::debug!(?trigger, "Refresh finished"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                eprintln!("Refresh channel disconnected unexpectedly");
                break;
            }
        }

        for update in updates.try_iter() {
            println!(
                "[{}] Refreshed, {} metric(s) added to history",
                update.snapshot.taken_at.with_timezone(&Local).format("%H:%M:%S"),
                update.updated.len()
            );
            print_snapshot(&update.snapshot, &config.display, false);
            println!();
        }
    }

    println!();
    println!("Stopping...");

    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!();
    println!("{}", transparency_log.summary());
    Ok(())
}

fn cmd_refresh(fixture: Option<PathBuf>, all: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let transparency_log = create_shared_log_with_persistence(config.transparency_path());
    let mut aggregator =
        build_aggregator(&config, fixture)?.with_transparency_log(transparency_log.clone());

    let snapshot = aggregator.refresh();
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        print_snapshot(snapshot, &config.display, all);
    }

    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("HRV Dashboard Status");
    println!("====================");
    println!();

    println!("Configuration:");
    println!("  Refresh interval: {}s", config.refresh_interval.as_secs());
    println!(
        "  Timezone: {}",
        config.timezone.as_deref().unwrap_or("host local")
    );
    let visible: Vec<&str> = config.display.visible().iter().map(|k| k.title()).collect();
    println!("  Shown metrics: {}", visible.join(", "));
    println!();

    let store = FileStore::new(config.store_path());
    match load_hrv_history(&store) {
        Ok(records) if !records.is_empty() => {
            println!("Stored HRV history: {} record(s)", records.len());
            if let Some(last) = records.last() {
                println!(
                    "  Latest: {} ms at {}",
                    last.value,
                    last.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }
        }
        Ok(_) => println!("No stored HRV history."),
        Err(e) => println!("Stored HRV history unreadable: {e}"),
    }
    println!();

    if config.transparency_path().exists() {
        let stats = TransparencyLog::with_persistence(config.transparency_path()).stats();
        println!("Cumulative Statistics:");
        println!("  Refresh cycles: {}", stats.refresh_cycles);
        println!("  Metric reads with data: {}", stats.samples_read);
        println!("  Metric reads without data: {}", stats.samples_missing);
        println!("  History records appended: {}", stats.records_appended);
        println!("  Failed history writes: {}", stats.persist_failures);
    } else {
        println!("No previous session data found.");
    }

    Ok(())
}

fn cmd_history(json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FileStore::new(config.store_path());
    let records = load_hrv_history(&store).context("reading stored HRV history")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No stored HRV history.");
        println!("Run 'hrv-dash refresh' to record a value.");
        return Ok(());
    }

    println!("HRV history ({} record(s))", records.len());
    for record in &records {
        println!(
            "  {}  {} ms",
            record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            record.value
        );
    }
    Ok(())
}

fn cmd_trends() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FileStore::new(config.store_path());
    let records = load_hrv_history(&store).context("reading stored HRV history")?;

    let Some(summary) = TrendSummary::from_records(&records) else {
        println!("No stored HRV history to summarize.");
        return Ok(());
    };

    println!("HRV Trends");
    println!("==========");
    println!(
        "  Period: {} to {}",
        summary.first.with_timezone(&Local).format("%Y-%m-%d"),
        summary.last.with_timezone(&Local).format("%Y-%m-%d")
    );
    println!("  Records: {}", summary.count);
    println!("  Mean: {:.1} ms", summary.mean);
    println!("  Range: {} - {} ms", summary.min, summary.max);
    if let Some(std_dev) = summary.std_dev {
        println!("  Std dev: {std_dev:.1} ms");
    }
    println!("  Direction: {:?}", summary.direction);
    Ok(())
}

fn cmd_widget() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FileStore::new(config.store_path());
    let hrv = hrv_dashboard::store::latest_persisted_hrv(&store);

    println!("HRV");
    println!("{hrv} ms");
    Ok(())
}

fn cmd_set_visible(metric: &str, visible: bool) -> anyhow::Result<()> {
    let kind = metric
        .parse::<MetricKind>()
        .map_err(anyhow::Error::msg)?;

    let mut config = Config::load()?;
    config.display.set_visible(kind, visible);
    config.save()?;

    println!(
        "{} is now {}.",
        kind.title(),
        if visible { "shown" } else { "hidden" }
    );
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Wire sources, store and clock from the configuration.
fn build_aggregator(config: &Config, fixture: Option<PathBuf>) -> anyhow::Result<MetricAggregator> {
    let sources = match fixture {
        Some(path) => Sources::from_provider(Arc::new(
            FixtureSource::load(&path).with_context(|| format!("loading fixture {path:?}"))?,
        )),
        None => Sources::from_provider(Arc::new(NoDataSource)),
    };

    let clock = match config.zone()? {
        Some(zone) => SystemClock::with_zone(zone),
        None => SystemClock::new(),
    };

    Ok(MetricAggregator::new(
        sources,
        FileStore::new(config.store_path()),
        clock,
    ))
}

fn print_snapshot(snapshot: &Snapshot, display: &DisplaySettings, include_hidden: bool) {
    for kind in MetricKind::ALL {
        if !include_hidden && !display.is_visible(kind) {
            continue;
        }
        if let Some(sample) = snapshot.metric(kind) {
            println!("  {:<16} {}", sample.title, sample.display_value);
        }
    }
    for sample in &snapshot.context {
        println!("  {:<16} {}", sample.title, sample.display_value);
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
