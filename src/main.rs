use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use hoard::catalog::Catalog;
use hoard::cli::{Cli, Command, IgnoreArgs, ReportArgs, SaveArgs, ScanArgs, TrackArgs};
use hoard::config::{Config, FileConfig};
use hoard::error::{HoardError, Result};
use hoard::platform;
use hoard::report::{self, Filter};
use hoard::scan::collector;
use hoard::store::HistoryStore;
use hoard::tag::TagReader;
use hoard::tracker::{self, Tracker, TrackerHandle, TrackerSettings, TrackerStats};
use hoard::util;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

fn init_logging(verbose: bool) {
    let default = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, args: &SaveArgs) -> Result<Config> {
    let file = FileConfig::load(path)?;
    Config::from_args(file, args)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn open_tracker(config: &Config) -> Result<Tracker> {
    let save_dir = config.resolve_save_dir()?;
    let catalog = Arc::new(Catalog::load_or_empty(&config.catalog_path));
    Tracker::open(catalog, HistoryStore::for_save(&save_dir), config.gap_threshold_ms())
}

fn print_status(stats: &TrackerStats, table: bool) {
    let now = now_millis();
    if table {
        let rows = report::rows(stats, &Filter::default(), now);
        print!("{}", report::table::render(&rows));
    }
    println!("{}", report::progress_line(stats));
    if let Some(age) = report::save_age_line(stats, now) {
        println!("{age}");
    }
}

async fn track(cli_config: Option<&Path>, args: TrackArgs) -> Result<()> {
    let mut config = load_config(cli_config, &args.save)?;
    if let Some(interval) = &args.interval {
        config.poll_interval = util::parse_duration("interval", interval)?;
    }

    let save_dir = config.resolve_save_dir()?;
    let tracker = open_tracker(&config)?;
    let reader: Arc<dyn TagReader> = Arc::from(config.format.reader());
    let settings = TrackerSettings {
        save_dir: save_dir.clone(),
        layout: config.layout.clone(),
        poll_interval: config.poll_interval,
        read_timeout: config.read_timeout,
    };

    println!("Tracking {}", save_dir.display());
    println!("Type 'ignore <item>' to toggle an item, Ctrl-C to stop.\n");

    let handle = tracker::spawn(tracker, reader, settings);
    let mut updates = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let stats = Arc::clone(&updates.borrow_and_update());
                print_status(&stats, args.table);
            }

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_input(&handle, line.trim()).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    let tracker = handle.stop().await?;
    println!("\n{}", report::progress_line(&tracker.stats()));
    Ok(())
}

async fn handle_input(handle: &TrackerHandle, line: &str) {
    match line.split_once(char::is_whitespace) {
        Some(("ignore", item)) if !item.trim().is_empty() => {
            let item = item.trim();
            match handle.toggle_ignore(item).await {
                Ok(true) => println!("{item}: ignored"),
                Ok(false) => println!("{item}: no longer ignored"),
                Err(e) => eprintln!("failed to toggle {item}: {e}"),
            }
        }
        _ if line.is_empty() => {}
        _ => eprintln!("unknown command '{line}', expected 'ignore <item>'"),
    }
}

async fn scan(cli_config: Option<&Path>, args: ScanArgs) -> Result<()> {
    let config = load_config(cli_config, &args.save)?;
    let save_dir = config.resolve_save_dir()?;
    let reader: Arc<dyn TagReader> = Arc::from(config.format.reader());

    let snapshot = collector::collect(&save_dir, &config.layout, reader, config.read_timeout).await;

    if args.json {
        println!("{}", report::json::render_snapshot(&snapshot));
    } else {
        println!("Items held in {}:\n", save_dir.display());
        print!("{}", report::table::render_snapshot(&snapshot));
        if let Some(modified) = snapshot.newest_modification {
            println!("Save file modified: {}", util::format_ago(now_millis(), modified));
        }
    }
    Ok(())
}

fn show_report(cli_config: Option<&Path>, args: ReportArgs) -> Result<()> {
    let config = load_config(cli_config, &args.save)?;
    let stats = open_tracker(&config)?.stats();
    let filter = Filter {
        search: args.search,
        missing_only: args.missing,
    };
    let rows = report::rows(&stats, &filter, now_millis());

    if args.json {
        println!("{}", report::json::render(&stats, &rows));
    } else {
        print!("{}", report::table::render(&rows));
        println!("\n{}", report::progress_line(&stats));
    }
    Ok(())
}

fn toggle_ignore(cli_config: Option<&Path>, args: IgnoreArgs) -> Result<()> {
    let config = load_config(cli_config, &args.save)?;
    let mut tracker = open_tracker(&config)?;

    if !tracker.stats().catalog.contains(&args.item) {
        tracing::warn!(item = %args.item, "item is not in the catalog");
    }
    let ignored = tracker.toggle_ignore(&args.item)?;
    println!("{}: {}", args.item, if ignored { "ignored" } else { "no longer ignored" });
    Ok(())
}

fn list_worlds(cli_config: Option<&Path>) -> Result<()> {
    let config = load_config(cli_config, &SaveArgs::default())?;
    let root = config
        .saves_root
        .ok_or_else(|| HoardError::Config("no saves directory known for this platform".into()))?;

    let worlds = platform::list_worlds(&root);
    if worlds.is_empty() {
        println!("No worlds found under {}", root.display());
        return Ok(());
    }

    let latest = platform::latest_world(&root);
    println!("Worlds in {}:", root.display());
    for world in worlds {
        let marker = if latest.as_ref() == Some(&world) { "*" } else { " " };
        let name = world.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        println!("  {marker} {name}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Command::Track(args) => track(config_path, args).await,
        Command::Scan(args) => scan(config_path, args).await,
        Command::Report(args) => show_report(config_path, args),
        Command::Ignore(args) => toggle_ignore(config_path, args),
        Command::Worlds => list_worlds(config_path),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
