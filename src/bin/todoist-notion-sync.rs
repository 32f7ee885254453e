use std::time::Duration;

use clap::{Parser, Subcommand};
use todoist_notion_sync::storage::repository;
use todoist_notion_sync::{
    Config, Database, NoopProgress, NotionClient, SyncBridge, SyncPhase, SyncProgress, SyncReport,
    SyncRunRow, SyncStatus, TodoistClient,
};

#[derive(Parser)]
#[command(
    name = "todoist-notion-sync",
    about = "Keep a Todoist task list and a Notion database in sync"
)]
struct Cli {
    /// Journal path (default: ~/.todoist-notion-sync/journal.db)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Read credentials from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<String>,

    /// Do not record cycles in the run journal
    #[arg(long, global = true)]
    no_journal: bool,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the identity index, then poll both services until interrupted
    Run {
        /// Seconds between cycles (default: SYNC_INTERVAL_SECS or 10)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Seed the identity index and run a single cycle
    Once {
        /// Output reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent journal entries
    Status {
        /// Maximum rows
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl SyncProgress for StderrProgress {
    fn on_cycle_start(&self, cycle: u64) {
        eprintln!("Cycle {cycle}...");
    }

    fn on_record_created(&self, phase: SyncPhase, title: &str) {
        let target = match phase {
            SyncPhase::TowardNotion => "page",
            _ => "task",
        };
        eprintln!("  Created {target}: {title}");
    }

    fn on_phase_complete(&self, report: &SyncReport) {
        eprintln!(
            "  {}: {} ({} changes)",
            report.phase,
            report.status.as_str(),
            report.items_changed()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Status { limit, json } => {
            let db = open_journal(cli.db.as_deref()).await?;
            print_status(&db, limit, json).await?;
        }
        Commands::Once { json } => {
            let mut bridge = build_bridge(&cli).await?.0;
            let paired = bridge.seed().await?;
            log::info!("Seeded {paired} pairs");
            let progress: &dyn SyncProgress = if json { &NoopProgress } else { &StderrProgress };
            let reports = bridge.run_cycle(progress).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_sync_report(report);
                    println!();
                }
            }
            if reports.iter().any(|r| r.status == SyncStatus::Failed) {
                std::process::exit(1);
            }
        }
        Commands::Run { interval } => {
            let (mut bridge, config) = build_bridge(&cli).await?;
            let interval = match interval {
                Some(0) => anyhow::bail!("--interval must be at least 1 second"),
                Some(secs) => Duration::from_secs(secs),
                None => config.interval,
            };
            let paired = bridge.seed().await?;
            eprintln!("Seeded identity index ({paired} pairs); polling every {}s", interval.as_secs());
            bridge.run(interval, &NoopProgress).await?;
        }
    }
    Ok(())
}

async fn open_journal(path: Option<&str>) -> anyhow::Result<Database> {
    Ok(match path {
        Some(path) => Database::open_at(path).await?,
        None => Database::open().await?,
    })
}

async fn build_bridge(
    cli: &Cli,
) -> anyhow::Result<(SyncBridge<TodoistClient, NotionClient>, Config)> {
    let config = match cli.env_file {
        Some(ref path) => Config::from_env_file(path)?,
        None => {
            Config::load_dotenv();
            Config::from_env()?
        }
    };
    log::debug!("Loaded {config:?}");
    let mut bridge = SyncBridge::from_config(&config)?;
    if !cli.no_journal {
        bridge = bridge.with_journal(open_journal(cli.db.as_deref()).await?);
    }
    Ok((bridge, config))
}

async fn print_status(db: &Database, limit: usize, json: bool) -> anyhow::Result<()> {
    let rows: Vec<SyncRunRow> = db
        .reader()
        .call(move |conn| repository::list_recent_runs(conn, limit))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No cycles recorded yet. Run 'todoist-notion-sync once' or 'run' first.");
        return Ok(());
    }

    println!(
        "{:<6} {:<15} {:<16} {:>4} {:>4} {:>4} {:>4} {:>4}  {}",
        "Cycle", "Phase", "Status", "New", "Upd", "Done", "Reop", "Fail", "Finished"
    );
    for row in &rows {
        println!(
            "{:<6} {:<15} {:<16} {:>4} {:>4} {:>4} {:>4} {:>4}  {}",
            row.cycle,
            row.phase,
            row.status,
            row.items_created,
            row.items_updated,
            row.items_completed,
            row.items_reopened,
            row.items_failed,
            row.finished_at,
        );
        if let Some(ref err) = row.error_message {
            println!("       error: {err}");
        }
    }
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    println!("Sync: {}", report.phase);
    println!("  Status:    {}", report.status.as_str());
    println!("  Created:   {} items", report.items_created);
    println!("  Updated:   {} items", report.items_updated);
    println!("  Completed: {} items", report.items_completed);
    println!("  Reopened:  {} items", report.items_reopened);
    println!("  Failed:    {} items", report.items_failed);
    if let Some(cursor) = report.cursor {
        println!("  Cursor:    {cursor:?}");
    }
    if let Some(ref err) = report.error {
        println!("  Error:     {err}");
    }
}
