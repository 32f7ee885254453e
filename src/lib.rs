pub mod api;
pub mod config;
pub mod date_util;
pub mod error;
pub mod storage;
pub mod sync;
pub mod url;

use std::time::Duration;

use tokio::time::MissedTickBehavior;

pub use api::{DocumentService, NotionClient, TaskService, TodoistClient};
pub use config::Config;
pub use error::{Error, Result};
pub use storage::repository::SyncRunRow;
pub use storage::Database;
pub use sync::{
    Cursor, NoopProgress, SyncOptions, SyncPhase, SyncProgress, SyncReport, SyncState, SyncStatus,
};

use storage::repository;
use sync::{cycle, seed, Clients};

/// Bidirectional Todoist/Notion bridge for one task list and one database.
///
/// Owns the service clients, the in-memory identity index and cursors, and
/// an optional run journal.
pub struct SyncBridge<T, D> {
    clients: Clients<T, D>,
    state: SyncState,
    options: SyncOptions,
    journal: Option<Database>,
}

impl SyncBridge<TodoistClient, NotionClient> {
    /// Build a bridge talking to the real services.
    pub fn from_config(config: &Config) -> Result<Self> {
        let todoist = TodoistClient::new(&config.todoist_token)?;
        let notion = NotionClient::new(&config.notion_token, &config.database_id)?;
        let options = SyncOptions {
            flag_filter: config.flag_filter.clone(),
            baseline_priority: config.baseline_priority,
        };
        Ok(Self::new(todoist, notion, options))
    }
}

impl<T: TaskService, D: DocumentService> SyncBridge<T, D> {
    pub fn new(todoist: T, notion: D, options: SyncOptions) -> Self {
        Self {
            clients: Clients::new(todoist, notion),
            state: SyncState::default(),
            options,
            journal: None,
        }
    }

    /// Record every phase report in `db`.
    pub fn with_journal(mut self, db: Database) -> Self {
        self.journal = Some(db);
        self
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn clients(&self) -> &Clients<T, D> {
        &self.clients
    }

    /// Initialise the identity index from the services' current contents.
    pub async fn seed(&mut self) -> Result<usize> {
        seed::seed_index(&self.clients, &mut self.state.index).await
    }

    /// Run one polling cycle and journal its reports.
    pub async fn run_cycle(&mut self, progress: &dyn SyncProgress) -> Vec<SyncReport> {
        let reports =
            cycle::run_cycle(&self.clients, &mut self.state, &self.options, progress).await;
        if let Err(e) = self.record(&reports).await {
            log::warn!("Failed to write run journal: {e}");
        }
        reports
    }

    async fn record(&self, reports: &[SyncReport]) -> Result<()> {
        let Some(ref db) = self.journal else {
            return Ok(());
        };
        let cycle = self.state.cycles;
        let reports = reports.to_vec();
        db.writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                for report in &reports {
                    repository::insert_sync_run(&tx, cycle, report)?;
                }
                repository::prune_runs(&tx, repository::JOURNAL_RETENTION)?;
                tx.commit()?;
                Ok::<(), rusqlite::Error>(())
            })
            .await?;
        Ok(())
    }

    /// Poll every `interval` until Ctrl-C. A slow cycle delays the next
    /// tick rather than overlapping it.
    pub async fn run(&mut self, interval: Duration, progress: &dyn SyncProgress) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Polling every {}s", interval.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reports = self.run_cycle(progress).await;
                    let changed: u64 = reports.iter().map(SyncReport::items_changed).sum();
                    if changed > 0 {
                        log::info!("Cycle {}: {changed} changes", self.state.cycles);
                    }
                }
                res = tokio::signal::ctrl_c() => {
                    res.map_err(|e| Error::Other(format!("signal handler: {e}")))?;
                    log::info!("Interrupted, stopping after {} cycles", self.state.cycles);
                    return Ok(());
                }
            }
        }
    }
}
