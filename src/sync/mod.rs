pub mod completion;
pub mod cycle;
pub mod fields;
pub mod incremental;
pub mod index;
pub mod manual;
pub mod ordering;
pub mod seed;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{DocumentService, TaskService};
use index::IdentityIndex;

/// Options controlling the manual-flag phases.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Todoist filter selecting flagged tasks.
    pub flag_filter: String,
    /// Priority a flagged task is reset to once handled.
    pub baseline_priority: u8,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            flag_filter: "p3".to_string(),
            baseline_priority: 1,
        }
    }
}

/// The two services, bundled so reconciliation functions take one argument.
pub struct Clients<T, D> {
    pub todoist: T,
    pub notion: D,
}

impl<T: TaskService, D: DocumentService> Clients<T, D> {
    pub fn new(todoist: T, notion: D) -> Self {
        Self { todoist, notion }
    }
}

/// Resumable scan position over one direction's active list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Cursor {
    /// No sweep has happened yet; shrink detection is skipped.
    #[default]
    Unchecked,
    /// The last sweep saw an empty list.
    Empty,
    /// Index of the last processed element.
    At(usize),
}

impl Cursor {
    /// Cursor after fully processing a list of `len` elements.
    pub fn after(len: usize) -> Self {
        match len {
            0 => Cursor::Empty,
            n => Cursor::At(n - 1),
        }
    }

    /// True when a list of `len` elements is shorter than this cursor implies.
    pub fn shrunk(&self, len: usize) -> bool {
        matches!(*self, Cursor::At(i) if len < i + 1)
    }

    /// First index the forward scan should look at.
    pub fn next_index(&self) -> usize {
        match *self {
            Cursor::At(i) => i + 1,
            Cursor::Unchecked | Cursor::Empty => 0,
        }
    }

    /// Numeric form used in the journal (`-1` for an empty list).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Cursor::Unchecked => None,
            Cursor::Empty => Some(-1),
            Cursor::At(i) => Some(i as i64),
        }
    }
}

/// Shared mutable state of one Todoist list / Notion database pair.
#[derive(Debug, Default)]
pub struct SyncState {
    pub index: IdentityIndex,
    /// Position in Todoist's active list (toward-Notion direction).
    pub todoist_cursor: Cursor,
    /// Position in Notion's sorted active list (toward-Todoist direction).
    pub notion_cursor: Cursor,
    pub cycles: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncPhase {
    TowardNotion,
    TowardTodoist,
    NotionFlags,
    TodoistFlags,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::TowardNotion => "toward_notion",
            SyncPhase::TowardTodoist => "toward_todoist",
            SyncPhase::NotionFlags => "notion_flags",
            SyncPhase::TodoistFlags => "todoist_flags",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report returned after one phase of a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub phase: SyncPhase,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    pub items_created: u64,
    pub items_updated: u64,
    pub items_completed: u64,
    pub items_reopened: u64,
    pub items_failed: u64,
    pub cursor: Option<Cursor>,
    pub error: Option<String>,
}

impl SyncReport {
    pub fn new(phase: SyncPhase) -> Self {
        Self {
            phase,
            status: SyncStatus::Success,
            started_at: Utc::now(),
            items_created: 0,
            items_updated: 0,
            items_completed: 0,
            items_reopened: 0,
            items_failed: 0,
            cursor: None,
            error: None,
        }
    }

    pub fn items_changed(&self) -> u64 {
        self.items_created + self.items_updated + self.items_completed + self.items_reopened
    }

    /// Derive the final status from the counters.
    pub fn finish(mut self) -> Self {
        self.status = if self.items_failed == 0 {
            SyncStatus::Success
        } else if self.items_changed() > 0 {
            SyncStatus::PartialFailure
        } else {
            SyncStatus::Failed
        };
        if self.items_failed > 0 && self.error.is_none() {
            self.error = Some(format!("{} items failed", self.items_failed));
        }
        self
    }

    /// Mark the phase as aborted by `error`, keeping counts gathered so far.
    pub fn fail(mut self, error: &crate::error::Error) -> Self {
        self.status = SyncStatus::Failed;
        self.error = Some(error.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    Success,
    PartialFailure,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "completed",
            SyncStatus::PartialFailure => "partial_failure",
            SyncStatus::Failed => "failed",
        }
    }
}

/// Callbacks for reporting cycle progress.
pub trait SyncProgress: Send + Sync {
    fn on_cycle_start(&self, _cycle: u64) {}

    fn on_record_created(&self, _phase: SyncPhase, _title: &str) {}

    fn on_phase_complete(&self, _report: &SyncReport) {}
}

/// Progress reporter that ignores every event.
pub struct NoopProgress;

impl SyncProgress for NoopProgress {}
