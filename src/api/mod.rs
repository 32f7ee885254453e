//! Collaborator interfaces for the two services and their wire types.
//!
//! The reconciliation core only talks to [`TaskService`] and
//! [`DocumentService`]; `todoist` and `notion` hold the HTTP
//! implementations.

pub mod notion;
pub mod rate_limit;
pub mod todoist;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use notion::NotionClient;
pub use todoist::TodoistClient;

/// Property names of the synchronized Notion database.
pub mod props {
    pub const TITLE: &str = "Task";
    pub const DESCRIPTION: &str = "Description";
    pub const DUE: &str = "Due";
    pub const STATUS: &str = "Status";
    pub const URL: &str = "URL";
    pub const TODOIST_ID: &str = "TodoistID";
    pub const SYNC_STATUS: &str = "Sync status";
}

// ── Todoist ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due: Option<Due>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub url: String,
    pub created_at: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Due {
    pub date: NaiveDate,
    #[serde(default)]
    pub string: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub datetime: Option<String>,
}

/// Body of a task creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTask {
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// How an update touches a task's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueChange {
    Set(NaiveDate),
    Clear,
}

/// Partial task update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub content: Option<String>,
    pub description: Option<String>,
    pub due: Option<DueChange>,
    pub priority: Option<u8>,
}

#[async_trait]
pub trait TaskService: Send + Sync {
    /// All active (not completed) tasks, in the service's own order.
    async fn list_active_tasks(&self) -> Result<Vec<Task>>;

    /// Active tasks matching a Todoist filter query such as `p3`.
    async fn list_filtered_tasks(&self, filter: &str) -> Result<Vec<Task>>;

    async fn get_task(&self, id: &str) -> Result<Task>;

    async fn create_task(&self, task: &NewTask) -> Result<Task>;

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task>;

    async fn close_task(&self, id: &str) -> Result<()>;

    async fn reopen_task(&self, id: &str) -> Result<()>;
}

// ── Notion ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page {
    pub id: String,
    pub created_time: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

/// The subset of Notion property values this bridge reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Date {
        #[serde(default)]
        date: Option<DateValue>,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectOption>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

/// Database query filters used by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum PageFilter {
    /// Pages whose `TodoistID` equals the given number.
    TodoistId(u64),
    /// Pages whose `Status` checkbox is unchecked.
    Active,
    /// Pages whose `Sync status` select equals the given option.
    SyncStatus(String),
}

/// Typed set of page property writes; `None` fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the date.
    pub due: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
    pub url: Option<String>,
    pub todoist_id: Option<u64>,
    pub sync_status: Option<String>,
}

#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn query_database(&self, filter: &PageFilter) -> Result<Vec<Page>>;

    async fn create_page(&self, properties: &PageUpdate) -> Result<Page>;

    async fn update_page(&self, id: &str, properties: &PageUpdate) -> Result<Page>;

    async fn retrieve_page(&self, id: &str) -> Result<Page>;
}
