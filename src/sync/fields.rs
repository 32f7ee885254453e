//! Field translation between Todoist tasks and Notion pages.
//!
//! Pure data shaping. Extraction never fails: an absent or empty
//! property reads as an empty string / `None`.

use chrono::NaiveDate;

use crate::api::{
    props, DueChange, NewTask, Page, PageUpdate, PropertyValue, RichText, Task, TaskUpdate,
};
use crate::date_util::parse_due_date;
use crate::error::{Error, Result};
use crate::url::{generate_todoist_url, parse_todoist_url};

pub const SYNC_STATUS_UPDATED: &str = "Updated";
pub const SYNC_STATUS_NEEDS_UPDATE: &str = "NeedsUpdate";

/// The synchronized fields of a task, assembled from either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedRecord {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub external_ref: Option<String>,
    pub creation_time: String,
}

impl SyncedRecord {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.content.clone(),
            description: task.description.clone(),
            due_date: task.due.as_ref().map(|d| d.date),
            is_completed: task.is_completed,
            external_ref: Some(task_url(task)),
            creation_time: task.created_at.clone(),
        }
    }

    pub fn from_page(page: &Page) -> Self {
        Self {
            title: page_title(page),
            description: page_description(page),
            due_date: page_due(page),
            is_completed: page_completed(page),
            external_ref: page_url(page),
            creation_time: page.created_time.clone(),
        }
    }

    /// True when title, description, due date, and completion agree.
    pub fn same_fields(&self, other: &SyncedRecord) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.due_date == other.due_date
            && self.is_completed == other.is_completed
    }
}

fn plain_text(fragments: &[RichText]) -> String {
    fragments.iter().map(|t| t.plain_text.as_str()).collect()
}

pub fn page_title(page: &Page) -> String {
    match page.properties.get(props::TITLE) {
        Some(PropertyValue::Title { title }) => plain_text(title),
        _ => String::new(),
    }
}

pub fn page_description(page: &Page) -> String {
    match page.properties.get(props::DESCRIPTION) {
        Some(PropertyValue::RichText { rich_text }) => plain_text(rich_text),
        _ => String::new(),
    }
}

pub fn page_due(page: &Page) -> Option<NaiveDate> {
    match page.properties.get(props::DUE) {
        Some(PropertyValue::Date { date: Some(date) }) => parse_due_date(&date.start),
        _ => None,
    }
}

pub fn page_completed(page: &Page) -> bool {
    matches!(
        page.properties.get(props::STATUS),
        Some(PropertyValue::Checkbox { checkbox: true })
    )
}

/// The `URL` property, whether stored as a url or as rich text.
pub fn page_url(page: &Page) -> Option<String> {
    let url = match page.properties.get(props::URL) {
        Some(PropertyValue::Url { url }) => url.clone().unwrap_or_default(),
        Some(PropertyValue::RichText { rich_text }) => plain_text(rich_text),
        _ => String::new(),
    };
    Some(url).filter(|u| !u.is_empty())
}

pub fn page_sync_status(page: &Page) -> Option<String> {
    match page.properties.get(props::SYNC_STATUS) {
        Some(PropertyValue::Select { select: Some(option) }) => Some(option.name.clone()),
        _ => None,
    }
}

/// The Todoist id a page points at, from `TodoistID` or else its Todoist URL.
pub fn page_todoist_id(page: &Page) -> Option<String> {
    if let Some(PropertyValue::Number { number: Some(n) }) = page.properties.get(props::TODOIST_ID) {
        if n.is_finite() && *n >= 1.0 && n.fract() == 0.0 {
            return Some(format!("{}", *n as u64));
        }
    }
    page_url(page).and_then(|url| parse_todoist_url(&url).ok())
}

/// Numeric form of a Todoist id for the `TodoistID` number property.
pub fn todoist_number(id: &str) -> Result<u64> {
    id.parse::<u64>().map_err(|_| {
        Error::InvalidIdentifier(format!("Todoist id '{id}' is not numeric"))
    })
}

/// The task's own URL, or the canonical one when the service omitted it.
pub fn task_url(task: &Task) -> String {
    if task.url.is_empty() {
        generate_todoist_url(&task.id)
    } else {
        task.url.clone()
    }
}

/// Every synchronized property of a page, taken from a task.
pub fn page_update_from_task(task: &Task) -> Result<PageUpdate> {
    Ok(PageUpdate {
        title: Some(task.content.clone()),
        description: Some(task.description.clone()),
        due: Some(task.due.as_ref().map(|d| d.date)),
        completed: Some(task.is_completed),
        url: Some(task_url(task)),
        todoist_id: Some(todoist_number(&task.id)?),
        sync_status: Some(SYNC_STATUS_UPDATED.to_string()),
    })
}

/// Only the completion checkbox, for status propagation.
pub fn page_completion_update(completed: bool) -> PageUpdate {
    PageUpdate {
        completed: Some(completed),
        ..Default::default()
    }
}

/// Reset the manual flag on a page.
pub fn sync_status_update(status: &str) -> PageUpdate {
    PageUpdate {
        sync_status: Some(status.to_string()),
        ..Default::default()
    }
}

pub fn new_task_from_page(page: &Page) -> NewTask {
    NewTask {
        content: page_title(page),
        description: page_description(page),
        due_date: page_due(page),
    }
}

pub fn task_update_from_page(page: &Page) -> TaskUpdate {
    TaskUpdate {
        content: Some(page_title(page)),
        description: Some(page_description(page)),
        due: Some(match page_due(page) {
            Some(date) => DueChange::Set(date),
            None => DueChange::Clear,
        }),
        priority: None,
    }
}

pub fn priority_update(priority: u8) -> TaskUpdate {
    TaskUpdate {
        priority: Some(priority),
        ..Default::default()
    }
}
