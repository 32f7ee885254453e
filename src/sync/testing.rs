//! In-memory fakes of both services for reconciliation tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::fields::{page_completed, page_sync_status, page_todoist_id};
use super::Clients;
use crate::api::{
    props, DateValue, DocumentService, DueChange, NewTask, Page, PageFilter, PageUpdate,
    PropertyValue, RichText, SelectOption, Task, TaskService, TaskUpdate, Due,
};
use crate::date_util::format_date;
use crate::error::{Error, Result};

pub fn task(id: &str, content: &str, created_at: &str) -> Task {
    Task {
        id: id.to_string(),
        content: content.to_string(),
        description: String::new(),
        due: None,
        is_completed: false,
        url: format!("https://todoist.com/showTask?id={id}"),
        created_at: created_at.to_string(),
        priority: 1,
    }
}

pub fn page(id: &str, created_time: &str, title: &str) -> Page {
    let mut page = Page {
        id: id.to_string(),
        created_time: created_time.to_string(),
        archived: false,
        properties: Default::default(),
    };
    apply_page_update(
        &mut page,
        &PageUpdate {
            title: Some(title.to_string()),
            completed: Some(false),
            ..Default::default()
        },
    );
    page
}

fn text(s: &str) -> Vec<RichText> {
    if s.is_empty() {
        vec![]
    } else {
        vec![RichText { plain_text: s.to_string() }]
    }
}

/// Apply a property write the way the Notion API would.
pub fn apply_page_update(page: &mut Page, update: &PageUpdate) {
    let p = &mut page.properties;
    if let Some(ref title) = update.title {
        p.insert(props::TITLE.into(), PropertyValue::Title { title: text(title) });
    }
    if let Some(ref description) = update.description {
        p.insert(
            props::DESCRIPTION.into(),
            PropertyValue::RichText { rich_text: text(description) },
        );
    }
    if let Some(due) = update.due {
        p.insert(
            props::DUE.into(),
            PropertyValue::Date {
                date: due.map(|d| DateValue { start: format_date(d), end: None }),
            },
        );
    }
    if let Some(completed) = update.completed {
        p.insert(props::STATUS.into(), PropertyValue::Checkbox { checkbox: completed });
    }
    if let Some(ref url) = update.url {
        p.insert(
            props::URL.into(),
            PropertyValue::Url { url: Some(url.clone()).filter(|u| !u.is_empty()) },
        );
    }
    if let Some(id) = update.todoist_id {
        p.insert(props::TODOIST_ID.into(), PropertyValue::Number { number: Some(id as f64) });
    }
    if let Some(ref name) = update.sync_status {
        p.insert(
            props::SYNC_STATUS.into(),
            PropertyValue::Select { select: Some(SelectOption { name: name.clone() }) },
        );
    }
}

fn injected(key: &str) -> Error {
    Error::Other(format!("injected failure: {key}"))
}

// ── Todoist ────────────────────────────────────────────────────────

#[derive(Default)]
struct TodoistState {
    tasks: Vec<Task>,
    next_id: u64,
    calls: Vec<String>,
    failures: HashSet<String>,
    hide_completed: bool,
}

impl TodoistState {
    /// Record a call and fail it if a matching failure was injected.
    fn call(&mut self, key: String) -> Result<()> {
        let op = key.split(':').next().unwrap_or_default().to_string();
        self.calls.push(key.clone());
        if self.failures.contains(&key) || self.failures.contains(&op) {
            return Err(injected(&key));
        }
        Ok(())
    }

    fn find(&mut self, id: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("task {id}")))
    }
}

#[derive(Default)]
pub struct FakeTodoist {
    state: Mutex<TodoistState>,
}

impl FakeTodoist {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TodoistState {
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    pub fn insert(&self, task: Task) {
        self.state.lock().unwrap().tasks.push(task);
    }

    /// Add an active task created after every task already present.
    pub fn add(&self, id: &str, content: &str) -> Task {
        let mut state = self.state.lock().unwrap();
        let n = state.tasks.len();
        let t = task(id, content, &format!("2025-01-01T{:02}:{:02}:00Z", n / 60 % 24, n % 60));
        state.tasks.push(t.clone());
        t
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.state.lock().unwrap().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }

    pub fn modify(&self, id: &str, f: impl FnOnce(&mut Task)) {
        let mut state = self.state.lock().unwrap();
        if let Ok(t) = state.find(id) {
            f(t);
        }
    }

    pub fn set_completed(&self, id: &str, completed: bool) {
        self.modify(id, |t| t.is_completed = completed);
    }

    /// Remove a task outright, as if it had been deleted.
    pub fn delete(&self, id: &str) {
        self.state.lock().unwrap().tasks.retain(|t| t.id != id);
    }

    /// Make `get_task` answer 404 for completed tasks, as the REST API does.
    pub fn hide_completed(&self) {
        self.state.lock().unwrap().hide_completed = true;
    }

    /// Fail calls whose key is `op` or `op:id` (e.g. `"update_task:5"`).
    pub fn fail_on(&self, key: &str) {
        self.state.lock().unwrap().failures.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

/// Priority selected by a `pN` filter (Todoist shows p1 as API priority 4).
fn filter_priority(filter: &str) -> Option<u8> {
    let n: u8 = filter.strip_prefix('p')?.parse().ok()?;
    (1..=4).contains(&n).then(|| 5 - n)
}

#[async_trait]
impl TaskService for FakeTodoist {
    async fn list_active_tasks(&self) -> Result<Vec<Task>> {
        let mut state = self.state.lock().unwrap();
        state.call("list_active_tasks".into())?;
        Ok(state.tasks.iter().filter(|t| !t.is_completed).cloned().collect())
    }

    async fn list_filtered_tasks(&self, filter: &str) -> Result<Vec<Task>> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("list_filtered_tasks:{filter}"))?;
        let priority = filter_priority(filter)
            .ok_or_else(|| Error::Todoist { status: 400, message: format!("bad filter {filter}") })?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| !t.is_completed && t.priority == priority)
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("get_task:{id}"))?;
        let hide_completed = state.hide_completed;
        let t = state.find(id)?;
        if hide_completed && t.is_completed {
            return Err(Error::NotFound(format!("task {id}")));
        }
        Ok(t.clone())
    }

    async fn create_task(&self, new: &NewTask) -> Result<Task> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("create_task:{}", new.content))?;
        state.next_id += 1;
        let id = state.next_id.to_string();
        let mut t = task(&id, &new.content, &format!("2025-06-01T00:00:{:0>2}Z", state.next_id % 60));
        t.description = new.description.clone();
        t.due = new.due_date.map(|date| Due {
            date,
            string: None,
            is_recurring: false,
            datetime: None,
        });
        state.tasks.push(t.clone());
        Ok(t)
    }

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("update_task:{id}"))?;
        let t = state.find(id)?;
        if let Some(ref content) = update.content {
            t.content = content.clone();
        }
        if let Some(ref description) = update.description {
            t.description = description.clone();
        }
        match update.due {
            Some(DueChange::Set(date)) => {
                t.due = Some(Due { date, string: None, is_recurring: false, datetime: None })
            }
            Some(DueChange::Clear) => t.due = None,
            None => {}
        }
        if let Some(priority) = update.priority {
            t.priority = priority;
        }
        Ok(t.clone())
    }

    async fn close_task(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("close_task:{id}"))?;
        state.find(id)?.is_completed = true;
        Ok(())
    }

    async fn reopen_task(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("reopen_task:{id}"))?;
        state.find(id)?.is_completed = false;
        Ok(())
    }
}

// ── Notion ─────────────────────────────────────────────────────────

#[derive(Default)]
struct NotionState {
    pages: Vec<Page>,
    next_id: u64,
    calls: Vec<String>,
    failures: HashSet<String>,
}

impl NotionState {
    fn call(&mut self, key: String) -> Result<()> {
        let op = key.split(':').next().unwrap_or_default().to_string();
        self.calls.push(key.clone());
        if self.failures.contains(&key) || self.failures.contains(&op) {
            return Err(injected(&key));
        }
        Ok(())
    }

    fn find(&mut self, id: &str) -> Result<&mut Page> {
        self.pages
            .iter_mut()
            .find(|p| p.id == id && !p.archived)
            .ok_or_else(|| Error::NotFound(format!("page {id}")))
    }
}

#[derive(Default)]
pub struct FakeNotion {
    state: Mutex<NotionState>,
}

impl FakeNotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, page: Page) {
        self.state.lock().unwrap().pages.push(page);
    }

    /// Add an unchecked page created after every page already present.
    pub fn add(&self, id: &str, title: &str) -> Page {
        let mut state = self.state.lock().unwrap();
        let n = state.pages.len();
        let p = page(
            id,
            &format!("2025-01-01T{:02}:{:02}:00.000Z", n / 60 % 24, n % 60),
            title,
        );
        state.pages.push(p.clone());
        p
    }

    pub fn get(&self, id: &str) -> Option<Page> {
        self.state.lock().unwrap().pages.iter().find(|p| p.id == id).cloned()
    }

    pub fn pages(&self) -> Vec<Page> {
        self.state.lock().unwrap().pages.clone()
    }

    pub fn modify(&self, id: &str, update: &PageUpdate) {
        let mut state = self.state.lock().unwrap();
        if let Ok(p) = state.find(id) {
            apply_page_update(p, update);
        }
    }

    pub fn archive(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(p) = state.pages.iter_mut().find(|p| p.id == id) {
            p.archived = true;
        }
    }

    pub fn fail_on(&self, key: &str) {
        self.state.lock().unwrap().failures.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

fn matches_filter(page: &Page, filter: &PageFilter) -> bool {
    match filter {
        PageFilter::TodoistId(id) => {
            page_todoist_id(page).is_some_and(|t| t == id.to_string())
        }
        PageFilter::Active => !page_completed(page),
        PageFilter::SyncStatus(name) => page_sync_status(page).as_deref() == Some(name.as_str()),
    }
}

#[async_trait]
impl DocumentService for FakeNotion {
    async fn query_database(&self, filter: &PageFilter) -> Result<Vec<Page>> {
        let mut state = self.state.lock().unwrap();
        let key = match filter {
            PageFilter::TodoistId(id) => format!("query_database:todoist_id={id}"),
            PageFilter::Active => "query_database:active".to_string(),
            PageFilter::SyncStatus(s) => format!("query_database:sync_status={s}"),
        };
        state.call(key)?;
        // Notion returns newest first; callers must sort.
        Ok(state
            .pages
            .iter()
            .rev()
            .filter(|p| !p.archived && matches_filter(p, filter))
            .cloned()
            .collect())
    }

    async fn create_page(&self, properties: &PageUpdate) -> Result<Page> {
        let mut state = self.state.lock().unwrap();
        state.call(format!(
            "create_page:{}",
            properties.title.as_deref().unwrap_or_default()
        ))?;
        state.next_id += 1;
        let n = state.next_id;
        let mut p = page(
            &format!("page-{n}"),
            &format!("2025-06-01T00:{:0>2}:{:0>2}.000Z", n / 60 % 60, n % 60),
            "",
        );
        apply_page_update(&mut p, properties);
        state.pages.push(p.clone());
        Ok(p)
    }

    async fn update_page(&self, id: &str, properties: &PageUpdate) -> Result<Page> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("update_page:{id}"))?;
        let p = state.find(id)?;
        apply_page_update(p, properties);
        Ok(p.clone())
    }

    async fn retrieve_page(&self, id: &str) -> Result<Page> {
        let mut state = self.state.lock().unwrap();
        state.call(format!("retrieve_page:{id}"))?;
        Ok(state.find(id)?.clone())
    }
}

pub fn fake_clients() -> Clients<FakeTodoist, FakeNotion> {
    Clients::new(FakeTodoist::new(), FakeNotion::new())
}
