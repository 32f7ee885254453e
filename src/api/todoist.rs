use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};

use super::rate_limit::retry_api;
use super::{DueChange, NewTask, Task, TaskService, TaskUpdate};
use crate::date_util::format_date;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.todoist.com/rest/v2";

/// Todoist REST v2 client.
#[derive(Clone)]
pub struct TodoistClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl TodoistClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("todoist-notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        })
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Todoist: {body}")));
        }
        Err(Error::Todoist {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn get_tasks(&self, filter: Option<&str>) -> Result<Vec<Task>> {
        let url = self.url("/tasks");
        let resp = retry_api!(self.send(match filter {
            Some(f) => self.http.get(&url).query(&[("filter", f)]),
            None => self.http.get(&url),
        }))?;
        Ok(resp.json().await?)
    }
}

/// JSON body for `POST /tasks/{id}`.
pub(crate) fn update_body(update: &TaskUpdate) -> Value {
    let mut body = Map::new();
    if let Some(ref content) = update.content {
        body.insert("content".into(), json!(content));
    }
    if let Some(ref description) = update.description {
        body.insert("description".into(), json!(description));
    }
    match update.due {
        Some(DueChange::Set(date)) => {
            body.insert("due_date".into(), json!(format_date(date)));
        }
        Some(DueChange::Clear) => {
            body.insert("due_string".into(), json!("no date"));
        }
        None => {}
    }
    if let Some(priority) = update.priority {
        body.insert("priority".into(), json!(priority));
    }
    Value::Object(body)
}

#[async_trait]
impl TaskService for TodoistClient {
    async fn list_active_tasks(&self) -> Result<Vec<Task>> {
        self.get_tasks(None).await
    }

    async fn list_filtered_tasks(&self, filter: &str) -> Result<Vec<Task>> {
        self.get_tasks(Some(filter)).await
    }

    async fn get_task(&self, id: &str) -> Result<Task> {
        let url = self.url(&format!("/tasks/{id}"));
        let resp = retry_api!(self.send(self.http.get(&url)))?;
        Ok(resp.json().await?)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let url = self.url("/tasks");
        let resp = retry_api!(self.send(self.http.post(&url).json(task)))?;
        Ok(resp.json().await?)
    }

    async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Task> {
        let url = self.url(&format!("/tasks/{id}"));
        let body = update_body(update);
        let resp = retry_api!(self.send(self.http.post(&url).json(&body)))?;
        Ok(resp.json().await?)
    }

    async fn close_task(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/tasks/{id}/close"));
        retry_api!(self.send(self.http.post(&url)))?;
        Ok(())
    }

    async fn reopen_task(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/tasks/{id}/reopen"));
        retry_api!(self.send(self.http.post(&url)))?;
        Ok(())
    }
}
