use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::rate_limit::retry_api;
use super::{props, DocumentService, Page, PageFilter, PageUpdate};
use crate::date_util::format_date;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";
const QUERY_PAGE_SIZE: u32 = 100;
/// Longest `content` Notion accepts in a single rich-text object.
const RICH_TEXT_LIMIT: usize = 2000;

/// Notion API client bound to a single database.
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl NotionClient {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("todoist-notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            database_id: database_id.into(),
        })
    }

    /// Point the client at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("Notion: {message}")));
        }
        Err(Error::Notion {
            status: status.as_u16(),
            message,
        })
    }
}

/// Notion filter object for a [`PageFilter`].
pub(crate) fn filter_json(filter: &PageFilter) -> Value {
    match filter {
        PageFilter::TodoistId(id) => json!({
            "property": props::TODOIST_ID,
            "number": { "equals": id },
        }),
        PageFilter::Active => json!({
            "property": props::STATUS,
            "checkbox": { "equals": false },
        }),
        PageFilter::SyncStatus(name) => json!({
            "property": props::SYNC_STATUS,
            "select": { "equals": name },
        }),
    }
}

/// Rich-text array for `text`, split on char boundaries into chunks of at
/// most [`RICH_TEXT_LIMIT`] chars.
fn text_fragments(text: &str) -> Value {
    let mut fragments = Vec::new();
    let mut start = 0;
    for (n, (offset, _)) in text.char_indices().enumerate() {
        if n > 0 && n % RICH_TEXT_LIMIT == 0 {
            fragments.push(&text[start..offset]);
            start = offset;
        }
    }
    if start < text.len() {
        fragments.push(&text[start..]);
    }
    Value::Array(
        fragments
            .into_iter()
            .map(|content| json!({ "type": "text", "text": { "content": content } }))
            .collect(),
    )
}

/// Notion `properties` object for a [`PageUpdate`].
pub(crate) fn properties_json(update: &PageUpdate) -> Value {
    let mut properties = Map::new();
    if let Some(ref title) = update.title {
        properties.insert(props::TITLE.into(), json!({ "title": text_fragments(title) }));
    }
    if let Some(ref description) = update.description {
        properties.insert(
            props::DESCRIPTION.into(),
            json!({ "rich_text": text_fragments(description) }),
        );
    }
    if let Some(due) = update.due {
        let date = match due {
            Some(d) => json!({ "start": format_date(d) }),
            None => Value::Null,
        };
        properties.insert(props::DUE.into(), json!({ "date": date }));
    }
    if let Some(completed) = update.completed {
        properties.insert(props::STATUS.into(), json!({ "checkbox": completed }));
    }
    if let Some(ref url) = update.url {
        let url = if url.is_empty() { Value::Null } else { json!(url) };
        properties.insert(props::URL.into(), json!({ "url": url }));
    }
    if let Some(id) = update.todoist_id {
        properties.insert(props::TODOIST_ID.into(), json!({ "number": id }));
    }
    if let Some(ref name) = update.sync_status {
        properties.insert(props::SYNC_STATUS.into(), json!({ "select": { "name": name } }));
    }
    Value::Object(properties)
}

#[async_trait]
impl DocumentService for NotionClient {
    async fn query_database(&self, filter: &PageFilter) -> Result<Vec<Page>> {
        let url = self.url(&format!("/databases/{}/query", self.database_id));
        let filter = filter_json(filter);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = json!({ "filter": filter, "page_size": QUERY_PAGE_SIZE });
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }
            let resp = retry_api!(self.send(self.http.post(&url).json(&body)))?;
            let batch: QueryResponse = resp.json().await?;
            pages.extend(batch.results);
            match (batch.has_more, batch.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(pages)
    }

    async fn create_page(&self, properties: &PageUpdate) -> Result<Page> {
        let url = self.url("/pages");
        let body = json!({
            "parent": { "type": "database_id", "database_id": self.database_id },
            "properties": properties_json(properties),
        });
        let resp = retry_api!(self.send(self.http.post(&url).json(&body)))?;
        Ok(resp.json().await?)
    }

    async fn update_page(&self, id: &str, properties: &PageUpdate) -> Result<Page> {
        let url = self.url(&format!("/pages/{id}"));
        let body = json!({ "properties": properties_json(properties) });
        let resp = retry_api!(self.send(self.http.patch(&url).json(&body)))?;
        Ok(resp.json().await?)
    }

    async fn retrieve_page(&self, id: &str) -> Result<Page> {
        let url = self.url(&format!("/pages/{id}"));
        let resp = retry_api!(self.send(self.http.get(&url)))?;
        Ok(resp.json().await?)
    }
}
