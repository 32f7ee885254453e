use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static RE_NOTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9a-fA-F]{32})$").unwrap());

/// Parse a Todoist task URL into the task id.
///
/// Supported URL patterns:
/// - `https://todoist.com/showTask?id=<id>` (the `url` field of REST v2 tasks)
/// - `https://app.todoist.com/app/task/<id>`
/// - `https://app.todoist.com/app/task/<slug>-<id>`
pub fn parse_todoist_url(input: &str) -> Result<String> {
    let url = url::Url::parse(input).map_err(|e| Error::UrlParse(e.to_string()))?;

    let host = url.host_str().unwrap_or("");
    if !host.contains("todoist.com") {
        return Err(Error::UrlParse(format!("not a Todoist URL: {input}")));
    }

    if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "id") {
        if is_todoist_id(&id) {
            return Ok(id.into_owned());
        }
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    // .../task/<slug>-<id>
    if let Some(pos) = segments.iter().position(|s| *s == "task") {
        if let Some(last) = segments.get(pos + 1) {
            let id = last.rsplit('-').next().unwrap_or(last);
            if is_todoist_id(id) {
                return Ok(id.to_string());
            }
        }
    }

    Err(Error::UrlParse(format!(
        "could not find a task id in Todoist URL: {input}"
    )))
}

/// Generate the canonical Todoist URL for a task id.
pub fn generate_todoist_url(task_id: &str) -> String {
    format!("https://app.todoist.com/app/task/{task_id}")
}

/// Check if a string looks like a Todoist id (non-empty, alphanumeric).
pub fn is_todoist_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Resolve a Notion database id from a raw id or a Notion URL.
///
/// Returns the hyphenated 8-4-4-4-12 form the API echoes back.
pub fn resolve_database_id(input: &str) -> Result<String> {
    let input = input.trim();
    let compact: String = input.chars().filter(|c| *c != '-').collect();
    if compact.len() == 32 && compact.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(hyphenate(&compact));
    }

    if input.contains("notion.so") || input.contains("notion.site") {
        let url = url::Url::parse(input).map_err(|e| Error::UrlParse(e.to_string()))?;
        let last = url
            .path_segments()
            .and_then(|mut s| s.rfind(|seg| !seg.is_empty()))
            .unwrap_or("");
        if let Some(caps) = RE_NOTION_ID.captures(last) {
            return Ok(hyphenate(&caps[1]));
        }
        return Err(Error::UrlParse(format!(
            "no database id found in Notion URL: {input}"
        )));
    }

    Err(Error::InvalidIdentifier(format!(
        "not a Notion database id or URL: {input}"
    )))
}

fn hyphenate(compact: &str) -> String {
    let c = compact.to_ascii_lowercase();
    format!(
        "{}-{}-{}-{}-{}",
        &c[0..8],
        &c[8..12],
        &c[12..16],
        &c[16..20],
        &c[20..32]
    )
}
