//! Completion Reconciler: propagates completed and reopened state
//! between the two services.

use std::collections::HashSet;

use crate::api::{DocumentService, Page, PageFilter, Task, TaskService};
use crate::date_util::parse_timestamp;
use crate::error::Result;
use crate::sync::fields::{page_completed, page_completion_update, page_todoist_id};
use crate::sync::index::IdentityIndex;
use crate::sync::{Clients, Cursor, SyncReport};

/// Snapshot of index entries so the index is not borrowed across awaits.
fn snapshot(index: &IdentityIndex) -> Vec<(usize, Option<String>, Option<String>)> {
    index
        .entries()
        .map(|(i, t, n)| (i, t.map(str::to_string), n.map(str::to_string)))
        .collect()
}

/// Todoist's active list shrank: re-fetch every indexed task and mark the
/// paired page completed for each task that is now done.
///
/// Returns the cursor to resume from, which is `cursor` unchanged unless
/// shrinkage was detected.
pub async fn check_todoist_completion<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &IdentityIndex,
    cursor: Cursor,
    active_len: usize,
    report: &mut SyncReport,
) -> Result<Cursor> {
    if !cursor.shrunk(active_len) {
        return Ok(cursor);
    }
    log::debug!("Todoist active list shrank to {active_len} (cursor {cursor:?}), checking completions");

    for (i, todoist_id, notion_id) in snapshot(index) {
        let Some(todoist_id) = todoist_id else {
            continue;
        };
        // The task endpoint only serves active tasks, so a closed task
        // comes back as 404.
        let completed = match clients.todoist.get_task(&todoist_id).await {
            Ok(t) => t.is_completed,
            Err(e) if e.is_not_found() => {
                log::debug!("Task {todoist_id} at position {i} is no longer active");
                true
            }
            Err(e) => return Err(e),
        };
        if !completed {
            continue;
        }
        let Some(notion_id) = notion_id else {
            log::debug!("Completed task {todoist_id} has no page yet");
            continue;
        };
        match clients
            .notion
            .update_page(&notion_id, &page_completion_update(true))
            .await
        {
            Ok(_) => {
                log::info!("Completed page {notion_id} (task {todoist_id})");
                report.items_completed += 1;
            }
            Err(e) if e.is_not_found() => {
                log::debug!("Page {notion_id} no longer exists, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Cursor::after(active_len))
}

/// Notion's active list shrank: re-fetch every indexed page and close the
/// paired Todoist task for each page that is now checked.
pub async fn check_notion_completion<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &IdentityIndex,
    cursor: Cursor,
    active_len: usize,
    report: &mut SyncReport,
) -> Result<Cursor> {
    if !cursor.shrunk(active_len) {
        return Ok(cursor);
    }
    log::debug!("Notion active list shrank to {active_len} (cursor {cursor:?}), checking completions");

    for (i, todoist_id, notion_id) in snapshot(index) {
        let Some(notion_id) = notion_id else {
            continue;
        };
        let page = match clients.notion.retrieve_page(&notion_id).await {
            Ok(p) => p,
            Err(e) if e.is_not_found() => {
                log::debug!("Page {notion_id} at position {i} no longer exists, skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        if !page_completed(&page) {
            continue;
        }
        let Some(todoist_id) = todoist_id.or_else(|| page_todoist_id(&page)) else {
            log::debug!("Completed page {notion_id} has no Todoist task");
            continue;
        };
        match clients.todoist.close_task(&todoist_id).await {
            Ok(()) => {
                log::info!("Closed task {todoist_id} (page {notion_id})");
                report.items_completed += 1;
            }
            Err(e) if e.is_not_found() => {
                log::debug!("Task {todoist_id} no longer exists, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Cursor::after(active_len))
}

/// For every active Todoist task whose page is checked, uncheck the page.
/// Every task with a page found is folded into the index.
pub async fn check_todoist_incompletion<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    tasks: &[Task],
    report: &mut SyncReport,
) -> Result<()> {
    for task in tasks {
        let Ok(number) = task.id.parse::<u64>() else {
            log::debug!("Task {} has a non-numeric id, cannot look up its page", task.id);
            continue;
        };
        let pages = clients
            .notion
            .query_database(&PageFilter::TodoistId(number))
            .await?;
        // Prefer the page already paired with this task.
        let known = index.notion_for_todoist(&task.id).map(str::to_string);
        let Some(page) = pages
            .iter()
            .find(|p| Some(&p.id) == known.as_ref())
            .or_else(|| pages.first())
        else {
            continue;
        };

        if page_completed(page) {
            clients
                .notion
                .update_page(&page.id, &page_completion_update(false))
                .await?;
            log::info!("Reopened page {} (task {} is active)", page.id, task.id);
            report.items_reopened += 1;
        }
        index.pair(&task.id, &page.id);
    }
    Ok(())
}

/// For every active page whose Todoist task is no longer active, reopen
/// the task. Every page with a known task is folded into the index.
pub async fn check_notion_incompletion<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    pages: &[Page],
    report: &mut SyncReport,
) -> Result<()> {
    let active: HashSet<String> = clients
        .todoist
        .list_active_tasks()
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    for page in pages {
        let Some(todoist_id) = index
            .todoist_for_notion(&page.id)
            .map(str::to_string)
            .or_else(|| page_todoist_id(page))
        else {
            continue;
        };

        if !active.contains(&todoist_id) {
            match clients.todoist.reopen_task(&todoist_id).await {
                Ok(()) => {
                    log::info!("Reopened task {todoist_id} (page {} is active)", page.id);
                    report.items_reopened += 1;
                }
                Err(e) if e.is_not_found() => {
                    log::debug!("Task {todoist_id} no longer exists, leaving page {}", page.id);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        index.pair(&todoist_id, &page.id);
    }
    Ok(())
}

/// Re-sort the index positions by each entry's creation time, fetched
/// from Todoist (or from Notion when the task is unknown). Entries whose
/// records cannot be found sort last. Returns the number of swaps.
pub async fn reorder_index<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
) -> Result<usize> {
    let mut keys = Vec::with_capacity(index.len());
    for (_, todoist_id, notion_id) in snapshot(index) {
        let created = match (todoist_id, notion_id) {
            (Some(id), _) => match clients.todoist.get_task(&id).await {
                Ok(t) => parse_timestamp(&t.created_at),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            (None, Some(id)) => match clients.notion.retrieve_page(&id).await {
                Ok(p) => parse_timestamp(&p.created_time),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            (None, None) => None,
        };
        keys.push((created.is_none(), created));
    }
    let swaps = index.reorder_by(keys);
    if swaps > 0 {
        log::debug!("Identity index re-sorted with {swaps} swaps");
    }
    Ok(swaps)
}
