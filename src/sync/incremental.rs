//! Incremental Sync Driver: resumable forward scans of each side's active
//! list that create missing counterparts.
//!
//! Each scan starts just past the stored cursor, so a cycle only touches
//! records that appeared since the last pass. Completion state is handled
//! by the shrink check before the scan and the incompletion sweep after it.

use crate::api::{DocumentService, PageFilter, PageUpdate, Task, TaskService};
use crate::error::{Error, Result};
use crate::sync::completion::{
    check_notion_completion, check_notion_incompletion, check_todoist_completion,
    check_todoist_incompletion, reorder_index,
};
use crate::sync::fields::{
    new_task_from_page, page_title, page_todoist_id, page_update_from_task, task_url,
    todoist_number, SYNC_STATUS_UPDATED,
};
use crate::sync::index::IdentityIndex;
use crate::sync::ordering::sort_by_creation_time;
use crate::sync::{Clients, Cursor, SyncPhase, SyncProgress, SyncReport};

/// Bring Notion up to date with Todoist's active tasks.
///
/// Returns the cursor for the next cycle: the last index of the current
/// active list, or [`Cursor::Empty`] when it is empty.
pub async fn notion_up_to_date_check<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    cursor: Cursor,
    report: &mut SyncReport,
    progress: &dyn SyncProgress,
) -> Result<Cursor> {
    let tasks = clients.todoist.list_active_tasks().await?;
    let cursor = check_todoist_completion(clients, index, cursor, tasks.len(), report).await?;

    let mut saw_known = false;
    for task in tasks.iter().skip(cursor.next_index()) {
        if index.notion_for_todoist(&task.id).is_some() {
            saw_known = true;
            continue;
        }
        match create_page_for_task(clients, index, task).await {
            Ok(page_id) => {
                log::info!("Created page {page_id} for task {} (\"{}\")", task.id, task.content);
                report.items_created += 1;
                progress.on_record_created(SyncPhase::TowardNotion, &task.content);
            }
            Err(Error::InvalidIdentifier(msg)) => {
                log::warn!("Skipping task \"{}\": {msg}", task.content);
                report.items_failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if saw_known {
        check_todoist_incompletion(clients, index, &tasks, report).await?;
        reorder_index(clients, index).await?;
    }

    Ok(Cursor::after(tasks.len()))
}

async fn create_page_for_task<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    task: &Task,
) -> Result<String> {
    let properties = page_update_from_task(task)?;
    let page = clients.notion.create_page(&properties).await?;
    index.pair(&task.id, &page.id);
    Ok(page.id)
}

/// Bring Todoist up to date with Notion's active (unchecked) pages.
///
/// The page list is sorted by creation time first so cursor positions are
/// stable across polls.
pub async fn todoist_up_to_date_check<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    cursor: Cursor,
    report: &mut SyncReport,
    progress: &dyn SyncProgress,
) -> Result<Cursor> {
    let mut pages = clients.notion.query_database(&PageFilter::Active).await?;
    let cursor = check_notion_completion(clients, index, cursor, pages.len(), report).await?;
    sort_by_creation_time(&mut pages);

    let mut saw_known = false;
    for page in pages.iter().skip(cursor.next_index()) {
        if index.todoist_for_notion(&page.id).is_some() {
            saw_known = true;
            continue;
        }
        if let Some(todoist_id) = page_todoist_id(page) {
            // Page already points at a task; remember the pairing.
            index.pair(&todoist_id, &page.id);
            saw_known = true;
            continue;
        }

        let title = page_title(page);
        let task = clients.todoist.create_task(&new_task_from_page(page)).await?;
        index.pair(&task.id, &page.id);
        log::info!("Created task {} for page {} (\"{title}\")", task.id, page.id);
        report.items_created += 1;
        progress.on_record_created(SyncPhase::TowardTodoist, &title);

        let link = PageUpdate {
            url: Some(task_url(&task)),
            todoist_id: todoist_number(&task.id).ok(),
            sync_status: Some(SYNC_STATUS_UPDATED.to_string()),
            ..Default::default()
        };
        clients.notion.update_page(&page.id, &link).await?;
    }

    if saw_known {
        check_notion_incompletion(clients, index, &pages, report).await?;
        reorder_index(clients, index).await?;
    }

    Ok(Cursor::after(pages.len()))
}
