//! Manual-Flag Reconciler: out-of-band update requests raised by the user.
//!
//! A Notion page whose `Sync status` is `NeedsUpdate`, or a Todoist task
//! matching the flag filter (priority p3 by default), is pushed to its
//! counterpart and then un-flagged. Failures are isolated per record.

use crate::api::{DocumentService, Page, PageFilter, Task, TaskService};
use crate::error::{Error, Result};
use crate::sync::fields::{
    page_completed, page_todoist_id, page_update_from_task, priority_update,
    sync_status_update, task_update_from_page, todoist_number, SYNC_STATUS_NEEDS_UPDATE,
    SYNC_STATUS_UPDATED,
};
use crate::sync::incremental::{notion_up_to_date_check, todoist_up_to_date_check};
use crate::sync::index::IdentityIndex;
use crate::sync::{Clients, Cursor, SyncOptions, SyncPhase, SyncProgress, SyncReport};

/// Push every Notion page flagged `NeedsUpdate` onto its Todoist task.
pub async fn notion_manual_updates<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    report: &mut SyncReport,
    progress: &dyn SyncProgress,
) -> Result<()> {
    let flagged = clients
        .notion
        .query_database(&PageFilter::SyncStatus(SYNC_STATUS_NEEDS_UPDATE.to_string()))
        .await?;

    for page in &flagged {
        match push_page_to_task(clients, index, page, report, progress).await {
            Ok(todoist_id) => {
                log::info!("Pushed flagged page {} to task {todoist_id}", page.id);
                report.items_updated += 1;
            }
            Err(e) => {
                log::warn!("Failed to push flagged page {}: {e}", page.id);
                report.items_failed += 1;
            }
        }
    }
    Ok(())
}

async fn push_page_to_task<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    page: &Page,
    report: &mut SyncReport,
    progress: &dyn SyncProgress,
) -> Result<String> {
    let todoist_id = match known_task_for(index, page) {
        Some(id) => id,
        None => {
            log::debug!("No task known for page {}, forcing a full Todoist sync", page.id);
            todoist_up_to_date_check(clients, index, Cursor::Unchecked, report, progress).await?;
            known_task_for(index, page).ok_or_else(|| Error::Sync {
                phase: SyncPhase::NotionFlags.to_string(),
                message: format!("page {} has no Todoist counterpart", page.id),
            })?
        }
    };

    clients
        .todoist
        .update_task(&todoist_id, &task_update_from_page(page))
        .await?;
    if page_completed(page) {
        clients.todoist.close_task(&todoist_id).await?;
        report.items_completed += 1;
    }
    clients
        .notion
        .update_page(&page.id, &sync_status_update(SYNC_STATUS_UPDATED))
        .await?;
    index.pair(&todoist_id, &page.id);
    Ok(todoist_id)
}

fn known_task_for(index: &IdentityIndex, page: &Page) -> Option<String> {
    index
        .todoist_for_notion(&page.id)
        .map(str::to_string)
        .or_else(|| page_todoist_id(page))
}

/// Push every Todoist task matching the flag filter onto its Notion page,
/// then reset the task's priority.
pub async fn todoist_manual_updates<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    options: &SyncOptions,
    report: &mut SyncReport,
    progress: &dyn SyncProgress,
) -> Result<()> {
    let flagged = clients
        .todoist
        .list_filtered_tasks(&options.flag_filter)
        .await?;

    for task in &flagged {
        match push_task_to_page(clients, index, task, options, report, progress).await {
            Ok(page_id) => {
                log::info!("Pushed flagged task {} to page {page_id}", task.id);
                report.items_updated += 1;
            }
            Err(e) => {
                log::warn!("Failed to push flagged task {}: {e}", task.id);
                report.items_failed += 1;
            }
        }
    }
    Ok(())
}

async fn push_task_to_page<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
    task: &Task,
    options: &SyncOptions,
    report: &mut SyncReport,
    progress: &dyn SyncProgress,
) -> Result<String> {
    let properties = page_update_from_task(task)?;

    let page_id = match find_page_for(clients, index, task).await? {
        Some(id) => id,
        None => {
            log::debug!("No page known for task {}, forcing a full Notion sync", task.id);
            notion_up_to_date_check(clients, index, Cursor::Unchecked, report, progress).await?;
            index
                .notion_for_todoist(&task.id)
                .map(str::to_string)
                .ok_or_else(|| Error::Sync {
                    phase: SyncPhase::TodoistFlags.to_string(),
                    message: format!("task {} has no Notion counterpart", task.id),
                })?
        }
    };

    clients.notion.update_page(&page_id, &properties).await?;
    clients
        .todoist
        .update_task(&task.id, &priority_update(options.baseline_priority))
        .await?;
    index.pair(&task.id, &page_id);
    Ok(page_id)
}

async fn find_page_for<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &IdentityIndex,
    task: &Task,
) -> Result<Option<String>> {
    if let Some(id) = index.notion_for_todoist(&task.id) {
        return Ok(Some(id.to_string()));
    }
    let pages = clients
        .notion
        .query_database(&PageFilter::TodoistId(todoist_number(&task.id)?))
        .await?;
    Ok(pages.into_iter().next().map(|p| p.id))
}
