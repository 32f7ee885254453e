use crate::api::{DocumentService, PageFilter, TaskService};
use crate::error::Result;
use crate::sync::index::IdentityIndex;
use crate::sync::Clients;

/// Initialise the identity index from the current Todoist tasks.
///
/// Every active task is registered; its page is found by searching the
/// database for a matching `TodoistID`. Returns the number of pairs found.
pub async fn seed_index<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    index: &mut IdentityIndex,
) -> Result<usize> {
    let tasks = clients.todoist.list_active_tasks().await?;
    log::info!("Seeding identity index from {} active tasks", tasks.len());

    for task in &tasks {
        index.todoist_index_of(&task.id);
        let Ok(number) = task.id.parse::<u64>() else {
            continue;
        };
        let pages = clients
            .notion
            .query_database(&PageFilter::TodoistId(number))
            .await?;
        if let Some(page) = pages.first() {
            if pages.len() > 1 {
                log::warn!("{} pages claim task {}, using {}", pages.len(), task.id, page.id);
            }
            index.pair(&task.id, &page.id);
        }
    }

    let paired = index.paired_count();
    log::info!("Identity index seeded: {} positions, {paired} paired", index.len());
    Ok(paired)
}
