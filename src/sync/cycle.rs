use crate::api::{DocumentService, TaskService};
use crate::error::Result;
use crate::sync::incremental::{notion_up_to_date_check, todoist_up_to_date_check};
use crate::sync::manual::{notion_manual_updates, todoist_manual_updates};
use crate::sync::{
    Clients, Cursor, SyncOptions, SyncPhase, SyncProgress, SyncReport, SyncState,
};

/// Run one polling cycle: toward-Notion, Todoist flags, toward-Todoist,
/// Notion flags, in that order.
///
/// A failing phase is reported and the remaining phases still run. A
/// direction's cursor only advances when its phase succeeds.
pub async fn run_cycle<T: TaskService, D: DocumentService>(
    clients: &Clients<T, D>,
    state: &mut SyncState,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Vec<SyncReport> {
    state.cycles += 1;
    progress.on_cycle_start(state.cycles);
    let mut reports = Vec::with_capacity(4);

    let mut report = SyncReport::new(SyncPhase::TowardNotion);
    let result = notion_up_to_date_check(
        clients,
        &mut state.index,
        state.todoist_cursor,
        &mut report,
        progress,
    )
    .await;
    if let Ok(cursor) = result {
        state.todoist_cursor = cursor;
    }
    reports.push(conclude(report, result.map(Some), progress));

    let mut report = SyncReport::new(SyncPhase::TodoistFlags);
    let result =
        todoist_manual_updates(clients, &mut state.index, options, &mut report, progress).await;
    reports.push(conclude(report, result.map(|()| None), progress));

    let mut report = SyncReport::new(SyncPhase::TowardTodoist);
    let result = todoist_up_to_date_check(
        clients,
        &mut state.index,
        state.notion_cursor,
        &mut report,
        progress,
    )
    .await;
    if let Ok(cursor) = result {
        state.notion_cursor = cursor;
    }
    reports.push(conclude(report, result.map(Some), progress));

    let mut report = SyncReport::new(SyncPhase::NotionFlags);
    let result = notion_manual_updates(clients, &mut state.index, &mut report, progress).await;
    reports.push(conclude(report, result.map(|()| None), progress));

    reports
}

fn conclude(
    mut report: SyncReport,
    result: Result<Option<Cursor>>,
    progress: &dyn SyncProgress,
) -> SyncReport {
    let report = match result {
        Ok(cursor) => {
            report.cursor = cursor;
            report.finish()
        }
        Err(e) => {
            log::error!("{} phase failed: {e}", report.phase);
            report.fail(&e)
        }
    };
    progress.on_phase_complete(&report);
    report
}
