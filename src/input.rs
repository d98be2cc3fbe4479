use std::sync::{Arc, Mutex};

use anyhow::Result;
use crossterm::event::KeyCode;
use tokio::runtime::Runtime;

use crate::api::ApiClient;
use crate::errors::BulkError;
use crate::models::{
    select_all_state, ConfirmDelete, ExportFormat, Filter, SelectAllState, Selection,
    StatusDialog, User,
};

const EMPTY_SELECTION_MSG: &str = "Select at least one user first.";

pub fn handle_key(
    key: KeyCode,
    users: &[User],
    selection: &mut Selection,
    cursor: &mut usize,
    filter: &mut Filter,
    confirm: &mut ConfirmDelete,
    status: &Arc<Mutex<StatusDialog>>,
    api: &Arc<ApiClient>,
    rt: &Runtime,
) -> Result<bool> {
    // The status dialog swallows all input while visible. While loading it
    // cannot be dismissed, which also keeps a second bulk request from
    // starting mid-flight.
    {
        let mut st = status.lock().unwrap();
        if st.visible {
            if !st.loading && matches!(key, KeyCode::Esc | KeyCode::Enter) {
                st.dismiss();
            }
            return Ok(true);
        }
    }

    if confirm.visible {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                confirm.visible = false;
                spawn_delete(selection, status, api, rt);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                // Decline: no request, selection untouched.
                confirm.visible = false;
            }
            _ => {}
        }
        return Ok(true);
    }

    if filter.active {
        match key {
            KeyCode::Esc => {
                filter.active = false;
                filter.query.clear();
                *cursor = 0;
            }
            KeyCode::Enter => filter.active = false,
            KeyCode::Backspace => {
                filter.query.pop();
                *cursor = 0;
            }
            KeyCode::Char(c) => {
                filter.query.push(c);
                *cursor = 0;
            }
            _ => {}
        }
        return Ok(true);
    }

    let visible = filter.visible_users(users);
    match key {
        KeyCode::Char('q') => return Ok(false),
        KeyCode::Up | KeyCode::Char('k') => {
            if *cursor > 0 {
                *cursor -= 1;
            }
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if *cursor + 1 < visible.len() {
                *cursor += 1;
            }
        }
        KeyCode::Char(' ') => {
            if let Some(user) = visible.get(*cursor) {
                selection.toggle(user.id);
            }
        }
        KeyCode::Char('a') => {
            // Checked rows flip to none; anything else checks all visible.
            let visible_ids: Vec<u64> = visible.iter().map(|u| u.id).collect();
            let check = select_all_state(selection, &visible_ids) != SelectAllState::Checked;
            selection.set_all(&visible_ids, check);
        }
        KeyCode::Esc => selection.clear(),
        KeyCode::Char('p') => export_selected(ExportFormat::Pdf, selection, status, api, rt),
        KeyCode::Char('c') => export_selected(ExportFormat::Csv, selection, status, api, rt),
        KeyCode::Char('x') => export_selected(ExportFormat::Excel, selection, status, api, rt),
        KeyCode::Char('d') => delete_selected(selection, confirm, status),
        KeyCode::Char('r') => status.lock().unwrap().roster_stale = true,
        KeyCode::Char('/') => filter.active = true,
        _ => {}
    }
    Ok(true)
}

/// Snapshot of the ids an action will operate on; empty selections are the
/// one error that never reaches the network.
fn require_selection(selection: &Selection) -> Result<Vec<u64>, BulkError> {
    if selection.is_empty() {
        Err(BulkError::EmptySelection)
    } else {
        Ok(selection.ids().to_vec())
    }
}

/// Export dispatch: guard against an empty selection, then download in the
/// background while the dialog shows progress.
fn export_selected(
    format: ExportFormat,
    selection: &Selection,
    status: &Arc<Mutex<StatusDialog>>,
    api: &Arc<ApiClient>,
    rt: &Runtime,
) {
    let ids = match require_selection(selection) {
        Ok(ids) => ids,
        Err(err) => {
            tracing::debug!(error = %err, "export skipped");
            status.lock().unwrap().open(EMPTY_SELECTION_MSG);
            return;
        }
    };
    status.lock().unwrap().open_loading(format!(
        "Exporting {} user(s) as {}…",
        ids.len(),
        format.label()
    ));
    tracing::info!(count = ids.len(), format = format.as_str(), "bulk export requested");

    let api = Arc::clone(api);
    let status = Arc::clone(status);
    rt.spawn(async move {
        match api.download_export(format, &ids).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "export saved");
                status
                    .lock()
                    .unwrap()
                    .finish(format!("Export saved to {}", path.display()));
            }
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                status.lock().unwrap().finish(format!("Export failed: {err}"));
            }
        }
    });
}

/// Delete dispatch, first half: guard, then ask for confirmation naming
/// the exact count.
fn delete_selected(
    selection: &Selection,
    confirm: &mut ConfirmDelete,
    status: &Arc<Mutex<StatusDialog>>,
) {
    match require_selection(selection) {
        Ok(ids) => {
            confirm.visible = true;
            confirm.count = ids.len();
        }
        Err(err) => {
            tracing::debug!(error = %err, "delete skipped");
            status.lock().unwrap().open(EMPTY_SELECTION_MSG);
        }
    }
}

/// Delete dispatch, second half, after the user confirmed. The background
/// task reports through the shared dialog; a success flags the roster as
/// stale so the event loop refetches it.
fn spawn_delete(
    selection: &Selection,
    status: &Arc<Mutex<StatusDialog>>,
    api: &Arc<ApiClient>,
    rt: &Runtime,
) {
    let ids = selection.ids().to_vec();
    status
        .lock()
        .unwrap()
        .open_loading(format!("Deleting {} user(s)…", ids.len()));
    tracing::info!(count = ids.len(), "bulk delete confirmed");

    let api = Arc::clone(api);
    let status = Arc::clone(status);
    rt.spawn(async move {
        match api.bulk_delete(&ids).await {
            Ok(deleted) => {
                tracing::info!(deleted, "bulk delete succeeded");
                let mut st = status.lock().unwrap();
                st.finish(format!("{deleted} user(s) deleted"));
                st.roster_stale = true;
            }
            Err(BulkError::Rejected(message)) => {
                tracing::warn!(%message, "bulk delete rejected");
                status.lock().unwrap().finish(message);
            }
            Err(err) => {
                tracing::warn!(error = %err, "bulk delete failed");
                status.lock().unwrap().finish(format!("Delete failed: {err}"));
            }
        }
    });
}
