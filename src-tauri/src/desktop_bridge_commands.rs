use mahall_lifecycle::{commands, CommandResult, LifecycleOrchestrator};
use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::DialogExt;

use crate::append_desktop_log;

fn orchestrator(app_handle: &AppHandle) -> Option<LifecycleOrchestrator> {
    app_handle
        .try_state::<LifecycleOrchestrator>()
        .map(|state| state.inner().clone())
}

/// Runs a lifecycle command on the blocking pool; one-shot backend runs and
/// window creation must stay off the async runtime and the main thread.
async fn run_lifecycle_command<F>(app_handle: AppHandle, name: &'static str, action: F) -> CommandResult
where
    F: FnOnce(&LifecycleOrchestrator) -> CommandResult + Send + 'static,
{
    let Some(orchestrator) = orchestrator(&app_handle) else {
        return CommandResult::failure("Desktop shell is still starting.");
    };

    match tauri::async_runtime::spawn_blocking(move || action(&orchestrator)).await {
        Ok(result) => result,
        Err(error) => {
            let message = format!("{name} task failed: {error}");
            append_desktop_log(&message);
            CommandResult::failure(message)
        }
    }
}

#[tauri::command]
pub(crate) async fn select_backup_file(app_handle: AppHandle) -> Option<String> {
    let picker_handle = app_handle.clone();
    let picked = tauri::async_runtime::spawn_blocking(move || {
        picker_handle
            .dialog()
            .file()
            .set_title("Select backup archive")
            .add_filter("Backup Archive", &["zip"])
            .blocking_pick_file()
    })
    .await;

    match picked {
        Ok(Some(file_path)) => match file_path.into_path() {
            Ok(path) => Some(path.display().to_string()),
            Err(error) => {
                append_desktop_log(&format!("selected backup is not a local file: {error}"));
                None
            }
        },
        Ok(None) => None,
        Err(error) => {
            append_desktop_log(&format!("backup file picker failed: {error}"));
            None
        }
    }
}

#[tauri::command]
pub(crate) async fn create_backup(app_handle: AppHandle, destination: String) -> CommandResult {
    run_lifecycle_command(app_handle, "create_backup", move |orchestrator| {
        commands::create_backup(orchestrator, &destination)
    })
    .await
}

#[tauri::command]
pub(crate) async fn restore_backup(app_handle: AppHandle, archive_path: String) -> CommandResult {
    run_lifecycle_command(app_handle, "restore_backup", move |orchestrator| {
        commands::restore_backup(orchestrator, &archive_path)
    })
    .await
}

#[tauri::command]
pub(crate) async fn run_migrations(app_handle: AppHandle) -> CommandResult {
    run_lifecycle_command(app_handle, "run_migrations", commands::run_migrations).await
}

#[tauri::command]
pub(crate) async fn run_install_migrations(app_handle: AppHandle) -> CommandResult {
    run_lifecycle_command(
        app_handle,
        "run_install_migrations",
        commands::run_install_migrations,
    )
    .await
}

#[tauri::command]
pub(crate) async fn complete_installation(app_handle: AppHandle) -> CommandResult {
    run_lifecycle_command(
        app_handle,
        "complete_installation",
        commands::complete_installation,
    )
    .await
}

#[tauri::command]
pub(crate) async fn complete_post_install_setup(app_handle: AppHandle) -> CommandResult {
    run_lifecycle_command(
        app_handle,
        "complete_post_install_setup",
        commands::complete_post_install_setup,
    )
    .await
}

#[tauri::command]
pub(crate) async fn backend_ready(app_handle: AppHandle) -> bool {
    let Some(orchestrator) = orchestrator(&app_handle) else {
        return false;
    };

    match tauri::async_runtime::spawn_blocking(move || commands::backend_ready(&orchestrator)).await
    {
        Ok(swapped) => swapped,
        Err(error) => {
            append_desktop_log(&format!("backend_ready task failed: {error}"));
            false
        }
    }
}
