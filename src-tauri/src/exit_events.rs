use mahall_lifecycle::LifecycleOrchestrator;
use tauri::{AppHandle, Manager};

use crate::append_shutdown_log;

fn shutdown_orchestrator(app_handle: &AppHandle, reason: &str) {
    match app_handle.try_state::<LifecycleOrchestrator>() {
        Some(orchestrator) => orchestrator.shutdown(reason),
        None => append_shutdown_log(&format!("{reason}: lifecycle not initialized, nothing to stop")),
    }
}

pub(crate) fn handle_exit_requested(app_handle: &AppHandle, code: Option<i32>) {
    let reason = match code {
        Some(code) => format!("exit requested with code {code}"),
        None => "exit requested after the last window closed".to_string(),
    };
    shutdown_orchestrator(app_handle, &reason);
}

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    shutdown_orchestrator(app_handle, "application exit");
}
