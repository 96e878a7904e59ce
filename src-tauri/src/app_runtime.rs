use std::sync::Arc;

use mahall_lifecycle::{
    logging, runtime_paths, LifecycleOrchestrator, ShellConfig, WindowHost, WindowRole,
};
use tauri::{AppHandle, Manager, RunEvent, WindowEvent};

use crate::{
    append_desktop_log, append_startup_log, artifact_protocol, exit_events,
    window_actions::{self, TauriWindowHost},
};

fn show_startup_error(app_handle: &AppHandle, message: &str) {
    append_startup_log(&format!("startup failed: {message}"));
    eprintln!("Mahall startup failed: {message}");
    app_handle.exit(1);
}

fn start_lifecycle(app_handle: &AppHandle) -> Result<(), String> {
    let resource_dir = app_handle.path().resource_dir().ok();
    let config = ShellConfig::from_env(resource_dir.as_deref())?;
    append_startup_log(&format!(
        "backend {} at {}, scratch dir {}",
        config.backend_launch.debug_command::<&str>(&[]).join(" "),
        config.backend_url,
        config.scratch_dir.display()
    ));

    let host: Arc<dyn WindowHost> = Arc::new(TauriWindowHost::new(app_handle.clone()));
    let orchestrator = LifecycleOrchestrator::new(config, host);
    app_handle.manage(orchestrator.clone());
    orchestrator.boot().map(|_| ())
}

pub(crate) fn run() {
    if let Some(data_root) = runtime_paths::default_data_root() {
        logging::init_log_dir(runtime_paths::log_dir_for(&data_root));
    }
    append_startup_log("desktop process starting");

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, _args, _cwd| {
            append_desktop_log("second instance launched, focusing existing window");
            window_actions::focus_any_window(app_handle, append_desktop_log);
        }))
        .plugin(tauri_plugin_dialog::init())
        .register_uri_scheme_protocol(artifact_protocol::ARTIFACT_SCHEME, artifact_protocol::handle)
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::select_backup_file,
            crate::desktop_bridge_commands::create_backup,
            crate::desktop_bridge_commands::restore_backup,
            crate::desktop_bridge_commands::run_migrations,
            crate::desktop_bridge_commands::run_install_migrations,
            crate::desktop_bridge_commands::complete_installation,
            crate::desktop_bridge_commands::complete_post_install_setup,
            crate::desktop_bridge_commands::backend_ready,
        ])
        .on_window_event(|window, event| {
            if !matches!(event, WindowEvent::Destroyed) {
                return;
            }
            let Some(role) = WindowRole::from_label(window.label()) else {
                return;
            };
            if let Some(orchestrator) = window.app_handle().try_state::<LifecycleOrchestrator>() {
                orchestrator.handle_window_closed(role);
            }
        })
        .setup(|app| {
            let app_handle = app.handle().clone();
            if let Err(error) = start_lifecycle(&app_handle) {
                show_startup_error(&app_handle, &error);
            }
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { code, .. } => {
                exit_events::handle_exit_requested(app_handle, code);
            }
            RunEvent::Exit => {
                exit_events::handle_exit_event(app_handle);
            }
            _ => {}
        });
}
