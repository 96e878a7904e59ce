//! Operations invoked by the install, post-install and main windows. Every
//! failure is folded into a [`CommandResult`]; nothing here panics or
//! propagates past the IPC boundary.

use std::path::Path;

use crate::{
    app_constants::{BACKEND_ACTION_IN_PROGRESS, BACKUP_VERB, MIGRATE_VERB, RESTORE_VERB},
    app_types::{AtomicFlagGuard, CommandResult},
    backup_archive::{normalize_backup_destination, validate_backup_archive},
    lifecycle::WindowRole,
    logging::{append_desktop_log, append_install_log},
    one_shot::run_one_shot,
    orchestrator::LifecycleOrchestrator,
    readiness::{ProbeOutcome, ReadinessProbe},
};

fn with_backend_action<F>(orchestrator: &LifecycleOrchestrator, action: &str, run: F) -> CommandResult
where
    F: FnOnce() -> Result<(), String>,
{
    let Some(_busy) = AtomicFlagGuard::try_set(orchestrator.backend_busy_flag()) else {
        append_desktop_log(&format!("{action} rejected: another backend action is running"));
        return CommandResult::failure(BACKEND_ACTION_IN_PROGRESS);
    };

    match run() {
        Ok(()) => {
            append_desktop_log(&format!("{action} succeeded"));
            CommandResult::ok()
        }
        Err(error) => {
            append_desktop_log(&format!("{action} failed: {error}"));
            CommandResult::failure(error)
        }
    }
}

fn migrate(orchestrator: &LifecycleOrchestrator) -> Result<(), String> {
    orchestrator
        .supervisor()
        .run_one_shot(MIGRATE_VERB, orchestrator.config().migration_timeout)
        .map_err(|error| format!("Database migration failed: {error}"))
}

fn ensure_backup_tool(tool: &Path, action: &str) -> Result<(), String> {
    if tool.is_file() {
        Ok(())
    } else {
        Err(format!("{action} executable not found: {}", tool.display()))
    }
}

fn run_backup_tool(orchestrator: &LifecycleOrchestrator, verb: &str, target: &Path) -> Result<(), String> {
    let target = target.to_string_lossy().into_owned();
    run_one_shot(
        &orchestrator.config().backup_tool_launch(),
        &[verb, target.as_str()],
        orchestrator.config().backup_timeout,
        orchestrator.supervisor().terminator(),
    )
    .map_err(|error| error.to_string())
}

pub fn run_migrations(orchestrator: &LifecycleOrchestrator) -> CommandResult {
    with_backend_action(orchestrator, "migration", || migrate(orchestrator))
}

pub fn run_install_migrations(orchestrator: &LifecycleOrchestrator) -> CommandResult {
    with_backend_action(orchestrator, "install migration", || {
        append_install_log("running install-time database migration");
        migrate(orchestrator)
    })
}

pub fn create_backup(orchestrator: &LifecycleOrchestrator, destination: &str) -> CommandResult {
    with_backend_action(orchestrator, "backup", || {
        let destination = normalize_backup_destination(destination).map_err(|error| error.to_string())?;
        ensure_backup_tool(&orchestrator.config().backup_tool, "Backup")?;
        run_backup_tool(orchestrator, BACKUP_VERB, &destination)
    })
}

/// Replaces the database and media from `archive_path`. A running backend is
/// stopped for the duration and started again afterwards.
pub fn restore_backup(orchestrator: &LifecycleOrchestrator, archive_path: &str) -> CommandResult {
    with_backend_action(orchestrator, "restore", || {
        ensure_backup_tool(&orchestrator.config().backup_tool, "Restore")?;
        let archive = validate_backup_archive(archive_path).map_err(|error| error.to_string())?;
        orchestrator
            .supervisor()
            .restart_after(|| run_backup_tool(orchestrator, RESTORE_VERB, &archive))
    })
}

/// Migrates, records installation regardless of the migration outcome, and
/// moves on to post-install setup.
pub fn complete_installation(orchestrator: &LifecycleOrchestrator) -> CommandResult {
    let migration = run_install_migrations(orchestrator);
    if !migration.success {
        append_install_log(&format!(
            "install migration failed, continuing: {}",
            migration.message.as_deref().unwrap_or("unknown error")
        ));
    }

    if let Err(error) = orchestrator.markers().mark_installed() {
        append_install_log(&format!("failed to record installation: {error}"));
        return CommandResult::failure(error.to_string());
    }
    append_install_log("installation recorded");

    if let Err(error) = orchestrator.transition(WindowRole::Install, WindowRole::PostInstall) {
        return CommandResult::failure(error);
    }

    if migration.success {
        CommandResult::ok()
    } else {
        CommandResult::ok_with(format!(
            "Installed, but the database could not be prepared: {}",
            migration.message.unwrap_or_default()
        ))
    }
}

pub fn complete_post_install_setup(orchestrator: &LifecycleOrchestrator) -> CommandResult {
    if let Err(error) = orchestrator.markers().mark_post_install_complete() {
        append_install_log(&format!("failed to record post-install setup: {error}"));
        return CommandResult::failure(error.to_string());
    }
    append_install_log("post-install setup recorded");

    orchestrator
        .transition(WindowRole::PostInstall, WindowRole::Main)
        .into()
}

/// Polled by the loading page. Checks the backend once and swaps the main
/// window when it answers; returns whether this call performed the swap.
/// Blocks for up to the probe timeout, so keep it off the async runtime.
pub fn backend_ready(orchestrator: &LifecycleOrchestrator) -> bool {
    if orchestrator.main_swapped() || !orchestrator.is_open(WindowRole::Main) {
        return false;
    }

    let config = orchestrator.config();
    let probe = match ReadinessProbe::new(config.backend_url.clone(), config.ready_probe_timeout) {
        Ok(probe) => probe,
        Err(error) => {
            append_desktop_log(&error);
            return false;
        }
    };
    match probe.probe_once() {
        ProbeOutcome::Ready(status) => {
            append_desktop_log(&format!(
                "loading page saw backend at {} (status {status})",
                probe.url()
            ));
            orchestrator.handle_backend_ready()
        }
        ProbeOutcome::NotReady(_) => false,
    }
}
