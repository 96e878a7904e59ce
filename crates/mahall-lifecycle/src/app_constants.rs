use std::time::Duration;

pub const APP_DIR_NAME: &str = "Mahall";

pub const DEFAULT_BACKEND_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_DEV_SERVER_URL: &str = "http://localhost:5174/";
pub const BUNDLED_ENTRY_PATH: &str = "index.html";

pub const EXECUTION_MODE_ENV: &str = "MAHALL_ENV";
pub const NODE_ENV: &str = "NODE_ENV";
pub const BACKEND_BIND_ENV: &str = "MAHALL_BACKEND_BIND";
pub const BACKEND_CMD_ENV: &str = "MAHALL_BACKEND_CMD";
pub const BACKEND_CWD_ENV: &str = "MAHALL_BACKEND_CWD";
pub const BACKEND_SOURCE_DIR_ENV: &str = "MAHALL_BACKEND_SOURCE_DIR";
pub const BACKUP_TOOL_ENV: &str = "MAHALL_BACKUP_TOOL";
pub const DATA_DIR_ENV: &str = "MAHALL_DATA_DIR";
pub const SCRATCH_DIR_ENV: &str = "MAHALL_SCRATCH_DIR";
pub const DEV_SERVER_URL_ENV: &str = "MAHALL_DEV_SERVER_URL";
pub const MIGRATION_TIMEOUT_ENV: &str = "MAHALL_MIGRATION_TIMEOUT_MS";
pub const BACKUP_TIMEOUT_ENV: &str = "MAHALL_BACKUP_TIMEOUT_MS";
pub const READY_SETTLE_ENV: &str = "MAHALL_READY_SETTLE_MS";
pub const READY_POLL_INTERVAL_ENV: &str = "MAHALL_READY_POLL_INTERVAL_MS";

/// Variable the packaged backend reads to locate its per-user data root.
pub const BACKEND_APP_DATA_ENV: &str = "APPDATA";

pub const RUNSERVER_VERB: &str = "runserver";
pub const NORELOAD_FLAG: &str = "--noreload";
pub const MIGRATE_VERB: &str = "migrate";
pub const BACKUP_VERB: &str = "backup";
pub const RESTORE_VERB: &str = "restore";

pub const BACKEND_READY_MARKERS: [&str; 2] =
    ["Starting development server at", "Quit the server with"];

pub const DEFAULT_MIGRATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BACKUP_TIMEOUT_MS: u64 = 5 * 60 * 1000;
pub const ONE_SHOT_TIMEOUT_MIN_MS: u64 = 1_000;
pub const ONE_SHOT_TIMEOUT_MAX_MS: u64 = 60 * 60 * 1000;
pub const DEFAULT_READY_SETTLE_MS: u64 = 2_000;
pub const READY_SETTLE_MAX_MS: u64 = 30_000;
pub const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 1_000;
pub const READY_POLL_INTERVAL_MIN_MS: u64 = 50;
pub const READY_POLL_INTERVAL_MAX_MS: u64 = 10_000;
pub const READY_PROBE_TIMEOUT_MS: u64 = 800;

pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(3);
pub const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const BACKEND_MONITOR_INTERVAL: Duration = Duration::from_millis(500);

pub const DESKTOP_LOG_DIR: &str = "logs";
pub const DESKTOP_LOG_FILE: &str = "desktop.log";
pub const DESKTOP_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const LOG_BACKUP_COUNT: usize = 5;

pub const INSTALLED_MARKER_FILE: &str = "installed.marker";
pub const POST_INSTALL_MARKER_FILE: &str = "post-install-complete.marker";

pub const BACKEND_ACTION_IN_PROGRESS: &str = "Backend action already in progress.";

#[cfg(target_os = "windows")]
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;
