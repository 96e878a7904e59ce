use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use url::Url;

use crate::{
    app_constants::*,
    launch_plan::{
        backup_tool_executable_name, resolve_custom_launch, resolve_dev_launch,
        resolve_packaged_launch, LaunchPlan,
    },
    runtime_paths::{self, env_path},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Development,
    Production,
}

impl ExecutionMode {
    pub fn from_env_value(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "dev" || value == "development" => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// What the main window shows once the backend is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEntry {
    DevServer(Url),
    Bundled(String),
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub mode: ExecutionMode,
    pub data_root: PathBuf,
    pub scratch_dir: PathBuf,
    pub backend_bind: String,
    pub backend_url: String,
    pub backend_launch: LaunchPlan,
    pub backup_tool: PathBuf,
    pub app_entry: AppEntry,
    pub migration_timeout: Duration,
    pub backup_timeout: Duration,
    pub ready_settle: Duration,
    pub ready_poll_interval: Duration,
    pub ready_probe_timeout: Duration,
}

impl ShellConfig {
    pub fn from_env(resource_dir: Option<&Path>) -> Result<Self, String> {
        let mode = ExecutionMode::from_env_value(
            env_trimmed(EXECUTION_MODE_ENV)
                .or_else(|| env_trimmed(NODE_ENV))
                .as_deref(),
        );
        let data_root = runtime_paths::default_data_root().ok_or_else(|| {
            format!("Cannot resolve the per-user data directory. Set {DATA_DIR_ENV}.")
        })?;
        let backend_bind =
            env_trimmed(BACKEND_BIND_ENV).unwrap_or_else(|| DEFAULT_BACKEND_BIND.to_string());

        let launch = resolve_backend_launch(mode, resource_dir)?;
        let backup_tool = env_path(BACKUP_TOOL_ENV)
            .unwrap_or_else(|| launch.cwd.join(backup_tool_executable_name()));
        let app_entry = match mode {
            ExecutionMode::Development => {
                let raw = env_trimmed(DEV_SERVER_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_DEV_SERVER_URL.to_string());
                let normalized = normalize_http_url(&raw, DEFAULT_DEV_SERVER_URL);
                AppEntry::DevServer(
                    Url::parse(&normalized)
                        .map_err(|error| format!("Invalid dev server URL {normalized}: {error}"))?,
                )
            }
            ExecutionMode::Production => AppEntry::Bundled(BUNDLED_ENTRY_PATH.to_string()),
        };

        Ok(Self {
            mode,
            backend_url: backend_url_for_bind(&backend_bind),
            backend_launch: with_backend_data_env(launch, &data_root),
            scratch_dir: runtime_paths::default_scratch_dir(),
            data_root,
            backend_bind,
            backup_tool,
            app_entry,
            migration_timeout: env_duration_ms(
                MIGRATION_TIMEOUT_ENV,
                DEFAULT_MIGRATION_TIMEOUT_MS,
                ONE_SHOT_TIMEOUT_MIN_MS,
                ONE_SHOT_TIMEOUT_MAX_MS,
            ),
            backup_timeout: env_duration_ms(
                BACKUP_TIMEOUT_ENV,
                DEFAULT_BACKUP_TIMEOUT_MS,
                ONE_SHOT_TIMEOUT_MIN_MS,
                ONE_SHOT_TIMEOUT_MAX_MS,
            ),
            ready_settle: env_duration_ms(
                READY_SETTLE_ENV,
                DEFAULT_READY_SETTLE_MS,
                0,
                READY_SETTLE_MAX_MS,
            ),
            ready_poll_interval: env_duration_ms(
                READY_POLL_INTERVAL_ENV,
                DEFAULT_READY_POLL_INTERVAL_MS,
                READY_POLL_INTERVAL_MIN_MS,
                READY_POLL_INTERVAL_MAX_MS,
            ),
            ready_probe_timeout: Duration::from_millis(READY_PROBE_TIMEOUT_MS),
        })
    }

    /// Launch plan for the backup/restore tool, sharing the backend's data
    /// environment.
    pub fn backup_tool_launch(&self) -> LaunchPlan {
        let cwd = self
            .backup_tool
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.backend_launch.cwd.clone());
        with_backend_data_env(LaunchPlan::for_executable(&self.backup_tool, cwd), &self.data_root)
    }
}

fn resolve_backend_launch(
    mode: ExecutionMode,
    resource_dir: Option<&Path>,
) -> Result<LaunchPlan, String> {
    if let Some(custom_cmd) = env_trimmed(BACKEND_CMD_ENV) {
        let cwd = env_path(BACKEND_CWD_ENV)
            .or_else(runtime_paths::detect_backend_source_root)
            .unwrap_or_else(runtime_paths::workspace_root_dir);
        return resolve_custom_launch(&custom_cmd, cwd);
    }

    match (mode, resource_dir) {
        (ExecutionMode::Production, Some(resource_dir)) => Ok(resolve_packaged_launch(resource_dir)),
        (ExecutionMode::Production, None) => {
            Err("Cannot locate packaged backend: resource directory is unavailable.".to_string())
        }
        (ExecutionMode::Development, _) => {
            let source_root = runtime_paths::detect_backend_source_root()
                .unwrap_or_else(|| runtime_paths::workspace_root_dir().join("backend"));
            Ok(resolve_dev_launch(source_root))
        }
    }
}

/// Points the backend at the same user-data root the shell uses.
pub fn with_backend_data_env(plan: LaunchPlan, data_root: &Path) -> LaunchPlan {
    let plan = plan.with_env(DATA_DIR_ENV, data_root.as_os_str());
    match data_root.parent() {
        Some(app_data_base) => plan.with_env(BACKEND_APP_DATA_ENV, app_data_base.as_os_str()),
        None => plan,
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_duration_ms(key: &str, default_ms: u64, min_ms: u64, max_ms: u64) -> Duration {
    parse_clamped_ms(env_trimmed(key).as_deref(), default_ms, min_ms, max_ms)
}

pub fn parse_clamped_ms(raw: Option<&str>, default_ms: u64, min_ms: u64, max_ms: u64) -> Duration {
    let value = raw
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(value.clamp(min_ms, max_ms))
}

pub fn normalize_http_url(raw: &str, default_url: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default_url.to_string();
    }

    match Url::parse(trimmed) {
        Ok(mut parsed) if matches!(parsed.scheme(), "http" | "https") => {
            if parsed.path().is_empty() {
                parsed.set_path("/");
            }
            parsed.to_string()
        }
        _ => default_url.to_string(),
    }
}

pub fn backend_url_for_bind(bind: &str) -> String {
    let default_url = format!("http://{DEFAULT_BACKEND_BIND}/");
    normalize_http_url(&format!("http://{}/", bind.trim()), &default_url)
}
