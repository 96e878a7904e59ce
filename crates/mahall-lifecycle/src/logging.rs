use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use chrono::{DateTime, Local, SecondsFormat};

use crate::app_constants::{DESKTOP_LOG_FILE, DESKTOP_LOG_MAX_BYTES, LOG_BACKUP_COUNT};

static DESKTOP_LOG_WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
static DESKTOP_LOG_DIR_PATH: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopLogCategory {
    Startup,
    Runtime,
    Backend,
    Install,
    Shutdown,
}

impl DesktopLogCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::Backend => "backend",
            Self::Install => "install",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Directs log output to `log_dir`. Only the first call takes effect; until
/// then lines go to stderr.
pub fn init_log_dir(log_dir: PathBuf) -> bool {
    DESKTOP_LOG_DIR_PATH.set(log_dir).is_ok()
}

pub fn resolve_desktop_log_path(log_dir: Option<&Path>, file_name: &str) -> Option<PathBuf> {
    log_dir.map(|dir| dir.join(file_name))
}

pub fn format_log_line(
    category: DesktopLogCategory,
    message: &str,
    timestamp: DateTime<Local>,
) -> String {
    format!(
        "[{}] [{}] {}",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
        category.as_str(),
        message.trim_end()
    )
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(format!(".{index}"));
    PathBuf::from(raw)
}

pub fn rotate_log_if_needed(path: &Path, max_bytes: u64, backup_count: usize) -> io::Result<()> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    };
    if size < max_bytes {
        return Ok(());
    }

    if backup_count == 0 {
        return fs::remove_file(path);
    }

    let oldest = backup_path(path, backup_count);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for index in (1..backup_count).rev() {
        let source = backup_path(path, index);
        if source.exists() {
            fs::rename(&source, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

pub fn append_log_line(
    path: &Path,
    line: &str,
    max_bytes: u64,
    backup_count: usize,
    write_lock: &OnceLock<Mutex<()>>,
) -> io::Result<()> {
    let lock = write_lock.get_or_init(|| Mutex::new(()));
    let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_log_if_needed(path, max_bytes, backup_count)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

pub fn append_desktop_log_with_category(category: DesktopLogCategory, message: &str) {
    let line = format_log_line(category, message, Local::now());
    let Some(path) = resolve_desktop_log_path(
        DESKTOP_LOG_DIR_PATH.get().map(PathBuf::as_path),
        DESKTOP_LOG_FILE,
    ) else {
        eprintln!("{line}");
        return;
    };

    if let Err(error) = append_log_line(
        &path,
        &line,
        DESKTOP_LOG_MAX_BYTES,
        LOG_BACKUP_COUNT,
        &DESKTOP_LOG_WRITE_LOCK,
    ) {
        eprintln!("{line}");
        eprintln!("failed to write desktop log {}: {error}", path.display());
    }
}

pub fn append_desktop_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Runtime, message);
}

pub fn append_startup_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Startup, message);
}

pub fn append_backend_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Backend, message);
}

pub fn append_install_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Install, message);
}

pub fn append_shutdown_log(message: &str) {
    append_desktop_log_with_category(DesktopLogCategory::Shutdown, message);
}
