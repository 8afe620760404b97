use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

use crate::{
    logging::{self, DesktopLogCategory, DesktopLogLevel},
    runtime_paths, BACKEND_LOG_FILE, DESKTOP_LOG_FILE, DESKTOP_LOG_MAX_BYTES,
    DESKTOP_LOG_PATH_ENV, LOG_BACKUP_COUNT,
};

static DESKTOP_LOG_WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub(crate) fn desktop_log_path() -> PathBuf {
    logging::resolve_desktop_log_path(
        runtime_paths::default_data_root_dir(),
        DESKTOP_LOG_PATH_ENV,
        DESKTOP_LOG_FILE,
    )
}

pub(crate) fn backend_log_path() -> PathBuf {
    logging::resolve_backend_log_path(&desktop_log_path(), BACKEND_LOG_FILE)
}

pub(crate) fn append_desktop_log(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Runtime, DesktopLogLevel::Info, message);
}

pub(crate) fn append_desktop_warning(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Runtime, DesktopLogLevel::Warn, message);
}

pub(crate) fn append_desktop_error(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Runtime, DesktopLogLevel::Error, message);
}

pub(crate) fn append_startup_log(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Startup, DesktopLogLevel::Info, message);
}

pub(crate) fn append_update_log(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Update, DesktopLogLevel::Info, message);
}

pub(crate) fn append_update_warning(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Update, DesktopLogLevel::Warn, message);
}

pub(crate) fn append_shutdown_log(message: &str) {
    append_desktop_log_with(DesktopLogCategory::Shutdown, DesktopLogLevel::Info, message);
}

fn append_desktop_log_with(category: DesktopLogCategory, level: DesktopLogLevel, message: &str) {
    let line = logging::format_log_line(category, level, message);
    logging::append_log_line(
        &desktop_log_path(),
        &line,
        DESKTOP_LOG_MAX_BYTES,
        LOG_BACKUP_COUNT,
        "desktop",
        &DESKTOP_LOG_WRITE_LOCK,
    );
}
