use std::{
    env,
    ffi::OsString,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopLogCategory {
    Startup,
    Runtime,
    Update,
    Shutdown,
}

impl DesktopLogCategory {
    fn as_label(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::Update => "update",
            Self::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopLogLevel {
    Info,
    Warn,
    Error,
}

impl DesktopLogLevel {
    fn as_label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

pub fn rotate_log_if_needed(path: &Path, max_bytes: u64, backup_count: usize, log_scope: &str) {
    if max_bytes == 0 || backup_count == 0 {
        return;
    }

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(error) => {
            if error.kind() != io::ErrorKind::NotFound {
                eprintln!(
                    "[log rotation:{log_scope}] failed to read metadata for {}: {}",
                    path.display(),
                    error
                );
            }
            return;
        }
    };
    if metadata.len() < max_bytes {
        return;
    }

    remove_if_present(&rotated_log_path(path, backup_count), log_scope);
    for index in (1..backup_count).rev() {
        let source = rotated_log_path(path, index);
        if !source.exists() {
            continue;
        }
        let target = rotated_log_path(path, index + 1);
        remove_if_present(&target, log_scope);
        if let Err(error) = fs::rename(&source, &target) {
            eprintln!(
                "[log rotation:{log_scope}] failed to rename {} to {}: {}",
                source.display(),
                target.display(),
                error
            );
        }
    }

    let rotated = rotated_log_path(path, 1);
    remove_if_present(&rotated, log_scope);
    if let Err(error) = fs::rename(path, &rotated) {
        eprintln!(
            "[log rotation:{log_scope}] failed to rotate {} to {}: {}",
            path.display(),
            rotated.display(),
            error
        );
    }
}

fn remove_if_present(path: &Path, log_scope: &str) {
    if let Err(error) = fs::remove_file(path) {
        if error.kind() != io::ErrorKind::NotFound {
            eprintln!(
                "[log rotation:{log_scope}] failed to remove {}: {}",
                path.display(),
                error
            );
        }
    }
}

fn rotated_log_path(path: &Path, index: usize) -> PathBuf {
    let mut value = OsString::from(path.as_os_str());
    value.push(format!(".{index}"));
    PathBuf::from(value)
}

fn resolve_logs_dir(data_root: Option<PathBuf>) -> PathBuf {
    match data_root {
        Some(root) => root.join("logs"),
        None => env::temp_dir().join("ppop_promt").join("logs"),
    }
}

pub fn resolve_desktop_log_path(
    data_root: Option<PathBuf>,
    path_env: &str,
    desktop_log_file: &str,
) -> PathBuf {
    if let Ok(custom) = env::var(path_env) {
        let candidate = PathBuf::from(custom.trim());
        if !candidate.as_os_str().is_empty() {
            return candidate;
        }
    }

    resolve_logs_dir(data_root).join(desktop_log_file)
}

/// Backend output lands next to the desktop log so both rotate together.
pub fn resolve_backend_log_path(desktop_log_path: &Path, backend_log_file: &str) -> PathBuf {
    match desktop_log_path.parent() {
        Some(parent) => parent.join(backend_log_file),
        None => PathBuf::from(backend_log_file),
    }
}

pub fn format_log_line(
    category: DesktopLogCategory,
    level: DesktopLogLevel,
    message: &str,
) -> String {
    let timestamp = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f %z")
        .to_string();
    format!(
        "[{}] [{}] [{}] {}\n",
        timestamp,
        category.as_label(),
        level.as_label(),
        message
    )
}

pub fn append_log_line(
    path: &Path,
    line: &str,
    max_bytes: u64,
    backup_count: usize,
    log_scope: &str,
    write_lock: &OnceLock<Mutex<()>>,
) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _guard = match write_lock.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    rotate_log_if_needed(path, max_bytes, backup_count, log_scope);
    let _ = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(line.as_bytes()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_log_if_needed_shifts_backups_once_limit_is_reached() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("desktop.log");
        fs::write(&path, b"0123456789").expect("write active log");
        fs::write(rotated_log_path(&path, 1), b"older").expect("write first backup");

        rotate_log_if_needed(&path, 10, 3, "test");

        assert!(!path.exists());
        assert_eq!(
            fs::read(rotated_log_path(&path, 1)).expect("read first backup"),
            b"0123456789"
        );
        assert_eq!(
            fs::read(rotated_log_path(&path, 2)).expect("read second backup"),
            b"older"
        );
    }

    #[test]
    fn rotate_log_if_needed_keeps_small_logs_in_place() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("desktop.log");
        fs::write(&path, b"short").expect("write active log");

        rotate_log_if_needed(&path, 1024, 3, "test");

        assert!(path.exists());
        assert!(!rotated_log_path(&path, 1).exists());
    }

    #[test]
    fn append_log_line_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("logs").join("desktop.log");
        let lock = OnceLock::new();

        append_log_line(&path, "first\n", 1024, 2, "test", &lock);
        append_log_line(&path, "second\n", 1024, 2, "test", &lock);

        assert_eq!(
            fs::read_to_string(&path).expect("read log"),
            "first\nsecond\n"
        );
    }

    #[test]
    fn format_log_line_includes_category_and_level() {
        let line = format_log_line(
            DesktopLogCategory::Update,
            DesktopLogLevel::Warn,
            "feed unavailable",
        );
        assert!(line.contains("[update] [warn] feed unavailable"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn resolve_backend_log_path_uses_desktop_log_directory() {
        let desktop = PathBuf::from("/tmp/ppop/logs/desktop.log");
        assert_eq!(
            resolve_backend_log_path(&desktop, "backend.log"),
            PathBuf::from("/tmp/ppop/logs/backend.log")
        );
    }
}
