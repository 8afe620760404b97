use std::{
    env,
    path::{Path, PathBuf},
};
use tauri::{path::BaseDirectory, AppHandle, Manager};

use crate::{BACKEND_ENTRY_SCRIPT, DATA_ROOT_DIR_NAME, SOURCE_DIR_ENV};

pub fn default_data_root_dir() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(DATA_ROOT_DIR_NAME))
}

pub fn resolve_resource_path<F>(app: &AppHandle, relative_path: &str, log: F) -> Option<PathBuf>
where
    F: Fn(&str),
{
    match app.path().resolve(relative_path, BaseDirectory::Resource) {
        Ok(path) if path.exists() => Some(path),
        Ok(path) => {
            log(&format!("resource not found: {}", path.display()));
            None
        }
        Err(error) => {
            log(&format!(
                "failed to resolve resource path {relative_path}: {error}"
            ));
            None
        }
    }
}

pub fn resource_dir(app: &AppHandle) -> Result<PathBuf, String> {
    app.path()
        .resource_dir()
        .map_err(|error| format!("Failed to resolve resource directory: {error}"))
}

/// Repository root during development: `src-tauri/..`.
pub fn workspace_root_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    candidate
        .canonicalize()
        .unwrap_or_else(|_| candidate.to_path_buf())
}

pub fn detect_backend_source_root() -> Option<PathBuf> {
    let explicit_source_dir = env::var(SOURCE_DIR_ENV)
        .ok()
        .map(|value| PathBuf::from(value.trim()))
        .filter(|value| !value.as_os_str().is_empty());
    detect_backend_source_root_with(workspace_root_dir(), explicit_source_dir)
}

fn detect_backend_source_root_with(
    workspace_root: PathBuf,
    explicit_source_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    let candidates = explicit_source_dir
        .into_iter()
        .chain([workspace_root.clone(), workspace_root.join("backend")]);
    for candidate in candidates {
        if is_backend_source_dir(&candidate) {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }
    None
}

fn is_backend_source_dir(candidate: &Path) -> bool {
    candidate.join(BACKEND_ENTRY_SCRIPT).is_file()
}
