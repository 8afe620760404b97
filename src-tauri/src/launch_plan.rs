use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    runtime_mode::RuntimeMode, BACKEND_ENTRY_SCRIPT, BACKEND_PRODUCTION_ARG,
    PACKAGED_BACKEND_BINARY,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub packaged_mode: bool,
}

impl LaunchPlan {
    pub fn debug_command(&self) -> Vec<String> {
        let mut parts = vec![self.cmd.clone()];
        parts.extend(self.args.iter().cloned());
        parts
    }
}

/// Isolated environments checked under the source root, in priority order.
const VIRTUAL_ENV_DIRS: [&str; 2] = [".venv", "venv"];

pub fn resolve_launch_plan(
    mode: RuntimeMode,
    custom_cmd: Option<String>,
    source_root: Option<PathBuf>,
    resource_dir: Option<PathBuf>,
) -> Result<LaunchPlan, String> {
    if let Some(custom_cmd) = custom_cmd
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        let cwd = source_root
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        return resolve_custom_launch(&custom_cmd, cwd);
    }

    match mode {
        RuntimeMode::Packaged => {
            let resource_dir = resource_dir
                .ok_or_else(|| "Packaged resource directory is unavailable.".to_string())?;
            resolve_packaged_launch(&resource_dir)
        }
        RuntimeMode::Development => {
            let source_root = source_root.ok_or_else(|| {
                format!(
                    "Cannot locate the backend source directory containing {BACKEND_ENTRY_SCRIPT}."
                )
            })?;
            Ok(resolve_dev_launch(&source_root, &system_interpreter()))
        }
    }
}

pub fn resolve_custom_launch(custom_cmd: &str, cwd: PathBuf) -> Result<LaunchPlan, String> {
    let mut pieces = shlex::split(custom_cmd)
        .ok_or_else(|| format!("Invalid backend command override: {custom_cmd}"))?;
    if pieces.is_empty() {
        return Err("Backend command override is empty.".to_string());
    }
    let cmd = pieces.remove(0);
    Ok(LaunchPlan {
        cmd,
        args: pieces,
        cwd,
        packaged_mode: false,
    })
}

pub fn resolve_packaged_launch(resource_dir: &Path) -> Result<LaunchPlan, String> {
    let binary = resource_dir.join(PACKAGED_BACKEND_BINARY);
    if !binary.is_file() {
        return Err(format!(
            "Packaged backend executable is missing: {}",
            binary.display()
        ));
    }
    Ok(LaunchPlan {
        cmd: binary.to_string_lossy().to_string(),
        args: vec![BACKEND_PRODUCTION_ARG.to_string()],
        cwd: resource_dir.to_path_buf(),
        packaged_mode: true,
    })
}

pub fn resolve_dev_launch(source_root: &Path, fallback_interpreter: &str) -> LaunchPlan {
    let interpreter = find_virtual_env_interpreter(source_root)
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|| fallback_interpreter.to_string());
    LaunchPlan {
        cmd: interpreter,
        args: vec![
            source_root
                .join(BACKEND_ENTRY_SCRIPT)
                .to_string_lossy()
                .to_string(),
            BACKEND_PRODUCTION_ARG.to_string(),
        ],
        cwd: source_root.to_path_buf(),
        packaged_mode: false,
    }
}

fn find_virtual_env_interpreter(source_root: &Path) -> Option<PathBuf> {
    let relative = if cfg!(target_os = "windows") {
        PathBuf::from("Scripts").join("python.exe")
    } else {
        PathBuf::from("bin").join("python")
    };
    VIRTUAL_ENV_DIRS
        .iter()
        .map(|dir| source_root.join(dir).join(&relative))
        .find(|candidate| candidate.is_file())
}

fn system_interpreter() -> String {
    if cfg!(target_os = "windows") {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}
