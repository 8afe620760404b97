use std::time::Duration;

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "ppop_promt";
pub(crate) const PACKAGED_FRONTEND_ENTRY: &str = "index.html";
pub(crate) const TRAY_ID: &str = "ppop-promt-tray";
pub(crate) const TRAY_TOOLTIP: &str = "ppop_promt";
pub(crate) const TRAY_ICON_RESOURCE: &str = "icons/tray.png";

pub(crate) const DATA_ROOT_DIR_NAME: &str = ".ppop_promt";
pub(crate) const DESKTOP_LOG_FILE: &str = "desktop.log";
pub(crate) const BACKEND_LOG_FILE: &str = "backend.log";
pub(crate) const DESKTOP_LOG_PATH_ENV: &str = "PPOP_PROMT_DESKTOP_LOG_PATH";
pub(crate) const DESKTOP_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub(crate) const BACKEND_LOG_MAX_BYTES: u64 = 20 * 1024 * 1024;
pub(crate) const LOG_BACKUP_COUNT: usize = 5;

pub(crate) const RUNTIME_MODE_ENV: &str = "PPOP_PROMT_RUNTIME_MODE";
pub(crate) const DEVTOOLS_ENV: &str = "PPOP_PROMT_DEVTOOLS";
pub(crate) const DEV_SERVER_URL_ENV: &str = "PPOP_PROMT_DEV_SERVER_URL";
pub(crate) const DEFAULT_DEV_SERVER_URL: &str = "http://localhost:5173";
pub(crate) const BACKEND_CMD_ENV: &str = "PPOP_PROMT_BACKEND_CMD";
pub(crate) const SOURCE_DIR_ENV: &str = "PPOP_PROMT_SOURCE_DIR";

// Child contract: one positional argument plus ENV=production.
pub(crate) const BACKEND_PRODUCTION_ARG: &str = "prod";
pub(crate) const BACKEND_PRODUCTION_ENV_KEY: &str = "ENV";
pub(crate) const BACKEND_PRODUCTION_ENV_VALUE: &str = "production";
pub(crate) const BACKEND_ENTRY_SCRIPT: &str = "run.py";
#[cfg(target_os = "windows")]
pub(crate) const PACKAGED_BACKEND_BINARY: &str = "ppop_promt_backend.exe";
#[cfg(not(target_os = "windows"))]
pub(crate) const PACKAGED_BACKEND_BINARY: &str = "ppop_promt_backend";
pub(crate) const DEFAULT_BACKEND_PORT: u16 = 8000;

pub(crate) const KILL_GRACE_PERIOD: Duration = Duration::from_millis(1_000);
pub(crate) const SHUTDOWN_WAIT_SLACK: Duration = Duration::from_millis(500);

pub(crate) const DEV_SERVER_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub(crate) const DEV_SERVER_PROBE_TIMEOUT: Duration = Duration::from_millis(400);
pub(crate) const DEV_SERVER_MAX_ATTEMPTS: u32 = 40;

pub(crate) const UPDATE_CHECK_STARTUP_DELAY: Duration = Duration::from_secs(5);
pub(crate) const UPDATE_CHECK_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

pub(crate) const IPC_CONTRACT_VERSION: u32 = 1;

#[cfg(target_os = "windows")]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x0800_0000;
