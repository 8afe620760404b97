use std::process::{Command, Stdio};
use tauri::{AppHandle, Manager};
use url::Url;

use crate::{
    app_supervisor::ApplicationSupervisor, append_desktop_log, updater_flow, BridgeResult,
    CheckForUpdatesResult, IPC_CONTRACT_VERSION,
};

fn parse_openable_url(raw_url: &str) -> Result<Url, String> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err("Missing external URL.".to_string());
    }

    let parsed = Url::parse(trimmed).map_err(|error| format!("Invalid URL: {error}"))?;
    match parsed.scheme() {
        "http" | "https" | "mailto" => Ok(parsed),
        scheme => Err(format!(
            "Unsupported URL scheme '{scheme}', only http/https/mailto are allowed."
        )),
    }
}

#[cfg(target_os = "macos")]
fn open_url_with_system_browser(url: &str) -> Result<(), String> {
    Command::new("open")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run 'open': {error}"))
}

#[cfg(target_os = "windows")]
fn open_url_with_system_browser(url: &str) -> Result<(), String> {
    Command::new("rundll32")
        .args(["url.dll,FileProtocolHandler", url])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run 'rundll32': {error}"))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_url_with_system_browser(url: &str) -> Result<(), String> {
    Command::new("xdg-open")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run 'xdg-open': {error}"))
}

#[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
fn open_url_with_system_browser(_url: &str) -> Result<(), String> {
    Err("Opening external URLs is not supported on this platform.".to_string())
}

#[tauri::command]
pub(crate) async fn check_for_updates(app_handle: AppHandle) -> CheckForUpdatesResult {
    updater_flow::check_for_updates(&app_handle).await
}

#[tauri::command]
pub(crate) async fn download_update(app_handle: AppHandle) -> BridgeResult {
    updater_flow::download_update(&app_handle).await
}

#[tauri::command]
pub(crate) async fn quit_and_install(app_handle: AppHandle) {
    updater_flow::quit_and_install(&app_handle).await;
}

#[tauri::command]
pub(crate) fn open_external(url: String) -> BridgeResult {
    let parsed = match parse_openable_url(&url) {
        Ok(parsed) => parsed,
        Err(error) => {
            append_desktop_log(&format!("open-external rejected: {error}"));
            return BridgeResult::failed(error);
        }
    };

    match open_url_with_system_browser(parsed.as_ref()) {
        Ok(()) => BridgeResult::ok(),
        Err(error) => BridgeResult::failed(error),
    }
}

#[tauri::command]
pub(crate) fn get_app_version(app_handle: AppHandle) -> String {
    app_handle.package_info().version.to_string()
}

#[tauri::command]
pub(crate) fn get_backend_port(app_handle: AppHandle) -> u16 {
    app_handle.state::<ApplicationSupervisor>().backend_port()
}

#[tauri::command]
pub(crate) fn get_ipc_contract_version() -> u32 {
    IPC_CONTRACT_VERSION
}
