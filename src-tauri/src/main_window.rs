use std::{env, path::PathBuf};

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use url::Url;

use crate::{
    app_supervisor::ApplicationSupervisor,
    append_desktop_error, append_startup_log,
    dev_server::{self, DevServerWait, PollPolicy},
    runtime_mode::{self, RuntimeMode},
    ui_dispatch,
    window_sizing::{self, WindowSize},
    DEFAULT_DEV_SERVER_URL, DEV_SERVER_MAX_ATTEMPTS, DEV_SERVER_POLL_INTERVAL,
    DEV_SERVER_PROBE_TIMEOUT, DEV_SERVER_URL_ENV, MAIN_WINDOW_LABEL, MAIN_WINDOW_TITLE,
    PACKAGED_FRONTEND_ENTRY,
};

// Used when no monitor information is available.
const FALLBACK_WORK_AREA: (f64, f64) = (1920.0, 1080.0);

const DEV_SERVER_POLL_POLICY: PollPolicy = PollPolicy {
    interval: DEV_SERVER_POLL_INTERVAL,
    probe_timeout: DEV_SERVER_PROBE_TIMEOUT,
    max_attempts: DEV_SERVER_MAX_ATTEMPTS,
};

pub fn dev_server_url() -> Result<Url, String> {
    let raw = env::var(DEV_SERVER_URL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DEV_SERVER_URL.to_string());
    dev_server::parse_dev_server_url(&raw)
}

fn main_window_url(app_handle: &AppHandle, mode: RuntimeMode) -> Result<WebviewUrl, String> {
    match mode {
        RuntimeMode::Development => Ok(WebviewUrl::External(dev_server_url()?)),
        RuntimeMode::Packaged => {
            if app_handle
                .asset_resolver()
                .get(PACKAGED_FRONTEND_ENTRY.to_string())
                .is_none()
            {
                return Err(format!(
                    "Packaged frontend asset is missing: {PACKAGED_FRONTEND_ENTRY}"
                ));
            }
            Ok(WebviewUrl::App(PathBuf::from(PACKAGED_FRONTEND_ENTRY)))
        }
    }
}

fn initial_size(app_handle: &AppHandle, packaged: bool) -> WindowSize {
    let (width, height) = match app_handle.primary_monitor() {
        Ok(Some(monitor)) => {
            let area = monitor
                .work_area()
                .size
                .to_logical::<f64>(monitor.scale_factor());
            (area.width, area.height)
        }
        Ok(None) => FALLBACK_WORK_AREA,
        Err(error) => {
            append_startup_log(&format!("failed to read primary monitor: {error}"));
            FALLBACK_WORK_AREA
        }
    };
    window_sizing::initial_window_size(width, height, packaged)
}

/// Builds the main window if it does not exist yet. Must run on the main thread.
pub fn create_main_window(app_handle: &AppHandle) -> Result<(), String> {
    if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_some() {
        return Ok(());
    }
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    let Some(_creating) = supervisor.window_creation_guard() else {
        return Err("Main window is already being created.".to_string());
    };

    let mode = supervisor.mode();
    let url = main_window_url(app_handle, mode)?;
    let size = initial_size(app_handle, mode.is_packaged());
    let mut builder = WebviewWindowBuilder::new(app_handle, MAIN_WINDOW_LABEL, url)
        .title(MAIN_WINDOW_TITLE)
        .inner_size(size.width, size.height)
        .center();
    if let Some(minimum) = window_sizing::minimum_window_size(mode.is_packaged()) {
        builder = builder.min_inner_size(minimum.width, minimum.height);
    }
    let window = builder
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))?;
    append_startup_log(&format!(
        "main window created: {}x{} ({})",
        size.width,
        size.height,
        mode.as_str()
    ));

    if runtime_mode::devtools_requested(mode) {
        #[cfg(any(debug_assertions, feature = "devtools"))]
        window.open_devtools();
        #[cfg(not(any(debug_assertions, feature = "devtools")))]
        {
            let _ = &window;
            append_startup_log("devtools requested but not compiled into this build");
        }
    }
    Ok(())
}

pub fn report_window_error(app_handle: &AppHandle, error: &str) {
    append_desktop_error(&format!("main window failed to load: {error}"));
    ui_dispatch::show_error_dialog(
        app_handle,
        MAIN_WINDOW_TITLE,
        &format!("The ppop_promt window could not be opened.\n\n{error}"),
    );
}

/// Waits for the dev server in development mode, then creates the window on the main thread.
pub fn spawn_main_window_startup(app_handle: AppHandle) {
    tauri::async_runtime::spawn(async move {
        let mode = app_handle.state::<ApplicationSupervisor>().mode();
        let load_report = if mode == RuntimeMode::Development {
            wait_for_dev_server().await
        } else {
            None
        };

        if let Err(error) = ui_dispatch::run_on_main_thread_dispatch(
            &app_handle,
            "create main window",
            move |main_app| {
                if let Err(error) = create_main_window(main_app) {
                    report_window_error(main_app, &error);
                    return;
                }
                if let Some(report) = load_report.as_deref() {
                    append_desktop_error(&format!("main window content unavailable: {report}"));
                    ui_dispatch::show_error_dialog(main_app, MAIN_WINDOW_TITLE, report);
                }
            },
        ) {
            append_desktop_error(&error);
        }
    });
}

/// Returns a user-facing report when the dev server never became reachable.
async fn wait_for_dev_server() -> Option<String> {
    let url = match dev_server_url() {
        Ok(url) => url,
        Err(error) => {
            append_startup_log(&format!("skipping dev server wait: {error}"));
            return Some(error);
        }
    };
    append_startup_log(&format!("waiting for dev server at {url}"));
    let probe_url = url.clone();
    let wait = tauri::async_runtime::spawn_blocking(move || {
        dev_server::wait_for_dev_server(
            DEV_SERVER_POLL_POLICY,
            || dev_server::probe_dev_server(&probe_url, DEV_SERVER_POLL_POLICY.probe_timeout),
            append_startup_log,
        )
    })
    .await;
    match wait {
        Ok(outcome) => {
            if let DevServerWait::Ready { attempts } = outcome {
                append_startup_log(&format!("dev server reachable after {attempts} attempt(s)"));
            }
            dev_server::dev_server_wait_report(&url, outcome)
        }
        Err(error) => {
            append_startup_log(&format!("dev server wait task failed: {error}"));
            None
        }
    }
}
