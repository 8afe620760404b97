mod app_constants;
mod app_helpers;
mod app_runtime;
mod app_supervisor;
mod app_types;
mod backend_supervisor;
mod close_behavior;
mod desktop_bridge_commands;
mod dev_server;
mod exit_events;
mod exit_state;
mod ipc_bridge;
mod launch_plan;
mod logging;
mod main_window;
mod port_detector;
mod process_control;
mod runtime_mode;
mod runtime_paths;
mod tray_actions;
mod tray_menu_handler;
mod tray_setup;
mod ui_dispatch;
mod update_state;
mod updater_flow;
mod window_actions;
mod window_sizing;
mod window_state;

pub(crate) use app_constants::*;
pub(crate) use app_helpers::{
    append_desktop_error, append_desktop_log, append_desktop_warning, append_shutdown_log,
    append_startup_log, append_update_log, append_update_warning, backend_log_path,
    desktop_log_path,
};
pub(crate) use app_types::{AtomicFlagGuard, BridgeResult, CheckForUpdatesResult};

pub fn run() {
    app_runtime::run();
}
