use tauri::AppHandle;

use crate::{append_desktop_log, exit_events, tray_actions, window_actions};

pub fn handle_tray_menu_event(app_handle: &AppHandle, menu_id: &str) {
    match tray_actions::action_from_menu_id(menu_id) {
        Some(tray_actions::TrayMenuAction::ShowWindow) => {
            window_actions::show_main_window(app_handle, append_desktop_log)
        }
        Some(tray_actions::TrayMenuAction::HideWindow) => {
            window_actions::hide_main_window(app_handle, append_desktop_log)
        }
        Some(tray_actions::TrayMenuAction::Quit) => exit_events::request_application_quit(
            app_handle,
            "tray quit requested, stopping backend before exit",
        ),
        None => append_desktop_log(&format!("ignoring unknown tray menu id: {menu_id}")),
    }
}
