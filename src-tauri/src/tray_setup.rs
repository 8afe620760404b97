use tauri::{
    image::Image,
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Manager,
};

use crate::{
    app_supervisor::ApplicationSupervisor, append_desktop_log, append_desktop_warning,
    runtime_paths, tray_actions, tray_menu_handler, window_actions, TRAY_ICON_RESOURCE, TRAY_ID,
    TRAY_TOOLTIP,
};

fn resolve_tray_icon(app_handle: &AppHandle) -> Option<Image<'static>> {
    if let Some(path) =
        runtime_paths::resolve_resource_path(app_handle, TRAY_ICON_RESOURCE, append_desktop_log)
    {
        match Image::from_path(&path) {
            Ok(image) => return Some(image),
            Err(error) => append_desktop_warning(&format!(
                "failed to load tray icon {}: {error}",
                path.display()
            )),
        }
    }

    app_handle
        .default_window_icon()
        .map(|icon| Image::new_owned(icon.rgba().to_vec(), icon.width(), icon.height()))
}

/// Returns `Ok(false)` when the tray was skipped (already created or no icon available).
pub fn setup_tray(app_handle: &AppHandle) -> Result<bool, String> {
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if supervisor.is_tray_created() {
        append_desktop_log("tray already created, skipping");
        return Ok(false);
    }
    let Some(icon) = resolve_tray_icon(app_handle) else {
        append_desktop_warning("no tray icon asset found, skipping tray creation");
        return Ok(false);
    };

    let show_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_SHOW_WINDOW,
        "Show",
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray show menu item: {error}"))?;
    let hide_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_HIDE_WINDOW,
        "Hide",
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray hide menu item: {error}"))?;
    let quit_item = MenuItem::with_id(
        app_handle,
        tray_actions::TRAY_MENU_QUIT,
        "Quit",
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create tray quit menu item: {error}"))?;
    let separator = PredefinedMenuItem::separator(app_handle)
        .map_err(|error| format!("Failed to create tray separator menu item: {error}"))?;

    let menu = Menu::with_items(app_handle, &[&show_item, &hide_item, &separator, &quit_item])
        .map_err(|error| format!("Failed to build tray menu: {error}"))?;

    TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .tooltip(TRAY_TOOLTIP)
        .icon(icon)
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| {
            tray_menu_handler::handle_tray_menu_event(app, event.id().as_ref())
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                window_actions::toggle_main_window(tray.app_handle(), append_desktop_log);
            }
        })
        .build(app_handle)
        .map_err(|error| format!("Failed to create tray icon: {error}"))?;

    supervisor.mark_tray_created();
    Ok(true)
}
