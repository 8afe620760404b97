use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

pub fn run_on_main_thread_dispatch<F>(
    app_handle: &AppHandle,
    task_name: &str,
    mut task: F,
) -> Result<(), String>
where
    F: FnMut(&AppHandle) + Send + 'static,
{
    let app_handle_for_thread = app_handle.clone();
    app_handle
        .run_on_main_thread(move || {
            task(&app_handle_for_thread);
        })
        .map_err(|error| format!("Failed to dispatch '{task_name}' on main thread: {error}"))
}

/// Fire-and-forget error dialog; the app keeps running.
pub fn show_error_dialog(app_handle: &AppHandle, title: &str, message: &str) {
    app_handle
        .dialog()
        .message(message)
        .title(title)
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

/// Blocks the calling thread until the user dismisses the dialog. Never call
/// this from the main thread.
pub fn show_blocking_error_dialog(app_handle: &AppHandle, title: &str, message: &str) {
    app_handle
        .dialog()
        .message(message)
        .title(title)
        .kind(MessageDialogKind::Error)
        .blocking_show();
}
