use tauri::{AppHandle, CloseRequestApi, Manager};

use crate::{
    app_supervisor::ApplicationSupervisor,
    close_behavior::CloseDecision,
    exit_events, main_window,
    window_state::{WindowHost, WindowPresence, WindowStep},
    MAIN_WINDOW_LABEL,
};

/// Drives the real main window. `Create` builds it on the calling thread.
pub struct TauriWindowHost<'a> {
    app_handle: &'a AppHandle,
}

impl<'a> TauriWindowHost<'a> {
    pub fn new(app_handle: &'a AppHandle) -> Self {
        Self { app_handle }
    }
}

impl WindowHost for TauriWindowHost<'_> {
    fn presence(&self) -> WindowPresence {
        let Some(window) = self.app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
            return WindowPresence::Missing;
        };
        if let Ok(true) = window.is_minimized() {
            return WindowPresence::Minimized;
        }
        match window.is_visible() {
            Ok(false) => WindowPresence::Hidden,
            _ => WindowPresence::Visible,
        }
    }

    fn apply(&self, step: WindowStep) -> Result<(), String> {
        if step == WindowStep::Create {
            return main_window::create_main_window(self.app_handle);
        }

        let window = self
            .app_handle
            .get_webview_window(MAIN_WINDOW_LABEL)
            .ok_or_else(|| "Main window is unavailable.".to_string())?;
        let result = match step {
            WindowStep::Unminimize => window.unminimize(),
            WindowStep::Show => window.show(),
            WindowStep::Focus => window.set_focus(),
            WindowStep::Hide => window.hide(),
            WindowStep::Create => Ok(()),
        };
        result.map_err(|error| format!("Failed to apply {step:?} to main window: {error}"))
    }
}

pub fn show_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if let Err(error) = supervisor.show_window(&TauriWindowHost::new(app_handle)) {
        log(&format!("failed to show main window: {error}"));
    }
}

pub fn hide_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if let Err(error) = supervisor.hide_window(&TauriWindowHost::new(app_handle)) {
        log(&format!("failed to hide main window: {error}"));
    }
}

pub fn toggle_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if let Err(error) = supervisor.toggle_window(&TauriWindowHost::new(app_handle)) {
        log(&format!("failed to toggle main window: {error}"));
    }
}

pub fn handle_second_instance<F>(app_handle: &AppHandle, argv: &[String], cwd: &str, log: F)
where
    F: Fn(&str),
{
    log(&format!("second instance launch detected: argv={argv:?}, cwd={cwd}"));
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if let Err(error) = supervisor.handle_second_instance(&TauriWindowHost::new(app_handle)) {
        log(&format!("failed to bring main window to front: {error}"));
    }
}

pub fn handle_main_window_close_requested(app_handle: &AppHandle, api: &CloseRequestApi) {
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    match supervisor.handle_close_requested(&TauriWindowHost::new(app_handle)) {
        CloseDecision::AllowClose => {}
        CloseDecision::HideWindow => api.prevent_close(),
        CloseDecision::QuitApplication => {
            api.prevent_close();
            exit_events::spawn_teardown_then_exit(app_handle);
        }
    }
}
