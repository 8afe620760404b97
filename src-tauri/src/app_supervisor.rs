use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use crate::{
    append_desktop_log, append_shutdown_log,
    backend_supervisor::BackendSupervisor,
    close_behavior::{self, CloseDecision, WindowCloseBehavior},
    exit_state::QuitIntent,
    process_control,
    runtime_mode::RuntimeMode,
    update_state::UpdateStateMachine,
    window_state::{self, WindowHost},
    AtomicFlagGuard, DEFAULT_BACKEND_PORT, KILL_GRACE_PERIOD, SHUTDOWN_WAIT_SLACK,
};

/// Owns every process-wide singleton of the shell. Managed once as Tauri state.
pub struct ApplicationSupervisor {
    mode: RuntimeMode,
    quit: Arc<QuitIntent>,
    backend: Arc<BackendSupervisor>,
    close_behavior: Box<dyn WindowCloseBehavior>,
    updates: Mutex<UpdateStateMachine>,
    ipc_registered: AtomicBool,
    tray_created: AtomicBool,
    window_creating: AtomicBool,
    shutdown_wait: Duration,
}

impl ApplicationSupervisor {
    pub fn new(
        mode: RuntimeMode,
        quit: Arc<QuitIntent>,
        backend: Arc<BackendSupervisor>,
        close_behavior: Box<dyn WindowCloseBehavior>,
    ) -> Self {
        Self {
            mode,
            quit,
            backend,
            close_behavior,
            updates: Mutex::new(UpdateStateMachine::default()),
            ipc_registered: AtomicBool::new(false),
            tray_created: AtomicBool::new(false),
            window_creating: AtomicBool::new(false),
            shutdown_wait: KILL_GRACE_PERIOD + SHUTDOWN_WAIT_SLACK,
        }
    }

    pub fn for_platform(mode: RuntimeMode) -> Self {
        let quit = Arc::new(QuitIntent::default());
        let backend = Arc::new(BackendSupervisor::new(
            Arc::clone(&quit),
            process_control::platform_terminator(KILL_GRACE_PERIOD),
            Some(crate::backend_log_path()),
        ));
        Self::new(mode, quit, backend, close_behavior::platform_close_behavior())
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn backend(&self) -> &Arc<BackendSupervisor> {
        &self.backend
    }

    pub fn quit_intent(&self) -> &QuitIntent {
        &self.quit
    }

    pub fn is_quitting(&self) -> bool {
        self.quit.is_quitting()
    }

    pub fn backend_port(&self) -> u16 {
        self.backend.detected_port().unwrap_or(DEFAULT_BACKEND_PORT)
    }

    pub fn updates(&self) -> MutexGuard<'_, UpdateStateMachine> {
        match self.updates.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                append_desktop_log("update state lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Returns `true` only for the first caller.
    pub fn mark_ipc_registered(&self) -> bool {
        self.ipc_registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_tray_created(&self) -> bool {
        self.tray_created.load(Ordering::Acquire)
    }

    pub fn mark_tray_created(&self) -> bool {
        self.tray_created
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Held for the duration of one main-window creation.
    pub fn window_creation_guard(&self) -> Option<AtomicFlagGuard<'_>> {
        AtomicFlagGuard::try_set(&self.window_creating)
    }

    pub fn handle_second_instance(&self, host: &dyn WindowHost) -> Result<(), String> {
        append_desktop_log("second instance launched, bringing existing window to front");
        self.show_window(host)
    }

    pub fn show_window(&self, host: &dyn WindowHost) -> Result<(), String> {
        let steps = window_state::bring_to_front_steps(host.presence());
        window_state::run_steps(host, steps, append_desktop_log)
    }

    pub fn hide_window(&self, host: &dyn WindowHost) -> Result<(), String> {
        let steps = window_state::hide_steps(host.presence());
        window_state::run_steps(host, steps, append_desktop_log)
    }

    pub fn toggle_window(&self, host: &dyn WindowHost) -> Result<(), String> {
        let steps = window_state::toggle_steps(host.presence());
        window_state::run_steps(host, steps, append_desktop_log)
    }

    /// Decides how the main window reacts to its close button. A quit decision
    /// sets the quitting flag before returning.
    pub fn handle_close_requested(&self, host: &dyn WindowHost) -> CloseDecision {
        let decision = self.close_behavior.on_close_requested(self.is_quitting());
        match decision {
            CloseDecision::AllowClose => {}
            CloseDecision::HideWindow => {
                if let Err(error) = self.hide_window(host) {
                    append_desktop_log(&format!("failed to hide main window on close: {error}"));
                }
            }
            CloseDecision::QuitApplication => {
                append_shutdown_log("main window closed, quitting application");
                self.request_quit();
            }
        }
        decision
    }

    pub fn request_quit(&self) {
        self.quit.mark_quitting();
    }

    /// Stops the backend and waits for the kill escalation. Runs at most once;
    /// later callers get `false` and do nothing.
    pub fn shutdown(&self) -> bool {
        self.quit.mark_quitting();
        if !self.quit.try_begin_teardown() {
            append_shutdown_log("teardown already started, skipping duplicate shutdown");
            return false;
        }

        append_shutdown_log("stopping backend before exit");
        self.backend.stop();
        if self.backend.wait_for_stop(self.shutdown_wait) {
            append_shutdown_log("backend stopped");
        } else {
            append_shutdown_log(&format!(
                "backend exit not observed within {}ms, continuing exit",
                self.shutdown_wait.as_millis()
            ));
        }
        self.quit.finish_teardown();
        true
    }
}
