use tauri::{AppHandle, Manager};

use crate::{app_supervisor::ApplicationSupervisor, append_shutdown_log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitRequestedDecision {
    AllowImmediateExit,
    RunTeardownFirst,
}

fn decide_exit_requested_flow(has_exit_request_allowance: bool) -> ExitRequestedDecision {
    if has_exit_request_allowance {
        ExitRequestedDecision::AllowImmediateExit
    } else {
        ExitRequestedDecision::RunTeardownFirst
    }
}

pub fn handle_exit_requested(app_handle: &AppHandle, api: &tauri::ExitRequestApi) {
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    match decide_exit_requested_flow(supervisor.quit_intent().take_exit_allowance()) {
        ExitRequestedDecision::AllowImmediateExit => {
            append_shutdown_log("exit request allowed to pass through after teardown");
            return;
        }
        ExitRequestedDecision::RunTeardownFirst => {}
    }

    // The backend is stopped in the blocking pool; exit is issued again once it finishes.
    api.prevent_exit();
    append_shutdown_log("exit requested, stopping backend first");
    spawn_teardown_then_exit(app_handle);
}

pub fn request_application_quit(app_handle: &AppHandle, reason: &str) {
    append_shutdown_log(reason);
    app_handle.state::<ApplicationSupervisor>().request_quit();
    spawn_teardown_then_exit(app_handle);
}

pub fn spawn_teardown_then_exit(app_handle: &AppHandle) {
    let app_handle_cloned = app_handle.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let supervisor = app_handle_cloned.state::<ApplicationSupervisor>();
        if supervisor.shutdown() {
            append_shutdown_log("teardown finished, exiting desktop process");
            app_handle_cloned.exit(0);
        }
    });
}

/// Runs the shared teardown without exiting, for the install-and-restart path.
/// Returns `false` if another path already owns the teardown.
pub async fn teardown_for_restart(app_handle: &AppHandle) -> bool {
    let app_handle_cloned = app_handle.clone();
    match tauri::async_runtime::spawn_blocking(move || {
        app_handle_cloned.state::<ApplicationSupervisor>().shutdown()
    })
    .await
    {
        Ok(ran) => ran,
        Err(error) => {
            append_shutdown_log(&format!("teardown task failed: {error}"));
            false
        }
    }
}

pub fn handle_exit_event(app_handle: &AppHandle) {
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if supervisor.shutdown() {
        append_shutdown_log("exit event triggered fallback backend cleanup");
    }
}

#[cfg(test)]
mod tests {
    use super::{decide_exit_requested_flow, ExitRequestedDecision};

    #[test]
    fn decide_exit_requested_flow_allows_immediate_exit_when_allowance_exists() {
        assert_eq!(
            decide_exit_requested_flow(true),
            ExitRequestedDecision::AllowImmediateExit
        );
    }

    #[test]
    fn decide_exit_requested_flow_requires_teardown_when_allowance_missing() {
        assert_eq!(
            decide_exit_requested_flow(false),
            ExitRequestedDecision::RunTeardownFirst
        );
    }
}
