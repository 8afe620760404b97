use std::sync::{Mutex, MutexGuard};

use tauri::{AppHandle, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_updater::{Update, UpdaterExt};

use crate::{
    app_supervisor::ApplicationSupervisor,
    append_desktop_error, append_update_log, append_update_warning, exit_events, ipc_bridge,
    runtime_mode::RuntimeMode,
    update_state::{self, UpdateEvent, UpdateMessage, UpdatePhase, UpdateRejection},
    BridgeResult, CheckForUpdatesResult, UPDATE_CHECK_INTERVAL, UPDATE_CHECK_STARTUP_DELAY,
};

/// Update metadata and downloaded bytes kept between the IPC calls of one workflow.
#[derive(Default)]
pub struct PendingUpdate {
    update: Mutex<Option<Update>>,
    bytes: Mutex<Option<Vec<u8>>>,
}

fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            append_update_warning("pending update lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn with_pending<T>(app_handle: &AppHandle, apply: impl FnOnce(&PendingUpdate) -> T) -> Option<T> {
    let pending = app_handle.try_state::<PendingUpdate>()?;
    Some(apply(&pending))
}

fn apply_message(app_handle: &AppHandle, message: UpdateMessage) -> Vec<UpdateEvent> {
    app_handle
        .state::<ApplicationSupervisor>()
        .updates()
        .apply(message)
}

fn reject(app_handle: &AppHandle, rejection: UpdateRejection) {
    append_update_log(&format!("update action rejected: {rejection}"));
    ipc_bridge::emit_update_events(
        app_handle,
        vec![UpdateEvent::Error {
            message: rejection.to_string(),
            code: Some(rejection.code().to_string()),
            status_code: None,
        }],
    );
}

/// Result for checks that are answered without contacting the update feed.
fn early_check_result(mode: RuntimeMode, bridge_registered: bool) -> Option<CheckForUpdatesResult> {
    if !mode.is_packaged() {
        return Some(CheckForUpdatesResult::rejected(
            UpdateRejection::NotApplicable,
        ));
    }
    (!bridge_registered).then(|| CheckForUpdatesResult::checked(false, None))
}

pub async fn check_for_updates(app_handle: &AppHandle) -> CheckForUpdatesResult {
    let mode = app_handle.state::<ApplicationSupervisor>().mode();
    let bridge_registered = app_handle.try_state::<PendingUpdate>().is_some();
    if let Some(result) = early_check_result(mode, bridge_registered) {
        append_update_log(&format!(
            "update check answered locally: mode={}, bridge_registered={bridge_registered}",
            mode.as_str()
        ));
        return result;
    }

    let begin = {
        let supervisor = app_handle.state::<ApplicationSupervisor>();
        let mode = supervisor.mode();
        let result = supervisor.updates().begin_check(mode);
        result
    };
    let events = match begin {
        Ok(events) => events,
        Err(rejection) => {
            append_update_log(&format!("update check skipped: {rejection}"));
            return CheckForUpdatesResult::rejected(rejection);
        }
    };
    ipc_bridge::emit_update_events(app_handle, events);

    let current_version = app_handle.package_info().version.to_string();
    let outcome = match app_handle.updater() {
        Ok(updater) => updater.check().await.map_err(|error| error.to_string()),
        Err(error) => Err(format!("Failed to initialize updater: {error}")),
    };

    match outcome {
        Ok(Some(update)) => {
            let version = update.version.clone();
            append_update_log(&format!(
                "update available: current_version={current_version}, latest_version={version}"
            ));
            let message = UpdateMessage::UpdateFound {
                version: version.clone(),
                release_date: update.date.map(|date| date.to_string()),
                release_notes: update.body.clone(),
            };
            with_pending(app_handle, |pending| {
                *lock_or_recover(&pending.update) = Some(update);
                *lock_or_recover(&pending.bytes) = None;
            });
            ipc_bridge::emit_update_events(app_handle, apply_message(app_handle, message));
            CheckForUpdatesResult::checked(true, Some(version))
        }
        Ok(None) => {
            append_update_log(&format!(
                "no update available: current_version={current_version}"
            ));
            with_pending(app_handle, |pending| {
                *lock_or_recover(&pending.update) = None;
            });
            ipc_bridge::emit_update_events(
                app_handle,
                apply_message(app_handle, UpdateMessage::NoUpdateFound),
            );
            CheckForUpdatesResult::checked(false, None)
        }
        Err(error) => {
            // Feed failures (missing release, rate limiting, offline) never reach the UI.
            append_update_warning(&format!(
                "update check failed (silent): current_version={current_version}, error={error}"
            ));
            apply_message(app_handle, UpdateMessage::CheckFailed);
            CheckForUpdatesResult::checked(false, None)
        }
    }
}

pub async fn download_update(app_handle: &AppHandle) -> BridgeResult {
    let begin = app_handle
        .state::<ApplicationSupervisor>()
        .updates()
        .begin_download();
    let events = match begin {
        Ok(events) => events,
        Err(rejection) => return BridgeResult::failed(rejection.to_string()),
    };
    ipc_bridge::emit_update_events(app_handle, events);

    let update = with_pending(app_handle, |pending| lock_or_recover(&pending.update).clone())
        .flatten();
    let Some(update) = update else {
        let message = "Update metadata is no longer available.".to_string();
        ipc_bridge::emit_update_events(
            app_handle,
            apply_message(
                app_handle,
                UpdateMessage::DownloadFailed {
                    message: message.clone(),
                    status_code: None,
                },
            ),
        );
        return BridgeResult::failed(message);
    };

    append_update_log(&format!("downloading update {}", update.version));
    let progress_app = app_handle.clone();
    let result = update
        .download(
            move |chunk_length, content_length| {
                let events = apply_message(
                    &progress_app,
                    UpdateMessage::DownloadChunk {
                        chunk_length,
                        content_length,
                    },
                );
                ipc_bridge::emit_update_events(&progress_app, events);
            },
            || append_update_log("update download finished"),
        )
        .await;

    match result {
        Ok(bytes) => {
            with_pending(app_handle, |pending| {
                *lock_or_recover(&pending.bytes) = Some(bytes);
            });
            ipc_bridge::emit_update_events(
                app_handle,
                apply_message(app_handle, UpdateMessage::DownloadFinished),
            );
            BridgeResult::ok()
        }
        Err(error) => {
            let message = format!("Failed to download update: {error}");
            append_update_warning(&message);
            ipc_bridge::emit_update_events(
                app_handle,
                apply_message(
                    app_handle,
                    UpdateMessage::DownloadFailed {
                        status_code: update_state::http_status_from_error_text(&message),
                        message: message.clone(),
                    },
                ),
            );
            BridgeResult::failed(message)
        }
    }
}

/// Stops the backend through the shared teardown, installs, then relaunches.
pub async fn quit_and_install(app_handle: &AppHandle) {
    let begin = app_handle
        .state::<ApplicationSupervisor>()
        .updates()
        .begin_install();
    if let Err(rejection) = begin {
        reject(app_handle, rejection);
        return;
    }

    let downloaded = with_pending(app_handle, |pending| {
        (
            lock_or_recover(&pending.update).take(),
            lock_or_recover(&pending.bytes).take(),
        )
    });
    let Some((Some(update), Some(bytes))) = downloaded else {
        ipc_bridge::emit_update_events(
            app_handle,
            apply_message(
                app_handle,
                UpdateMessage::InstallFailed {
                    message: "Downloaded update is no longer available.".to_string(),
                },
            ),
        );
        return;
    };

    append_update_log(&format!(
        "installing update {}, stopping backend first",
        update.version
    ));
    if !exit_events::teardown_for_restart(app_handle).await {
        append_update_warning("install skipped: application is already shutting down");
        return;
    }

    match update.install(&bytes) {
        Ok(()) => {
            append_update_log(&format!(
                "update {} installed, restarting application",
                update.version
            ));
            app_handle.request_restart();
        }
        Err(error) => {
            let message = format!("Failed to install update: {error}");
            append_desktop_error(&message);
            ipc_bridge::emit_update_events(
                app_handle,
                apply_message(
                    app_handle,
                    UpdateMessage::InstallFailed {
                        message: message.clone(),
                    },
                ),
            );
            // The backend is already gone, so the app cannot keep serving.
            app_handle
                .dialog()
                .message(format!("{message}\n\nppop_promt will now close."))
                .title("Update failed")
                .kind(MessageDialogKind::Error)
                .blocking_show();
            app_handle.exit(0);
        }
    }
}

fn confirm(app_handle: &AppHandle, title: &str, message: String) -> bool {
    app_handle
        .dialog()
        .message(message)
        .title(title)
        .kind(MessageDialogKind::Info)
        .buttons(MessageDialogButtons::YesNo)
        .blocking_show()
}

async fn prompt_install(app_handle: &AppHandle, version: &str) {
    if confirm(
        app_handle,
        "Update ready",
        format!("ppop_promt {version} has been downloaded. Restart and install it now?"),
    ) {
        quit_and_install(app_handle).await;
    } else {
        append_update_log("user postponed installing the downloaded update");
    }
}

async fn run_background_check(app_handle: &AppHandle) {
    let (phase, version) = {
        let supervisor = app_handle.state::<ApplicationSupervisor>();
        let updates = supervisor.updates();
        let snapshot = (updates.phase(), updates.status().version.clone());
        snapshot
    };
    if phase == UpdatePhase::Downloaded {
        prompt_install(app_handle, version.as_deref().unwrap_or_default()).await;
        return;
    }

    let result = check_for_updates(app_handle).await;
    if result.update_available != Some(true) {
        return;
    }
    let version = result.version.unwrap_or_default();
    if !confirm(
        app_handle,
        "Update available",
        format!("A new version of ppop_promt ({version}) is available. Download it now?"),
    ) {
        append_update_log("user declined downloading the update");
        return;
    }

    let download = download_update(app_handle).await;
    if !download.success {
        append_update_log(&format!(
            "background download did not complete: {}",
            download.error.unwrap_or_default()
        ));
        return;
    }
    prompt_install(app_handle, &version).await;
}

pub fn spawn_background_update_checks(app_handle: AppHandle) {
    if !app_handle.state::<ApplicationSupervisor>().mode().is_packaged() {
        append_update_log("background update checks disabled in development mode");
        return;
    }

    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(UPDATE_CHECK_STARTUP_DELAY).await;
        loop {
            if app_handle.state::<ApplicationSupervisor>().is_quitting() {
                break;
            }
            run_background_check(&app_handle).await;
            tokio::time::sleep(UPDATE_CHECK_INTERVAL).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_check_result_reports_not_applicable_in_development() {
        for bridge_registered in [false, true] {
            let result = early_check_result(RuntimeMode::Development, bridge_registered)
                .expect("development checks are answered locally");
            assert!(result.not_applicable);
            assert_eq!(
                result,
                CheckForUpdatesResult::rejected(UpdateRejection::NotApplicable)
            );
        }
    }

    #[test]
    fn early_check_result_waits_for_bridge_in_packaged_builds() {
        assert_eq!(
            early_check_result(RuntimeMode::Packaged, false),
            Some(CheckForUpdatesResult::checked(false, None))
        );
        assert_eq!(early_check_result(RuntimeMode::Packaged, true), None);
    }
}
