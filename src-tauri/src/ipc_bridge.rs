use tauri::{AppHandle, Emitter, Manager};

use crate::{
    app_supervisor::ApplicationSupervisor, append_desktop_log, append_startup_log,
    append_update_warning, update_state::UpdateEvent, updater_flow::PendingUpdate,
    IPC_CONTRACT_VERSION,
};

/// Enables the bridge state behind the IPC commands. Safe to call on every
/// "ready" trigger; only the first call does anything.
pub fn register_ipc_bridge(app_handle: &AppHandle) -> bool {
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    if !supervisor.mark_ipc_registered() {
        append_desktop_log("ipc bridge already registered, skipping");
        return false;
    }

    if !app_handle.manage(PendingUpdate::default()) {
        append_desktop_log("pending update state already exists, skipping manage");
    }
    append_startup_log(&format!(
        "ipc bridge registered: contract version {IPC_CONTRACT_VERSION}"
    ));
    true
}

pub fn emit_update_events(app_handle: &AppHandle, events: Vec<UpdateEvent>) {
    for event in events {
        if let Err(error) = app_handle.emit(event.name(), event.payload()) {
            append_update_warning(&format!(
                "failed to emit {} to the UI: {error}",
                event.name()
            ));
        }
    }
}
