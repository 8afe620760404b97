use std::{env, path::Path, sync::Arc};

use tauri::{AppHandle, Manager, RunEvent, WindowEvent};

use crate::{
    app_supervisor::ApplicationSupervisor,
    append_desktop_error, append_desktop_log, append_startup_log,
    backend_supervisor::{BackendCrash, StartOutcome},
    desktop_bridge_commands, desktop_log_path, exit_events, ipc_bridge, launch_plan, main_window,
    runtime_mode::RuntimeMode,
    runtime_paths, tray_setup, ui_dispatch, updater_flow, window_actions, BACKEND_CMD_ENV,
    MAIN_WINDOW_LABEL, MAIN_WINDOW_TITLE,
};

fn install_crash_notifier(app_handle: &AppHandle) {
    let notifier_app = app_handle.clone();
    app_handle
        .state::<ApplicationSupervisor>()
        .backend()
        .set_crash_notifier(Arc::new(move |crash: &BackendCrash| {
            ui_dispatch::show_blocking_error_dialog(
                &notifier_app,
                MAIN_WINDOW_TITLE,
                &format!(
                    "The ppop_promt server stopped unexpectedly ({}).\n\nPlease restart the application.",
                    crash.status
                ),
            );
        }));
}

fn start_backend(app_handle: &AppHandle) -> Result<(), String> {
    let supervisor = app_handle.state::<ApplicationSupervisor>();
    let mode = supervisor.mode();
    let resource_dir = if mode.is_packaged() {
        runtime_paths::resource_dir(app_handle)
            .map_err(|error| append_startup_log(&error))
            .ok()
    } else {
        None
    };
    let plan = launch_plan::resolve_launch_plan(
        mode,
        env::var(BACKEND_CMD_ENV).ok(),
        runtime_paths::detect_backend_source_root(),
        resource_dir,
    )?;
    append_startup_log(&format!(
        "backend launch plan: cmd={:?}, cwd={}, packaged={}",
        plan.debug_command(),
        plan.cwd.display(),
        plan.packaged_mode
    ));

    match supervisor.backend().start(&plan)? {
        StartOutcome::Spawned { pid } => append_startup_log(&format!("backend started: pid={pid}")),
        StartOutcome::AlreadyRunning { pid } => {
            append_startup_log(&format!("backend already running: pid={pid}"))
        }
    }
    Ok(())
}

fn start_backend_or_report(app_handle: &AppHandle) {
    if let Err(error) = start_backend(app_handle) {
        append_desktop_error(&format!("failed to start backend: {error}"));
        ui_dispatch::show_error_dialog(
            app_handle,
            MAIN_WINDOW_TITLE,
            &format!("The ppop_promt server could not be started.\n\n{error}"),
        );
    }
}

/// Lines written once this process owns the single-instance lock.
fn startup_log_lines(
    log_path: &Path,
    mode: RuntimeMode,
    mode_notice: Option<String>,
) -> Vec<String> {
    let mut lines = vec![
        "desktop process starting".to_string(),
        format!("desktop log path: {}", log_path.display()),
    ];
    lines.extend(mode_notice);
    lines.push(format!("runtime mode: {}", mode.as_str()));
    lines
}

pub(crate) fn run() {
    // Nothing is written to the shared log before the single-instance plugin has run.
    let (mode, mode_notice) = RuntimeMode::detect();

    let builder = tauri::Builder::default()
        // Registered first so a second launch exits before anything else initializes.
        .plugin(tauri_plugin_single_instance::init(|app, argv, cwd| {
            window_actions::handle_second_instance(app, &argv, &cwd, append_desktop_log);
        }))
        .plugin(tauri_plugin_updater::Builder::new().build())
        .plugin(tauri_plugin_dialog::init())
        .manage(ApplicationSupervisor::for_platform(mode))
        .invoke_handler(tauri::generate_handler![
            desktop_bridge_commands::check_for_updates,
            desktop_bridge_commands::download_update,
            desktop_bridge_commands::quit_and_install,
            desktop_bridge_commands::open_external,
            desktop_bridge_commands::get_app_version,
            desktop_bridge_commands::get_backend_port,
            desktop_bridge_commands::get_ipc_contract_version,
        ])
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }
            if let WindowEvent::CloseRequested { api, .. } = event {
                window_actions::handle_main_window_close_requested(window.app_handle(), api);
            }
        })
        .setup(move |app| {
            for line in startup_log_lines(&desktop_log_path(), mode, mode_notice) {
                append_startup_log(&line);
            }
            let app_handle = app.handle().clone();
            ipc_bridge::register_ipc_bridge(&app_handle);
            match tray_setup::setup_tray(&app_handle) {
                Ok(true) => append_startup_log("tray created"),
                Ok(false) => {}
                Err(error) => append_startup_log(&format!("failed to initialize tray: {error}")),
            }

            install_crash_notifier(&app_handle);
            start_backend_or_report(&app_handle);
            main_window::spawn_main_window_startup(app_handle.clone());
            updater_flow::spawn_background_update_checks(app_handle);
            Ok(())
        });

    let app = match builder.build(tauri::generate_context!()) {
        Ok(app) => app,
        Err(error) => {
            append_desktop_error(&format!("failed to build desktop application: {error}"));
            eprintln!("ppop_promt startup failed: {error}");
            std::process::exit(1);
        }
    };

    app.run(|app_handle, event| match event {
        RunEvent::Ready => {
            ipc_bridge::register_ipc_bridge(app_handle);
        }
        RunEvent::ExitRequested { api, .. } => {
            exit_events::handle_exit_requested(app_handle, &api);
        }
        RunEvent::Exit => {
            exit_events::handle_exit_event(app_handle);
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => {
            window_actions::show_main_window(app_handle, append_desktop_log);
        }
        _ => {}
    });
}
