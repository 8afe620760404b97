#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::{
    env, fs, io,
    io::{BufRead, BufReader, Read},
    path::PathBuf,
    process::{Command, ExitStatus, Stdio},
    sync::{Arc, Mutex, MutexGuard, OnceLock},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    append_desktop_error, append_desktop_log, append_desktop_warning,
    exit_state::QuitIntent,
    launch_plan::LaunchPlan,
    logging, port_detector,
    process_control::{ExitLatch, ProcessTerminator},
    BACKEND_LOG_MAX_BYTES, BACKEND_PRODUCTION_ENV_KEY, BACKEND_PRODUCTION_ENV_VALUE,
    LOG_BACKUP_COUNT,
};
#[cfg(target_os = "windows")]
use crate::CREATE_NO_WINDOW;

static BACKEND_LOG_WRITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    CrashedUnexpectedly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    StartRequested,
    Spawned { pid: u32 },
    SpawnFailed,
    StopRequested,
    Exited { expected: bool },
}

/// Transition table for the backend handle. `None` means the event does not
/// apply in the current state and is ignored.
pub fn next_backend_state(current: BackendState, event: BackendEvent) -> Option<BackendState> {
    use BackendState::*;

    match (current, event) {
        (NotStarted | Stopped | CrashedUnexpectedly, BackendEvent::StartRequested) => Some(Starting),
        (Starting, BackendEvent::Spawned { .. }) => Some(Running),
        (Starting, BackendEvent::SpawnFailed) => Some(CrashedUnexpectedly),
        (Running, BackendEvent::StopRequested) => Some(Stopping),
        (Stopping, BackendEvent::Exited { .. }) => Some(Stopped),
        (Running, BackendEvent::Exited { expected: true }) => Some(Stopped),
        (Running, BackendEvent::Exited { expected: false }) => Some(CrashedUnexpectedly),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Spawned { pid: u32 },
    AlreadyRunning { pid: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCrash {
    pub pid: u32,
    pub status: String,
}

pub type CrashNotifier = Arc<dyn Fn(&BackendCrash) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn as_label(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

struct BackendProcessHandle {
    pid: u32,
    exit: Arc<ExitLatch>,
}

struct SupervisorStatus {
    state: BackendState,
    handle: Option<BackendProcessHandle>,
}

impl SupervisorStatus {
    fn apply(&mut self, event: BackendEvent) {
        match next_backend_state(self.state, event) {
            Some(next) => self.state = next,
            None => append_desktop_log(&format!(
                "backend event ignored: state={:?}, event={event:?}",
                self.state
            )),
        }
    }
}

pub struct BackendSupervisor {
    status: Mutex<SupervisorStatus>,
    detected_port: Mutex<Option<u16>>,
    pending_escalation: Mutex<Option<JoinHandle<()>>>,
    crash_notifier: Mutex<Option<CrashNotifier>>,
    quit: Arc<QuitIntent>,
    terminator: Box<dyn ProcessTerminator>,
    backend_log_path: Option<PathBuf>,
}

fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            append_desktop_log(&format!("{what} lock poisoned, recovering"));
            poisoned.into_inner()
        }
    }
}

impl BackendSupervisor {
    pub fn new(
        quit: Arc<QuitIntent>,
        terminator: Box<dyn ProcessTerminator>,
        backend_log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            status: Mutex::new(SupervisorStatus {
                state: BackendState::NotStarted,
                handle: None,
            }),
            detected_port: Mutex::new(None),
            pending_escalation: Mutex::new(None),
            crash_notifier: Mutex::new(None),
            quit,
            terminator,
            backend_log_path,
        }
    }

    pub fn set_crash_notifier(&self, notifier: CrashNotifier) {
        *lock_or_recover(&self.crash_notifier, "backend crash notifier") = Some(notifier);
    }

    pub fn state(&self) -> BackendState {
        lock_or_recover(&self.status, "backend status").state
    }

    pub fn pid(&self) -> Option<u32> {
        lock_or_recover(&self.status, "backend status")
            .handle
            .as_ref()
            .map(|handle| handle.pid)
    }

    pub fn detected_port(&self) -> Option<u16> {
        *lock_or_recover(&self.detected_port, "backend port")
    }

    pub fn start(self: &Arc<Self>, plan: &LaunchPlan) -> Result<StartOutcome, String> {
        let mut status = lock_or_recover(&self.status, "backend status");
        if let Some(handle) = status.handle.as_ref() {
            if !matches!(
                status.state,
                BackendState::Stopped | BackendState::CrashedUnexpectedly
            ) {
                append_desktop_log(&format!(
                    "backend already running, skip re-spawn: pid={}, state={:?}",
                    handle.pid, status.state
                ));
                return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
            }
        }

        status.apply(BackendEvent::StartRequested);
        *lock_or_recover(&self.detected_port, "backend port") = None;

        if !plan.cwd.exists() {
            if let Err(error) = fs::create_dir_all(&plan.cwd) {
                status.apply(BackendEvent::SpawnFailed);
                return Err(format!(
                    "Failed to create backend cwd {}: {}",
                    plan.cwd.display(),
                    error
                ));
            }
        }

        let mut command = Command::new(&plan.cmd);
        command
            .args(&plan.args)
            .current_dir(&plan.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env(BACKEND_PRODUCTION_ENV_KEY, BACKEND_PRODUCTION_ENV_VALUE)
            .env("PYTHONUNBUFFERED", "1")
            .env(
                "PYTHONIOENCODING",
                env::var("PYTHONIOENCODING").unwrap_or_else(|_| "utf-8".to_string()),
            );
        #[cfg(target_os = "windows")]
        {
            // Packaged backend stays fully backgrounded; dev keeps its console for debugging.
            if plan.packaged_mode {
                command.creation_flags(CREATE_NO_WINDOW);
            }
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                status.apply(BackendEvent::SpawnFailed);
                return Err(format!(
                    "Failed to spawn backend process with command {:?}: {}",
                    plan.debug_command(),
                    error
                ));
            }
        };
        let pid = child.id();
        append_desktop_log(&format!(
            "spawned backend: pid={pid}, cmd={:?}, cwd={}",
            plan.debug_command(),
            plan.cwd.display()
        ));

        let exit = Arc::new(ExitLatch::default());
        status.handle = Some(BackendProcessHandle {
            pid,
            exit: Arc::clone(&exit),
        });
        status.apply(BackendEvent::Spawned { pid });
        drop(status);

        if let Some(stdout) = child.stdout.take() {
            self.spawn_output_reader(pid, OutputStream::Stdout, stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            self.spawn_output_reader(pid, OutputStream::Stderr, stderr);
        }

        let supervisor = Arc::clone(self);
        let waiter = thread::Builder::new()
            .name(format!("backend-wait-{pid}"))
            .spawn(move || {
                let result = child.wait();
                supervisor.handle_exit(pid, result);
            });
        if let Err(error) = waiter {
            // Without a waiter nobody reaps the child; keep the handle so stop() can still kill it.
            append_desktop_error(&format!(
                "failed to start backend exit watcher: pid={pid}, error={error}"
            ));
        }

        Ok(StartOutcome::Spawned { pid })
    }

    fn spawn_output_reader<R>(self: &Arc<Self>, pid: u32, stream: OutputStream, source: R)
    where
        R: Read + Send + 'static,
    {
        let supervisor = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("backend-{}-{pid}", stream.as_label()))
            .spawn(move || {
                let mut reader = BufReader::new(source);
                let mut buffer = Vec::new();
                loop {
                    buffer.clear();
                    match reader.read_until(b'\n', &mut buffer) {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = String::from_utf8_lossy(&buffer);
                            supervisor.record_output(stream, line.trim_end_matches(['\r', '\n']));
                        }
                        Err(error) => {
                            append_desktop_log(&format!(
                                "backend {} reader stopped: pid={pid}, error={error}",
                                stream.as_label()
                            ));
                            break;
                        }
                    }
                }
            });
        if let Err(error) = spawned {
            append_desktop_error(&format!(
                "failed to start backend {} reader: pid={pid}, error={error}",
                stream.as_label()
            ));
        }
    }

    fn record_output(&self, stream: OutputStream, line: &str) {
        if let Some(path) = &self.backend_log_path {
            logging::append_log_line(
                path,
                &format!("[{}] {line}\n", stream.as_label()),
                BACKEND_LOG_MAX_BYTES,
                LOG_BACKUP_COUNT,
                "backend",
                &BACKEND_LOG_WRITE_LOCK,
            );
        }

        if let Some(port) = port_detector::detect_port(line) {
            let previous = lock_or_recover(&self.detected_port, "backend port").replace(port);
            if previous != Some(port) {
                append_desktop_log(&format!(
                    "backend announced port {port} (previous={previous:?})"
                ));
            }
        }

        if port_detector::detect_address_in_use(line) {
            append_desktop_warning(&format!(
                "backend reported an address conflict, waiting for it to announce a new port: {line}"
            ));
        }
    }

    fn handle_exit(&self, pid: u32, result: io::Result<ExitStatus>) {
        let (status_text, exited_cleanly) = match &result {
            Ok(exit_status) => (exit_status.to_string(), exit_status.code() == Some(0)),
            Err(error) => (format!("wait failed: {error}"), false),
        };

        let crash = {
            let mut status = lock_or_recover(&self.status, "backend status");
            let Some(handle) = status.handle.take_if(|handle| handle.pid == pid) else {
                append_desktop_log(&format!(
                    "stale backend exit ignored: pid={pid}, status={status_text}"
                ));
                return;
            };
            handle.exit.mark_exited();
            let expected = status.state == BackendState::Stopping
                || self.quit.is_quitting()
                || exited_cleanly;
            status.apply(BackendEvent::Exited { expected });
            *lock_or_recover(&self.detected_port, "backend port") = None;
            append_desktop_log(&format!(
                "backend exited: pid={pid}, status={status_text}, state={:?}",
                status.state
            ));
            (!expected).then(|| BackendCrash {
                pid,
                status: status_text,
            })
        };

        if let Some(crash) = crash {
            append_desktop_error(&format!(
                "backend exited unexpectedly: pid={}, status={}",
                crash.pid, crash.status
            ));
            let notifier = lock_or_recover(&self.crash_notifier, "backend crash notifier").clone();
            if let Some(notifier) = notifier {
                notifier(&crash);
            }
        }
    }

    /// Sends the termination signal and returns without waiting for the child to die.
    pub fn stop(&self) {
        let (pid, exit) = {
            let mut status = lock_or_recover(&self.status, "backend status");
            let Some(handle) = status.handle.as_ref() else {
                append_desktop_log(&format!(
                    "backend stop skipped: no process running, state={:?}",
                    status.state
                ));
                return;
            };
            if status.state == BackendState::Stopping {
                append_desktop_log(&format!(
                    "backend stop skipped: already stopping pid={}",
                    handle.pid
                ));
                return;
            }
            if handle.exit.has_exited() {
                return;
            }
            let pid = handle.pid;
            let exit = Arc::clone(&handle.exit);
            status.apply(BackendEvent::StopRequested);
            (pid, exit)
        };

        append_desktop_log(&format!("stopping backend: pid={pid}"));
        let escalation = self.terminator.terminate(pid, exit, append_desktop_log);
        *lock_or_recover(&self.pending_escalation, "backend kill escalation") = escalation;
    }

    /// Blocks until the kill escalation has run and the child's exit was observed,
    /// or `timeout` passes. Returns whether the exit was observed.
    pub fn wait_for_stop(&self, timeout: Duration) -> bool {
        let escalation = lock_or_recover(&self.pending_escalation, "backend kill escalation").take();
        if let Some(worker) = escalation {
            if worker.join().is_err() {
                append_desktop_log("backend kill escalation worker panicked");
            }
        }

        let exit = lock_or_recover(&self.status, "backend status")
            .handle
            .as_ref()
            .map(|handle| Arc::clone(&handle.exit));
        match exit {
            Some(exit) => exit.wait_for_exit(timeout),
            None => true,
        }
    }
}
