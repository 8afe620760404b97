#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;
use std::{
    io,
    process::{Command, Stdio},
    sync::{Arc, Condvar, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

#[cfg(target_os = "windows")]
use crate::CREATE_NO_WINDOW;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Graceful,
    Forceful,
    /// Forceful kill of the process and all of its descendants.
    TreeKill,
}

/// Latched once the child's exit has been observed by its waiter thread.
#[derive(Debug, Default)]
pub struct ExitLatch {
    exited: Mutex<bool>,
    changed: Condvar,
}

impl ExitLatch {
    pub fn mark_exited(&self) {
        let mut exited = match self.exited.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *exited = true;
        self.changed.notify_all();
    }

    pub fn has_exited(&self) -> bool {
        match self.exited.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Returns `true` if the exit was observed before `timeout` elapsed.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let guard = match self.exited.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = self
            .changed
            .wait_timeout_while(guard, timeout, |exited| !*exited);
        match result {
            Ok((guard, _)) => *guard,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

pub trait SignalSender: Send + Sync + 'static {
    fn send(&self, pid: u32, signal: TerminationSignal) -> io::Result<()>;
}

/// Sends signals through the platform's stock kill utilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct KillCommandSender;

impl SignalSender for KillCommandSender {
    fn send(&self, pid: u32, signal: TerminationSignal) -> io::Result<()> {
        let pid_arg = pid.to_string();
        let (program, args): (&str, Vec<&str>) = match signal {
            TerminationSignal::Graceful => ("kill", vec!["-TERM", pid_arg.as_str()]),
            TerminationSignal::Forceful => ("kill", vec!["-KILL", pid_arg.as_str()]),
            TerminationSignal::TreeKill => ("taskkill", vec!["/pid", pid_arg.as_str(), "/t", "/f"]),
        };
        let mut command = Command::new(program);
        command
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
        #[cfg(target_os = "windows")]
        {
            // Avoid flashing a console window when invoking taskkill.
            command.creation_flags(CREATE_NO_WINDOW);
        }
        let status = command.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{program} {} returned {status}",
                args.join(" ")
            )))
        }
    }
}

pub trait ProcessTerminator: Send + Sync {
    /// Issues termination for `pid`. Returns the escalation worker, if one was started.
    fn terminate(
        &self,
        pid: u32,
        exit: Arc<ExitLatch>,
        log: fn(&str),
    ) -> Option<JoinHandle<()>>;
}

/// Whole-tree forced kill by PID for platforms without POSIX signals.
pub struct TreeKillTerminator<S> {
    sender: Arc<S>,
}

impl<S: SignalSender> TreeKillTerminator<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl<S: SignalSender> ProcessTerminator for TreeKillTerminator<S> {
    fn terminate(
        &self,
        pid: u32,
        _exit: Arc<ExitLatch>,
        log: fn(&str),
    ) -> Option<JoinHandle<()>> {
        if let Err(error) = self.sender.send(pid, TerminationSignal::TreeKill) {
            log(&format!(
                "tree kill failed, treating backend as already exited: pid={pid}, error={error}"
            ));
        }
        None
    }
}

/// SIGTERM first, SIGKILL once the grace period passes without an observed exit.
pub struct GracefulTerminator<S> {
    sender: Arc<S>,
    grace: Duration,
}

impl<S: SignalSender> GracefulTerminator<S> {
    pub fn new(sender: S, grace: Duration) -> Self {
        Self {
            sender: Arc::new(sender),
            grace,
        }
    }
}

fn send_forceful<S: SignalSender>(sender: &S, pid: u32, log: fn(&str)) {
    if let Err(error) = sender.send(pid, TerminationSignal::Forceful) {
        log(&format!("forceful kill failed: pid={pid}, error={error}"));
    }
}

impl<S: SignalSender> ProcessTerminator for GracefulTerminator<S> {
    fn terminate(
        &self,
        pid: u32,
        exit: Arc<ExitLatch>,
        log: fn(&str),
    ) -> Option<JoinHandle<()>> {
        if let Err(error) = self.sender.send(pid, TerminationSignal::Graceful) {
            log(&format!("graceful stop signal failed: pid={pid}, error={error}"));
        }

        let sender = Arc::clone(&self.sender);
        let grace = self.grace;
        let spawned = thread::Builder::new()
            .name(format!("backend-kill-{pid}"))
            .spawn(move || {
                if exit.wait_for_exit(grace) {
                    return;
                }
                log(&format!(
                    "backend still alive after {}ms grace period, sending forceful kill: pid={pid}",
                    grace.as_millis()
                ));
                send_forceful(&*sender, pid, log);
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(error) => {
                log(&format!(
                    "failed to start kill escalation worker, sending forceful kill now: pid={pid}, error={error}"
                ));
                send_forceful(&*self.sender, pid, log);
                None
            }
        }
    }
}

/// Terminator chosen once at startup for the current platform.
pub fn platform_terminator(grace: Duration) -> Box<dyn ProcessTerminator> {
    if cfg!(target_os = "windows") {
        Box::new(TreeKillTerminator::new(KillCommandSender))
    } else {
        Box::new(GracefulTerminator::new(KillCommandSender, grace))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Default)]
    pub(crate) struct RecordingSender {
        pub(crate) sent: Mutex<Vec<(u32, TerminationSignal)>>,
        pub(crate) fail: bool,
    }

    impl SignalSender for Arc<RecordingSender> {
        fn send(&self, pid: u32, signal: TerminationSignal) -> io::Result<()> {
            self.sent.lock().expect("lock sent").push((pid, signal));
            if self.fail {
                Err(io::Error::other("no such process"))
            } else {
                Ok(())
            }
        }
    }

    fn ignore_log(_: &str) {}

    static FORCEFUL_FAILURE_LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn record_forceful_failure(line: &str) {
        FORCEFUL_FAILURE_LOG
            .lock()
            .expect("lock log")
            .push(line.to_string());
    }

    #[test]
    fn send_forceful_logs_failed_kill() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });

        send_forceful(&sender, 13, record_forceful_failure);

        assert_eq!(
            *sender.sent.lock().expect("lock sent"),
            vec![(13, TerminationSignal::Forceful)]
        );
        let log = FORCEFUL_FAILURE_LOG.lock().expect("lock log");
        assert!(log
            .iter()
            .any(|line| line.contains("forceful kill failed: pid=13")));
    }

    #[test]
    fn graceful_terminator_escalates_when_process_outlives_grace_period() {
        let sender = Arc::new(RecordingSender::default());
        let terminator = GracefulTerminator::new(Arc::clone(&sender), Duration::from_millis(50));
        let latch = Arc::new(ExitLatch::default());

        let worker = terminator
            .terminate(7, Arc::clone(&latch), ignore_log)
            .expect("escalation worker");
        worker.join().expect("join escalation worker");

        assert_eq!(
            *sender.sent.lock().expect("lock sent"),
            vec![
                (7, TerminationSignal::Graceful),
                (7, TerminationSignal::Forceful)
            ]
        );
    }

    #[test]
    fn graceful_terminator_skips_forceful_kill_when_process_exits_in_time() {
        let sender = Arc::new(RecordingSender::default());
        let terminator = GracefulTerminator::new(Arc::clone(&sender), Duration::from_millis(1_000));
        let latch = Arc::new(ExitLatch::default());

        let started = Instant::now();
        let worker = terminator
            .terminate(9, Arc::clone(&latch), ignore_log)
            .expect("escalation worker");
        thread::sleep(Duration::from_millis(20));
        latch.mark_exited();
        worker.join().expect("join escalation worker");

        assert!(started.elapsed() < Duration::from_millis(900));
        assert_eq!(
            *sender.sent.lock().expect("lock sent"),
            vec![(9, TerminationSignal::Graceful)]
        );
    }

    #[test]
    fn tree_kill_terminator_swallows_failures() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let terminator = TreeKillTerminator::new(Arc::clone(&sender));

        let worker = terminator.terminate(11, Arc::new(ExitLatch::default()), ignore_log);

        assert!(worker.is_none());
        assert_eq!(
            *sender.sent.lock().expect("lock sent"),
            vec![(11, TerminationSignal::TreeKill)]
        );
    }

    #[test]
    fn exit_latch_wait_returns_immediately_once_marked() {
        let latch = ExitLatch::default();
        assert!(!latch.wait_for_exit(Duration::from_millis(10)));
        latch.mark_exited();
        assert!(latch.has_exited());
        assert!(latch.wait_for_exit(Duration::from_secs(5)));
    }
}
