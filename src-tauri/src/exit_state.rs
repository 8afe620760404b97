use std::sync::Mutex;

/// Process-wide quit lifecycle. `is_quitting` flips exactly once and every
/// teardown path races through `try_begin_teardown`, so only one of them runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuitLifecycleState {
    #[default]
    Running,
    QuitRequested,
    TearingDown,
    ReadyToExit,
    Exiting,
}

#[derive(Debug, Default)]
pub struct QuitStateMachine {
    state: QuitLifecycleState,
}

impl QuitStateMachine {
    pub fn state(&self) -> QuitLifecycleState {
        self.state
    }

    pub fn is_quitting(&self) -> bool {
        self.state != QuitLifecycleState::Running
    }

    pub fn mark_quitting(&mut self) {
        if self.state == QuitLifecycleState::Running {
            self.state = QuitLifecycleState::QuitRequested;
        }
    }

    pub fn try_begin_teardown(&mut self) -> bool {
        if matches!(
            self.state,
            QuitLifecycleState::Running | QuitLifecycleState::QuitRequested
        ) {
            self.state = QuitLifecycleState::TearingDown;
            return true;
        }
        false
    }

    pub fn finish_teardown(&mut self) {
        if self.state == QuitLifecycleState::TearingDown {
            self.state = QuitLifecycleState::ReadyToExit;
        }
    }

    pub fn take_exit_allowance(&mut self) -> bool {
        if self.state == QuitLifecycleState::ReadyToExit {
            self.state = QuitLifecycleState::Exiting;
            return true;
        }
        false
    }
}

/// Lock wrapper shared between the application and the backend supervisor.
#[derive(Debug, Default)]
pub struct QuitIntent {
    machine: Mutex<QuitStateMachine>,
}

impl QuitIntent {
    fn with_machine<T>(&self, apply: impl FnOnce(&mut QuitStateMachine) -> T) -> T {
        match self.machine.lock() {
            Ok(mut guard) => apply(&mut guard),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }

    pub fn state(&self) -> QuitLifecycleState {
        self.with_machine(|machine| machine.state())
    }

    pub fn is_quitting(&self) -> bool {
        self.with_machine(|machine| machine.is_quitting())
    }

    pub fn mark_quitting(&self) {
        self.with_machine(QuitStateMachine::mark_quitting)
    }

    pub fn try_begin_teardown(&self) -> bool {
        self.with_machine(QuitStateMachine::try_begin_teardown)
    }

    pub fn finish_teardown(&self) {
        self.with_machine(QuitStateMachine::finish_teardown)
    }

    pub fn take_exit_allowance(&self) -> bool {
        self.with_machine(QuitStateMachine::take_exit_allowance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_flows_through_teardown_to_exit() {
        let mut machine = QuitStateMachine::default();
        assert_eq!(machine.state(), QuitLifecycleState::Running);
        assert!(!machine.is_quitting());

        machine.mark_quitting();
        assert_eq!(machine.state(), QuitLifecycleState::QuitRequested);
        assert!(machine.is_quitting());

        assert!(machine.try_begin_teardown());
        assert_eq!(machine.state(), QuitLifecycleState::TearingDown);

        machine.finish_teardown();
        assert_eq!(machine.state(), QuitLifecycleState::ReadyToExit);
        assert!(machine.take_exit_allowance());
        assert_eq!(machine.state(), QuitLifecycleState::Exiting);
        assert!(!machine.take_exit_allowance());
    }

    #[test]
    fn state_machine_rejects_duplicate_teardown() {
        let mut machine = QuitStateMachine::default();
        assert!(machine.try_begin_teardown());
        assert!(!machine.try_begin_teardown());
        assert_eq!(machine.state(), QuitLifecycleState::TearingDown);
    }

    #[test]
    fn mark_quitting_does_not_rewind_later_states() {
        let mut machine = QuitStateMachine::default();
        assert!(machine.try_begin_teardown());
        machine.mark_quitting();
        assert_eq!(machine.state(), QuitLifecycleState::TearingDown);

        machine.finish_teardown();
        machine.mark_quitting();
        assert_eq!(machine.state(), QuitLifecycleState::ReadyToExit);
    }

    #[test]
    fn exit_allowance_requires_finished_teardown() {
        let intent = QuitIntent::default();
        assert!(!intent.take_exit_allowance());
        intent.mark_quitting();
        assert!(!intent.take_exit_allowance());
        assert!(intent.try_begin_teardown());
        intent.finish_teardown();
        assert!(intent.take_exit_allowance());
    }
}
