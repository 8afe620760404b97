//! Window presentation steps, kept apart from Tauri so the second-instance,
//! tray and close paths can be exercised against a fake host.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPresence {
    Missing,
    Minimized,
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    Create,
    Unminimize,
    Show,
    Focus,
    Hide,
}

pub trait WindowHost {
    fn presence(&self) -> WindowPresence;
    fn apply(&self, step: WindowStep) -> Result<(), String>;
}

pub fn bring_to_front_steps(presence: WindowPresence) -> &'static [WindowStep] {
    match presence {
        WindowPresence::Missing => &[WindowStep::Create, WindowStep::Show, WindowStep::Focus],
        WindowPresence::Minimized => &[
            WindowStep::Unminimize,
            WindowStep::Show,
            WindowStep::Focus,
        ],
        WindowPresence::Hidden => &[WindowStep::Show, WindowStep::Focus],
        WindowPresence::Visible => &[WindowStep::Focus],
    }
}

pub fn hide_steps(presence: WindowPresence) -> &'static [WindowStep] {
    match presence {
        WindowPresence::Missing => &[WindowStep::Create, WindowStep::Hide],
        WindowPresence::Hidden => &[],
        WindowPresence::Minimized | WindowPresence::Visible => &[WindowStep::Hide],
    }
}

pub fn toggle_steps(presence: WindowPresence) -> &'static [WindowStep] {
    match presence {
        WindowPresence::Visible => &[WindowStep::Hide],
        other => bring_to_front_steps(other),
    }
}

/// Runs `steps` in order and stops at the first failure.
pub fn run_steps<F>(host: &dyn WindowHost, steps: &[WindowStep], log: F) -> Result<(), String>
where
    F: Fn(&str),
{
    for step in steps {
        if let Err(error) = host.apply(*step) {
            log(&format!("window step {step:?} failed: {error}"));
            return Err(error);
        }
    }
    Ok(())
}
