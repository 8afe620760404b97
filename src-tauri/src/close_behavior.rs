#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Let the window close; teardown is already underway.
    AllowClose,
    HideWindow,
    QuitApplication,
}

pub trait WindowCloseBehavior: Send + Sync {
    fn on_close_requested(&self, quitting: bool) -> CloseDecision;
}

/// Apps keep running with their windows closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct HideUnlessQuitting;

impl WindowCloseBehavior for HideUnlessQuitting {
    fn on_close_requested(&self, quitting: bool) -> CloseDecision {
        if quitting {
            CloseDecision::AllowClose
        } else {
            CloseDecision::HideWindow
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QuitOnClose;

impl WindowCloseBehavior for QuitOnClose {
    fn on_close_requested(&self, quitting: bool) -> CloseDecision {
        if quitting {
            CloseDecision::AllowClose
        } else {
            CloseDecision::QuitApplication
        }
    }
}

pub fn platform_close_behavior() -> Box<dyn WindowCloseBehavior> {
    if cfg!(target_os = "macos") {
        Box::new(HideUnlessQuitting)
    } else {
        Box::new(QuitOnClose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_unless_quitting_hides_until_quit_is_requested() {
        assert_eq!(
            HideUnlessQuitting.on_close_requested(false),
            CloseDecision::HideWindow
        );
        assert_eq!(
            HideUnlessQuitting.on_close_requested(true),
            CloseDecision::AllowClose
        );
    }

    #[test]
    fn quit_on_close_quits_once_then_lets_window_close() {
        assert_eq!(
            QuitOnClose.on_close_requested(false),
            CloseDecision::QuitApplication
        );
        assert_eq!(QuitOnClose.on_close_requested(true), CloseDecision::AllowClose);
    }
}
