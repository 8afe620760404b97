use std::env;

use crate::{DEVTOOLS_ENV, RUNTIME_MODE_ENV};

pub const RUNTIME_MODE_DEVELOPMENT: &str = "development";
pub const RUNTIME_MODE_PACKAGED: &str = "packaged";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Packaged,
}

impl RuntimeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => RUNTIME_MODE_DEVELOPMENT,
            Self::Packaged => RUNTIME_MODE_PACKAGED,
        }
    }

    pub fn is_packaged(self) -> bool {
        self == Self::Packaged
    }

    /// Build mode plus any env override. The override notice is returned, not logged.
    pub fn detect() -> (Self, Option<String>) {
        let build_mode = if tauri::is_dev() {
            Self::Development
        } else {
            Self::Packaged
        };
        let raw = env::var(RUNTIME_MODE_ENV).unwrap_or_default();
        resolve_mode_override(&raw, RUNTIME_MODE_ENV, build_mode)
    }
}

pub fn resolve_mode_override(
    raw_mode: &str,
    env_name: &str,
    build_mode: RuntimeMode,
) -> (RuntimeMode, Option<String>) {
    let normalized = raw_mode.trim();
    if normalized.is_empty() {
        return (build_mode, None);
    }
    if normalized.eq_ignore_ascii_case(RUNTIME_MODE_DEVELOPMENT) {
        return (
            RuntimeMode::Development,
            Some(format!("runtime mode forced to development by {env_name}")),
        );
    }
    if normalized.eq_ignore_ascii_case(RUNTIME_MODE_PACKAGED) {
        return (
            RuntimeMode::Packaged,
            Some(format!("runtime mode forced to packaged by {env_name}")),
        );
    }
    (
        build_mode,
        Some(format!(
            "invalid runtime mode in {env_name}: {normalized}, fallback to {}",
            build_mode.as_str()
        )),
    )
}

pub fn devtools_requested(mode: RuntimeMode) -> bool {
    mode == RuntimeMode::Development || is_truthy_flag(&env::var(DEVTOOLS_ENV).unwrap_or_default())
}

pub fn is_truthy_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_mode_override_keeps_build_mode_when_unset() {
        let (mode, message) = resolve_mode_override("  ", "TEST_ENV", RuntimeMode::Packaged);
        assert_eq!(mode, RuntimeMode::Packaged);
        assert!(message.is_none());
    }

    #[test]
    fn resolve_mode_override_accepts_known_values_case_insensitive() {
        let (mode, message) =
            resolve_mode_override("Development", "TEST_ENV", RuntimeMode::Packaged);
        assert_eq!(mode, RuntimeMode::Development);
        assert!(message
            .expect("expected override message")
            .contains("forced to development"));

        let (mode, _) = resolve_mode_override("PACKAGED", "TEST_ENV", RuntimeMode::Development);
        assert_eq!(mode, RuntimeMode::Packaged);
    }

    #[test]
    fn resolve_mode_override_rejects_unknown_values() {
        let (mode, message) = resolve_mode_override("staging", "TEST_ENV", RuntimeMode::Packaged);
        assert_eq!(mode, RuntimeMode::Packaged);
        assert!(message
            .expect("expected invalid value message")
            .contains("invalid runtime mode"));
    }

    #[test]
    fn is_truthy_flag_accepts_common_spellings() {
        for raw in ["1", "true", " YES ", "on"] {
            assert!(is_truthy_flag(raw), "{raw} should be truthy");
        }
        for raw in ["", "0", "false", "off", "maybe"] {
            assert!(!is_truthy_flag(raw), "{raw} should not be truthy");
        }
    }
}
