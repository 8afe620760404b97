use std::sync::atomic::{AtomicBool, Ordering};

use crate::update_state::UpdateRejection;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub(crate) struct BridgeResult {
    pub(crate) success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl BridgeResult {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckForUpdatesResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) update_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) not_applicable: bool,
}

impl CheckForUpdatesResult {
    pub(crate) fn checked(update_available: bool, version: Option<String>) -> Self {
        Self {
            update_available: Some(update_available),
            version,
            ..Self::default()
        }
    }

    pub(crate) fn rejected(rejection: UpdateRejection) -> Self {
        Self {
            error: Some(rejection.to_string()),
            not_applicable: rejection == UpdateRejection::NotApplicable,
            ..Self::default()
        }
    }
}

pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn atomic_flag_guard_try_set_rejects_double_set_until_drop() {
        let flag = AtomicBool::new(false);

        let guard = AtomicFlagGuard::try_set(&flag).expect("first set should succeed");
        assert!(flag.load(Ordering::Acquire));
        assert!(AtomicFlagGuard::try_set(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(AtomicFlagGuard::try_set(&flag).is_some());
    }

    #[test]
    fn check_result_marks_development_rejection_as_not_applicable() {
        let value = serde_json::to_value(CheckForUpdatesResult::rejected(
            UpdateRejection::NotApplicable,
        ))
        .expect("serialize result");

        assert_eq!(value["notApplicable"], true);
        assert!(value["error"].is_string());
        assert!(value.get("updateAvailable").is_none());
    }

    #[test]
    fn check_result_omits_empty_fields() {
        let value = serde_json::to_value(CheckForUpdatesResult::checked(false, None))
            .expect("serialize result");
        assert_eq!(value, serde_json::json!({ "updateAvailable": false }));

        let value = serde_json::to_value(BridgeResult::failed("nope")).expect("serialize result");
        assert_eq!(value, serde_json::json!({ "success": false, "error": "nope" }));
    }
}
