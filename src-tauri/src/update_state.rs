use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::runtime_mode::RuntimeMode;

pub const UPDATE_CHECKING_EVENT: &str = "update-checking";
pub const UPDATE_AVAILABLE_EVENT: &str = "update-available";
pub const UPDATE_NOT_AVAILABLE_EVENT: &str = "update-not-available";
pub const UPDATE_ERROR_EVENT: &str = "update-error";
pub const UPDATE_DOWNLOAD_PROGRESS_EVENT: &str = "update-download-progress";
pub const UPDATE_DOWNLOADED_EVENT: &str = "update-downloaded";

/// Read-only mirror handed to the UI. `downloaded` and `downloading` are never both set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub checking: bool,
    pub available: bool,
    pub downloading: bool,
    pub downloaded: bool,
    pub progress_percent: u8,
    pub version: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    UpToDate,
    AvailableNotDownloaded,
    Downloading,
    Downloaded,
    Installing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMessage {
    CheckStarted,
    UpdateFound {
        version: String,
        release_date: Option<String>,
        release_notes: Option<String>,
    },
    NoUpdateFound,
    CheckFailed,
    DownloadStarted,
    DownloadChunk {
        chunk_length: usize,
        content_length: Option<u64>,
    },
    DownloadFinished,
    DownloadFailed {
        message: String,
        status_code: Option<u16>,
    },
    InstallStarted,
    InstallFailed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Checking,
    Available {
        version: String,
        release_date: Option<String>,
        release_notes: Option<String>,
    },
    NotAvailable,
    Error {
        message: String,
        code: Option<String>,
        status_code: Option<u16>,
    },
    DownloadProgress {
        percent: u8,
        transferred: u64,
        total: Option<u64>,
    },
    Downloaded {
        version: Option<String>,
    },
}

impl UpdateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Checking => UPDATE_CHECKING_EVENT,
            Self::Available { .. } => UPDATE_AVAILABLE_EVENT,
            Self::NotAvailable => UPDATE_NOT_AVAILABLE_EVENT,
            Self::Error { .. } => UPDATE_ERROR_EVENT,
            Self::DownloadProgress { .. } => UPDATE_DOWNLOAD_PROGRESS_EVENT,
            Self::Downloaded { .. } => UPDATE_DOWNLOADED_EVENT,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::Checking | Self::NotAvailable => Value::Null,
            Self::Available {
                version,
                release_date,
                release_notes,
            } => json!({
                "version": version,
                "releaseDate": release_date,
                "releaseNotes": release_notes,
            }),
            Self::Error {
                message,
                code,
                status_code,
            } => json!({
                "message": message,
                "code": code,
                "statusCode": status_code,
            }),
            Self::DownloadProgress {
                percent,
                transferred,
                total,
            } => json!({
                "percent": percent,
                "transferred": transferred,
                "total": total,
            }),
            Self::Downloaded { version } => json!({ "version": version }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpdateRejection {
    #[error("Update checks are only available in packaged builds.")]
    NotApplicable,
    #[error("An update check is already in progress.")]
    CheckInProgress,
    #[error("No update is available to download.")]
    NoUpdateAvailable,
    #[error("The update is already downloading.")]
    DownloadInProgress,
    #[error("The update has already been downloaded.")]
    AlreadyDownloaded,
    #[error("The update has not been downloaded yet.")]
    NotDownloaded,
    #[error("The update is already being installed.")]
    AlreadyInstalling,
}

impl UpdateRejection {
    pub fn code(self) -> &'static str {
        match self {
            Self::NotApplicable => "not-applicable",
            Self::CheckInProgress => "check-in-progress",
            Self::NoUpdateAvailable => "no-update-available",
            Self::DownloadInProgress => "download-in-progress",
            Self::AlreadyDownloaded => "already-downloaded",
            Self::NotDownloaded => "not-downloaded",
            Self::AlreadyInstalling => "already-installing",
        }
    }
}

/// Pulls the HTTP status out of an updater error message such as
/// `HTTP status client error (404 Not Found) for url (...)`.
pub fn http_status_from_error_text(text: &str) -> Option<u16> {
    let lowered = text.to_ascii_lowercase();
    let (index, _) = lowered.match_indices("status").next()?;
    lowered[index..]
        .split(|c: char| !c.is_ascii_digit())
        .filter(|digits| digits.len() == 3)
        .filter_map(|digits| digits.parse::<u16>().ok())
        .find(|code| (100..=599).contains(code))
}

/// Single authoritative copy of the update workflow.
#[derive(Debug, Default)]
pub struct UpdateStateMachine {
    phase: UpdatePhase,
    status: UpdateStatus,
    transferred: u64,
}

impl UpdateStateMachine {
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    pub fn status(&self) -> &UpdateStatus {
        &self.status
    }

    fn busy_rejection(&self) -> Option<UpdateRejection> {
        match self.phase {
            UpdatePhase::Checking => Some(UpdateRejection::CheckInProgress),
            UpdatePhase::Downloading => Some(UpdateRejection::DownloadInProgress),
            UpdatePhase::Downloaded => Some(UpdateRejection::AlreadyDownloaded),
            UpdatePhase::Installing => Some(UpdateRejection::AlreadyInstalling),
            UpdatePhase::Idle | UpdatePhase::UpToDate | UpdatePhase::AvailableNotDownloaded => None,
        }
    }

    /// Guards a check and enters `Checking` when allowed.
    pub fn begin_check(&mut self, mode: RuntimeMode) -> Result<Vec<UpdateEvent>, UpdateRejection> {
        if !mode.is_packaged() {
            return Err(UpdateRejection::NotApplicable);
        }
        if let Some(rejection) = self.busy_rejection() {
            return Err(rejection);
        }
        Ok(self.apply(UpdateMessage::CheckStarted))
    }

    pub fn begin_download(&mut self) -> Result<Vec<UpdateEvent>, UpdateRejection> {
        match self.phase {
            UpdatePhase::AvailableNotDownloaded => Ok(self.apply(UpdateMessage::DownloadStarted)),
            UpdatePhase::Idle | UpdatePhase::UpToDate => Err(UpdateRejection::NoUpdateAvailable),
            _ => Err(self
                .busy_rejection()
                .unwrap_or(UpdateRejection::NoUpdateAvailable)),
        }
    }

    pub fn begin_install(&mut self) -> Result<Vec<UpdateEvent>, UpdateRejection> {
        match self.phase {
            UpdatePhase::Downloaded => Ok(self.apply(UpdateMessage::InstallStarted)),
            UpdatePhase::Installing => Err(UpdateRejection::AlreadyInstalling),
            _ => Err(UpdateRejection::NotDownloaded),
        }
    }

    /// Applies one transition and returns the events the UI should receive.
    /// Messages that do not apply in the current phase are ignored.
    pub fn apply(&mut self, message: UpdateMessage) -> Vec<UpdateEvent> {
        use UpdatePhase::*;

        match (self.phase, message) {
            (Idle | UpToDate | AvailableNotDownloaded, UpdateMessage::CheckStarted) => {
                self.phase = Checking;
                self.status = UpdateStatus {
                    checking: true,
                    ..UpdateStatus::default()
                };
                vec![UpdateEvent::Checking]
            }
            (
                Checking,
                UpdateMessage::UpdateFound {
                    version,
                    release_date,
                    release_notes,
                },
            ) => {
                self.phase = AvailableNotDownloaded;
                self.status.checking = false;
                self.status.available = true;
                self.status.version = Some(version.clone());
                vec![UpdateEvent::Available {
                    version,
                    release_date,
                    release_notes,
                }]
            }
            (Checking, UpdateMessage::NoUpdateFound) => {
                self.phase = UpToDate;
                self.status.checking = false;
                self.status.available = false;
                vec![UpdateEvent::NotAvailable]
            }
            // Feed failures stay silent: back to idle, nothing pushed to the UI.
            (Checking, UpdateMessage::CheckFailed) => {
                self.phase = Idle;
                self.status = UpdateStatus::default();
                Vec::new()
            }
            (AvailableNotDownloaded, UpdateMessage::DownloadStarted) => {
                self.phase = Downloading;
                self.transferred = 0;
                self.status.downloading = true;
                self.status.downloaded = false;
                self.status.progress_percent = 0;
                self.status.error = None;
                Vec::new()
            }
            (
                Downloading,
                UpdateMessage::DownloadChunk {
                    chunk_length,
                    content_length,
                },
            ) => {
                self.transferred = self.transferred.saturating_add(chunk_length as u64);
                let percent = match content_length {
                    Some(total) if total > 0 => {
                        (self.transferred.saturating_mul(100) / total).min(100) as u8
                    }
                    _ => self.status.progress_percent,
                };
                self.status.progress_percent = self.status.progress_percent.max(percent);
                vec![UpdateEvent::DownloadProgress {
                    percent: self.status.progress_percent,
                    transferred: self.transferred,
                    total: content_length,
                }]
            }
            (Downloading, UpdateMessage::DownloadFinished) => {
                self.phase = Downloaded;
                self.status.downloading = false;
                self.status.downloaded = true;
                self.status.progress_percent = 100;
                vec![UpdateEvent::Downloaded {
                    version: self.status.version.clone(),
                }]
            }
            (
                Downloading,
                UpdateMessage::DownloadFailed {
                    message,
                    status_code,
                },
            ) => {
                self.phase = Idle;
                self.status = UpdateStatus {
                    error: Some(message.clone()),
                    ..UpdateStatus::default()
                };
                vec![UpdateEvent::Error {
                    message,
                    code: Some("download-failed".to_string()),
                    status_code,
                }]
            }
            (Downloaded, UpdateMessage::InstallStarted) => {
                self.phase = Installing;
                Vec::new()
            }
            (Installing, UpdateMessage::InstallFailed { message }) => {
                self.phase = Idle;
                self.status = UpdateStatus {
                    error: Some(message.clone()),
                    ..UpdateStatus::default()
                };
                vec![UpdateEvent::Error {
                    message,
                    code: Some("install-failed".to_string()),
                    status_code: None,
                }]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(version: &str) -> UpdateMessage {
        UpdateMessage::UpdateFound {
            version: version.to_string(),
            release_date: None,
            release_notes: None,
        }
    }

    fn chunk(chunk_length: usize, total: u64) -> UpdateMessage {
        UpdateMessage::DownloadChunk {
            chunk_length,
            content_length: Some(total),
        }
    }

    fn machine_with_available_update() -> UpdateStateMachine {
        let mut machine = UpdateStateMachine::default();
        machine
            .begin_check(RuntimeMode::Packaged)
            .expect("check should start");
        machine.apply(found("1.2.0"));
        machine
    }

    #[test]
    fn begin_check_is_not_applicable_in_development() {
        let mut machine = UpdateStateMachine::default();
        assert_eq!(
            machine.begin_check(RuntimeMode::Development),
            Err(UpdateRejection::NotApplicable)
        );
        assert_eq!(machine.phase(), UpdatePhase::Idle);
        assert!(!machine.status().checking);
    }

    #[test]
    fn check_reports_available_update() {
        let mut machine = UpdateStateMachine::default();
        assert_eq!(
            machine.begin_check(RuntimeMode::Packaged),
            Ok(vec![UpdateEvent::Checking])
        );
        assert!(machine.status().checking);
        assert_eq!(
            machine.begin_check(RuntimeMode::Packaged),
            Err(UpdateRejection::CheckInProgress)
        );

        let events = machine.apply(found("1.2.0"));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), UPDATE_AVAILABLE_EVENT);
        assert_eq!(events[0].payload()["version"], "1.2.0");
        assert_eq!(machine.phase(), UpdatePhase::AvailableNotDownloaded);
        assert!(machine.status().available);
        assert!(!machine.status().checking);
        assert_eq!(machine.status().version.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn check_failure_is_silent_and_returns_to_idle() {
        let mut machine = UpdateStateMachine::default();
        machine
            .begin_check(RuntimeMode::Packaged)
            .expect("check should start");

        let events = machine.apply(UpdateMessage::CheckFailed);

        assert!(events.is_empty());
        assert_eq!(machine.phase(), UpdatePhase::Idle);
        assert_eq!(machine.status(), &UpdateStatus::default());
    }

    #[test]
    fn download_requires_available_update() {
        let mut machine = UpdateStateMachine::default();
        assert_eq!(
            machine.begin_download(),
            Err(UpdateRejection::NoUpdateAvailable)
        );

        machine
            .begin_check(RuntimeMode::Packaged)
            .expect("check should start");
        machine.apply(UpdateMessage::NoUpdateFound);
        assert_eq!(machine.phase(), UpdatePhase::UpToDate);
        assert_eq!(
            machine.begin_download(),
            Err(UpdateRejection::NoUpdateAvailable)
        );
    }

    #[test]
    fn download_progress_is_monotonic_and_completion_clears_downloading() {
        let mut machine = machine_with_available_update();
        machine.begin_download().expect("download should start");
        assert_eq!(
            machine.begin_download(),
            Err(UpdateRejection::DownloadInProgress)
        );

        let mut seen = Vec::new();
        for message in [
            chunk(25, 100),
            chunk(25, 100),
            // A late total that would compute a smaller percentage must not move backwards.
            chunk(10, 1_000),
            chunk(0, 0),
            UpdateMessage::DownloadChunk {
                chunk_length: 60,
                content_length: None,
            },
            chunk(100, 100),
        ] {
            for event in machine.apply(message) {
                if let UpdateEvent::DownloadProgress { percent, .. } = event {
                    seen.push(percent);
                }
            }
            assert!(!(machine.status().downloaded && machine.status().downloading));
        }
        assert_eq!(seen, vec![25, 50, 50, 50, 50, 100]);

        let events = machine.apply(UpdateMessage::DownloadFinished);
        assert_eq!(
            events,
            vec![UpdateEvent::Downloaded {
                version: Some("1.2.0".to_string())
            }]
        );
        assert!(machine.status().downloaded);
        assert!(!machine.status().downloading);
        assert_eq!(machine.status().progress_percent, 100);
    }

    #[test]
    fn download_failure_is_reported_and_returns_to_idle() {
        let mut machine = machine_with_available_update();
        machine.begin_download().expect("download should start");

        let events = machine.apply(UpdateMessage::DownloadFailed {
            message: "connection reset".to_string(),
            status_code: None,
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), UPDATE_ERROR_EVENT);
        assert_eq!(events[0].payload()["message"], "connection reset");
        assert_eq!(machine.phase(), UpdatePhase::Idle);
        assert_eq!(machine.status().error.as_deref(), Some("connection reset"));
        assert!(!machine.status().downloading);
    }

    #[test]
    fn install_is_guarded_until_download_completes() {
        let mut machine = machine_with_available_update();
        assert_eq!(machine.begin_install(), Err(UpdateRejection::NotDownloaded));

        machine.begin_download().expect("download should start");
        assert_eq!(machine.begin_install(), Err(UpdateRejection::NotDownloaded));
        machine.apply(UpdateMessage::DownloadFinished);

        assert_eq!(machine.begin_install(), Ok(Vec::new()));
        assert_eq!(machine.phase(), UpdatePhase::Installing);
        assert_eq!(
            machine.begin_install(),
            Err(UpdateRejection::AlreadyInstalling)
        );
        assert_eq!(
            machine.begin_check(RuntimeMode::Packaged),
            Err(UpdateRejection::AlreadyInstalling)
        );
    }

    #[test]
    fn status_serializes_with_camel_case_fields() {
        let status = UpdateStatus {
            progress_percent: 42,
            ..UpdateStatus::default()
        };
        let value = serde_json::to_value(&status).expect("serialize status");
        assert_eq!(value["progressPercent"], 42);
        assert_eq!(value["downloaded"], false);
    }

    #[test]
    fn download_failure_carries_http_status_into_error_payload() {
        let mut machine = UpdateStateMachine::default();
        machine.begin_check(RuntimeMode::Packaged).expect("begin check");
        machine.apply(UpdateMessage::UpdateFound {
            version: "1.2.0".to_string(),
            release_date: None,
            release_notes: None,
        });
        machine.begin_download().expect("begin download");

        let events = machine.apply(UpdateMessage::DownloadFailed {
            message: "Download request failed with status: 404 Not Found".to_string(),
            status_code: Some(404),
        });

        assert_eq!(events[0].payload()["statusCode"], 404);
        assert_eq!(events[0].payload()["code"], "download-failed");
    }

    #[test]
    fn http_status_from_error_text_reads_status_after_keyword() {
        assert_eq!(
            http_status_from_error_text(
                "HTTP status client error (404 Not Found) for url (https://example.com/latest.json)"
            ),
            Some(404)
        );
        assert_eq!(
            http_status_from_error_text("Download request failed with status: 503 Service Unavailable"),
            Some(503)
        );
        assert_eq!(
            http_status_from_error_text("error sending request for url (https://example.com:8443/)"),
            None
        );
        assert_eq!(http_status_from_error_text("status unknown"), None);
    }
}
