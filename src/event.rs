use crate::controller::health::ServiceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Messages sent from background tasks to the UI thread. Session changes are
/// read straight from the shared session; these carry only what happens
/// out-of-band.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Notice { level: NoticeLevel, text: String },
    StatusChanged(ServiceStatus),
    Diagnostic(String),
}

impl AppEvent {
    pub fn info(text: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}
