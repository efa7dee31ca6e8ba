use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("'{name}' is not a PDF (declared type: {content_type})")]
    InvalidFileType { name: String, content_type: String },

    #[error("{0}")]
    TransportFailure(String),

    #[error("service returned {status}: {detail}")]
    ServiceFailure { status: u16, detail: String },

    #[error("another request is still in progress")]
    Busy,

    #[error("failed to read '{name}': {message}")]
    UnreadableFile { name: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure(message.into())
    }

    pub fn service(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::ServiceFailure {
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    /// Text shown to the user. A remote `detail` is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceFailure { detail, .. } => detail.clone(),
            Self::TransportFailure(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::TransportFailure(format!("request timed out: {err}"));
        }
        Self::TransportFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ClientError;
    use reqwest::StatusCode;

    #[test]
    fn user_message_passes_service_detail_through_verbatim() {
        let error = ClientError::service(
            StatusCode::BAD_REQUEST,
            "Please upload a PDF first using /upload-pdf endpoint",
        );
        assert_eq!(
            error.user_message(),
            "Please upload a PDF first using /upload-pdf endpoint"
        );
    }

    #[test]
    fn user_message_uses_transport_text_without_prefix() {
        let error = ClientError::transport("connection refused");
        assert_eq!(error.user_message(), "connection refused");
    }

    #[test]
    fn invalid_file_type_names_the_file() {
        let error = ClientError::InvalidFileType {
            name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
        };
        assert!(error.user_message().contains("notes.txt"));
    }
}
