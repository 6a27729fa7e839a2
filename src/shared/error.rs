use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzaError {
    /// Caller configuration is invalid (missing project, bad flag value, ...).
    #[error("{0}")]
    Usage(String),

    /// The agent service answered with a non-success status.
    #[error("{message}")]
    Upstream {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AzaError>;

impl AzaError {
    pub fn usage(message: impl Into<String>) -> Self {
        AzaError::Usage(message.into())
    }

    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        AzaError::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AzaError::Upstream { status, .. } => *status,
            AzaError::Request(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, AzaError::Usage(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_detected_from_upstream_status() {
        let err = AzaError::upstream(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_rate_limited());
        assert!(!err.is_usage());
        assert_eq!(err.to_string(), "slow down");
    }

    #[test]
    fn usage_errors_carry_no_status() {
        let err = AzaError::usage("Missing threadId");
        assert!(err.is_usage());
        assert_eq!(err.status(), None);
        assert!(!err.is_rate_limited());
    }
}
