use thiserror::Error;
use vpc_core::Retryable;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned {status}: {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    InvalidConfiguration(String),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            BackendError::NotFound(_) => Some(404),
            BackendError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }
}

impl Retryable for BackendError {
    fn is_transient(&self) -> bool {
        match self {
            BackendError::Transport(e) => e.is_timeout() || e.is_connect(),
            BackendError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> BackendError {
        BackendError::Status {
            method: "GET".to_string(),
            path: "/x".to_string(),
            status: code,
            message: String::new(),
        }
    }

    #[test]
    fn test_classification() {
        assert!(status(503).is_transient());
        assert!(status(504).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(500).is_transient());
        assert!(!status(400).is_transient());
        assert!(status(400).is_bad_request());
        assert!(BackendError::NotFound("/x".to_string()).is_not_found());
        assert!(!BackendError::NotFound("/x".to_string()).is_transient());
    }
}
