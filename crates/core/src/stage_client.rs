//! Errors shared by the stage clients (downloader, transcoder, publisher).

use thiserror::Error;

/// Errors that can occur while talking to an external stage service.
#[derive(Debug, Error)]
pub enum StageClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StageClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StageClientError::Timeout
        } else if e.is_connect() {
            StageClientError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            StageClientError::InvalidResponse(e.to_string())
        } else {
            StageClientError::Api(e.to_string())
        }
    }
}

/// Build the shared HTTP client for a stage service.
pub(crate) fn http_client(
    timeout_secs: u32,
    cookies: bool,
) -> Result<reqwest::Client, StageClientError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs as u64))
        .cookie_store(cookies)
        .build()
        .map_err(|e| StageClientError::ConnectionFailed(format!("failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let err: StageClientError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, StageClientError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_http_client_builds() {
        assert!(http_client(30, true).is_ok());
    }
}
