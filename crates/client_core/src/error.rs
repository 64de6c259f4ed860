use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request with {status}: {}", error.message)]
    Api { status: u16, error: ApiError },
    #[error("unexpected server status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// How a screen reacts to a failed call. Only a missing guest request gets
/// its own handling; everything else is treated alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkOrServer,
    RequestNotFound,
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self.api_error() {
            Some(error) if error.code == ErrorCode::RequestNotFound => FailureKind::RequestNotFound,
            _ => FailureKind::NetworkOrServer,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The `message` of the server's error body, when it sent a non-empty one.
    pub fn server_message(&self) -> Option<&str> {
        self.api_error()
            .map(|error| error.message.as_str())
            .filter(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_request_not_found_bodies_are_singled_out() {
        let not_found = ClientError::Api {
            status: 404,
            error: ApiError::request_not_found(),
        };
        assert_eq!(not_found.kind(), FailureKind::RequestNotFound);

        let forbidden = ClientError::Api {
            status: 403,
            error: ApiError::forbidden(),
        };
        assert_eq!(forbidden.kind(), FailureKind::NetworkOrServer);
        assert_eq!(ClientError::Status(502).kind(), FailureKind::NetworkOrServer);
    }

    #[test]
    fn blank_server_message_is_ignored() {
        let err = ClientError::Api {
            status: 400,
            error: ApiError::new(ErrorCode::Validation, "  "),
        };
        assert_eq!(err.server_message(), None);
        assert_eq!(ClientError::Status(500).server_message(), None);
    }
}
