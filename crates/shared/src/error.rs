use std::fmt;

use serde::{Deserialize, Serialize};

/// Error kinds carried in the `type` field of every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ForbiddenError")]
    Forbidden,
    #[serde(rename = "ValidationError")]
    Validation,
    NotFound,
    RequestNotFound,
    RequestAlreadyProcessed,
    AlreadyExistingUsername,
    #[serde(rename = "UnknownError")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Forbidden => "ForbiddenError",
            ErrorCode::Validation => "ValidationError",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::RequestNotFound => "RequestNotFound",
            ErrorCode::RequestAlreadyProcessed => "RequestAlreadyProcessed",
            ErrorCode::AlreadyExistingUsername => "AlreadyExistingUsername",
            ErrorCode::Internal => "UnknownError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorCode::Forbidden, "Access denied")
    }

    pub fn request_not_found() -> Self {
        Self::new(ErrorCode::RequestNotFound, "The request does not exist")
    }

    pub fn validation(field: &str, message: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Validation, format!("{field} {message}"))
    }
}
