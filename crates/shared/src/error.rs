use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure kinds returned by the Equalify API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    /// The confirmation code does not match the one issued.
    CodeMismatch,
    /// The confirmation code was valid once but has lapsed; a new one must be sent.
    ExpiredCode,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Validation => "validation",
            ErrorCode::CodeMismatch => "code_mismatch",
            ErrorCode::ExpiredCode => "expired_code",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::Internal => "internal",
        }
    }

    /// Text shown when the server sends this code without a message of its own.
    pub fn fallback_message(self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Please sign in to continue.",
            ErrorCode::Forbidden => "You do not have access to this resource.",
            ErrorCode::NotFound => "The requested resource was not found.",
            ErrorCode::Validation => "Some of the submitted values are invalid.",
            ErrorCode::CodeMismatch => "Invalid verification code provided, please try again.",
            ErrorCode::ExpiredCode => "Your verification code has expired. Please request a new one.",
            ErrorCode::RateLimited => "Attempt limit exceeded, please try again later.",
            ErrorCode::Internal => "Something went wrong. Please try again.",
        }
    }

    /// Whether requesting a fresh confirmation code is the way out of this error.
    pub fn needs_new_code(self) -> bool {
        matches!(self, ErrorCode::ExpiredCode)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body returned by the Equalify API on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} ({code})", shown_message(.code, .message))]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The server's own text when it sent any, otherwise a message derived from the code.
    pub fn user_message(&self) -> String {
        shown_message(&self.code, &self.message).to_string()
    }
}

fn shown_message<'a>(code: &ErrorCode, message: &'a str) -> &'a str {
    match message.trim() {
        "" => code.fallback_message(),
        trimmed => trimmed,
    }
}

impl From<ApiError> for ApiException {
    fn from(value: ApiError) -> Self {
        Self::new(value.code, value.message)
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
