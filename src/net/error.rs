//! Backend error shapes and the client-side API error type.
//!
//! DESIGN
//! ======
//! The backend reports failures in several loosely related JSON shapes:
//! serializer field errors (`{"email": ["..."]}`), `non_field_errors`,
//! `{"message": ...}`, `{"error": ...}`, `{"detail": ...}`, or a bare string.
//! [`BackendError::parse`] folds all of them into one closed enum, checked in
//! a fixed priority order, so UI code matches on variants instead of probing
//! JSON keys.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use std::fmt;

use serde_json::{Map, Value};

/// Field names the auth and settings forms know how to attach errors to,
/// in the order they are checked.
const KNOWN_FIELDS: &[&str] = &[
    "email",
    "password",
    "confirm_password",
    "username",
    "current_password",
    "new_password",
    "first_name",
    "last_name",
];

/// A parsed backend error body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// First entry of `non_field_errors`.
    NonField(String),
    /// First message attached to a form field.
    Field { field: String, message: String },
    /// `{"message": "..."}` (password reset and similar views).
    Message(String),
    /// `{"error": "..."}` (logout, registration failures).
    Error(String),
    /// `{"detail": "..."}` (framework-level auth/permission errors).
    Detail(String),
    /// Non-JSON or JSON-string body.
    Text(String),
    /// Empty body or a shape with nothing recognizable.
    Unknown,
}

impl BackendError {
    /// Parse a raw response body.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::Unknown;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Self::from_object(&map),
            Ok(Value::String(text)) if !text.trim().is_empty() => Self::Text(text),
            Ok(_) => Self::Unknown,
            // HTML error pages carry nothing worth showing.
            Err(_) if trimmed.starts_with('<') => Self::Unknown,
            Err(_) => Self::Text(trimmed.to_owned()),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        if let Some(message) = map.get("non_field_errors").and_then(first_message) {
            return Self::NonField(message);
        }
        for field in KNOWN_FIELDS {
            if let Some(message) = map.get(*field).and_then(first_listed) {
                return Self::Field { field: (*field).to_owned(), message };
            }
        }
        if let Some(message) = map.get("message").and_then(non_empty_str) {
            return Self::Message(message);
        }
        if let Some(message) = map.get("error").and_then(non_empty_str) {
            return Self::Error(message);
        }
        if let Some(message) = map.get("detail").and_then(non_empty_str) {
            return Self::Detail(message);
        }
        map.iter()
            .find_map(|(field, value)| {
                first_listed(value).map(|message| Self::Field { field: field.clone(), message })
            })
            .unwrap_or(Self::Unknown)
    }

    /// The human-readable message carried by the body, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::NonField(m) | Self::Message(m) | Self::Error(m) | Self::Detail(m) | Self::Text(m) => Some(m),
            Self::Field { message, .. } => Some(message),
            Self::Unknown => None,
        }
    }

    /// Form field the message belongs to, for field-level errors.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { field, message } => write!(f, "{field}: {message}"),
            Self::Unknown => f.write_str("unknown error"),
            other => f.write_str(other.message().unwrap_or_default()),
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.trim().is_empty()).map(str::to_owned)
}

fn first_listed(value: &Value) -> Option<String> {
    value.as_array()?.first().and_then(non_empty_str)
}

fn first_message(value: &Value) -> Option<String> {
    first_listed(value).or_else(|| non_empty_str(value))
}

// =============================================================================
// API ERROR
// =============================================================================

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your internet connection.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request failed with status {status}: {error}")]
    Status { status: u16, error: BackendError },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no access token; sign in first")]
    MissingToken,
}

impl ApiError {
    /// HTTP status for backend rejections.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            Self::Status { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Message suitable for showing next to a form.
    ///
    /// A message from the backend body wins; otherwise the status code picks
    /// a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_owned(),
            Self::MissingToken => "Please log in to continue.".to_owned(),
            Self::Decode(_) | Self::InvalidUrl(_) => "An error occurred".to_owned(),
            Self::Status { status, error } => match error.message() {
                Some(message) => message.to_owned(),
                None => status_message(*status).to_owned(),
            },
        }
    }

    /// Message for a failed password-reset confirmation.
    #[must_use]
    pub fn reset_password_message(&self) -> String {
        let raw = self
            .backend()
            .and_then(BackendError::message)
            .unwrap_or_default()
            .to_lowercase();
        if raw.contains("expired") || raw.contains("invalid") {
            "Reset link is invalid or has expired.".to_owned()
        } else if raw.contains("same as the old") {
            "New password cannot be the same as the previous one.".to_owned()
        } else if raw.contains("reuse") {
            "You cannot reuse a previously used password.".to_owned()
        } else if matches!(self, Self::Network(_)) {
            NETWORK_ERROR_MESSAGE.to_owned()
        } else {
            "Password reset failed. Please try again.".to_owned()
        }
    }
}

fn status_message(status: u16) -> &'static str {
    match status {
        0 => NETWORK_ERROR_MESSAGE,
        400 => "Invalid request. Please check the form and try again.",
        401 => "Unauthorized. Please log in again.",
        403 => "Permission denied.",
        404 => "Resource not found.",
        429 => "Too many attempts. Please try again later.",
        s if s >= 500 => "Server error. Try later.",
        _ => "An error occurred",
    }
}
