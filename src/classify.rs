//! Maps HTTP outcomes onto transient and fatal failures.

use reqwest::StatusCode;

use crate::{DeeplError, ErrorKind};

/// Provider-specific status signalling that the character quota is used up.
pub const QUOTA_EXCEEDED: u16 = 456;

const QUOTA_EXCEEDED_MESSAGE: &str = "Quota exceeded. The character limit has been reached.";

/// Classifies a completed exchange by status.
///
/// Returns `None` for 2xx, which is not a failure. Otherwise only
/// [`ErrorKind::Transient`] or [`ErrorKind::Fatal`] is produced.
pub fn classify_status(status: StatusCode) -> Option<ErrorKind> {
    classify_status_code(status.as_u16())
}

pub(crate) fn classify_status_code(status: u16) -> Option<ErrorKind> {
    match status {
        200..=299 => None,
        429 => Some(ErrorKind::Transient),
        // 456 stays below this range and is therefore fatal.
        500.. => Some(ErrorKind::Transient),
        _ => Some(ErrorKind::Fatal),
    }
}

/// Classifies a failure that happened before any status was received.
///
/// Connection, DNS, timeout and body-transfer failures are transient. Only
/// errors raised while building the request are fatal since resending the
/// same request cannot fix them.
pub fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_builder() {
        ErrorKind::Fatal
    } else {
        ErrorKind::Transient
    }
}

/// Human-readable reason for a status, with the quota status special-cased.
pub fn status_message(status: StatusCode) -> String {
    if status.as_u16() == QUOTA_EXCEEDED {
        return QUOTA_EXCEEDED_MESSAGE.to_owned();
    }
    status
        .canonical_reason()
        .unwrap_or("Unknown Status")
        .to_owned()
}

/// Builds the error surfaced for a non-success status.
pub fn status_error(status: StatusCode) -> DeeplError {
    DeeplError::Http {
        status: status.as_u16(),
        message: status_message(status),
    }
}
