//! Venue error-code classification.
//!
//! Every code maps to exactly one class through a static table.

use serde::Serialize;

/// Informational codes: market-data farm status notices.
pub const INFORMATIONAL_CODES: [i32; 3] = [2104, 2106, 2158];

/// Range of connectivity codes that indicate the session is unusable.
pub const FATAL_CONNECTIVITY_CODES: std::ops::Range<i32> = 1100..1300;

/// How the session reacts to a venue error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Status notice; logged at debug and otherwise ignored.
    Informational,
    /// Connectivity lost; triggers loss handling.
    FatalConnectivity,
    /// Anything else; forwarded to error observers without state change.
    Warning,
}

impl ErrorClass {
    /// Label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::FatalConnectivity => "fatal_connectivity",
            Self::Warning => "warning",
        }
    }
}

/// Classify a venue error code.
#[must_use]
pub fn classify_error_code(code: i32) -> ErrorClass {
    if INFORMATIONAL_CODES.contains(&code) {
        ErrorClass::Informational
    } else if FATAL_CONNECTIVITY_CODES.contains(&code) {
        ErrorClass::FatalConnectivity
    } else {
        ErrorClass::Warning
    }
}

/// An error reported by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueError {
    /// Request the error refers to, `-1` for session-level errors.
    pub request_id: i64,
    /// Numeric venue code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Class derived from `code`.
    pub class: ErrorClass,
}

impl VenueError {
    /// Build an error and classify its code.
    #[must_use]
    pub fn new(request_id: i64, code: i32, message: impl Into<String>) -> Self {
        Self {
            request_id,
            code,
            message: message.into(),
            class: classify_error_code(code),
        }
    }
}

impl std::fmt::Display for VenueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "venue error {} (request {}): {}", self.code, self.request_id, self.message)
    }
}
