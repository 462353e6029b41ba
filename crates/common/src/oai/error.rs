//! OAI-PMH error vocabulary
//!
//! Errors are rendered in-band as `<error code="...">` inside a normal
//! OAI-PMH envelope. Each error also carries the HTTP status the response
//! is sent with.

use crate::errors::AppError;
use axum::http::StatusCode;
use std::fmt;

/// Error codes emitted in `<error code="...">`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OaiErrorCode {
    BadArgument,
    BadVerb,
    IdDoesNotExist,
    NoRecordsMatch,
    /// Non-standard code for rate limiting and server failures
    BadRequest,
}

impl OaiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OaiErrorCode::BadArgument => "badArgument",
            OaiErrorCode::BadVerb => "badVerb",
            OaiErrorCode::IdDoesNotExist => "idDoesNotExist",
            OaiErrorCode::NoRecordsMatch => "noRecordsMatch",
            OaiErrorCode::BadRequest => "badRequest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiError {
    pub code: OaiErrorCode,
    pub message: String,
    pub status: StatusCode,
}

impl OaiError {
    fn new(code: OaiErrorCode, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }

    pub fn missing_verb() -> Self {
        Self::new(
            OaiErrorCode::BadArgument,
            "Missing required parameter: verb",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn bad_verb(verb: &str) -> Self {
        Self::new(
            OaiErrorCode::BadVerb,
            format!("Illegal OAI verb: {}", verb),
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn missing_identifier() -> Self {
        Self::new(
            OaiErrorCode::BadArgument,
            "Missing required parameter: identifier",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn invalid_identifier() -> Self {
        Self::new(
            OaiErrorCode::BadArgument,
            "Invalid identifier format",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn unsupported_metadata_prefix() -> Self {
        Self::new(
            OaiErrorCode::BadArgument,
            "Only oai_dc metadata format is supported",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn id_does_not_exist(identifier: &str) -> Self {
        Self::new(
            OaiErrorCode::IdDoesNotExist,
            format!("No matching identifier in this repository: {}", identifier),
            StatusCode::NOT_FOUND,
        )
    }

    pub fn no_records_match() -> Self {
        Self::new(
            OaiErrorCode::NoRecordsMatch,
            "The repository holds no published records",
            StatusCode::OK,
        )
    }

    /// Arguments that could not be decoded at all, e.g. a POST body that is
    /// not `application/x-www-form-urlencoded`
    pub fn unreadable_arguments() -> Self {
        Self::new(
            OaiErrorCode::BadArgument,
            "Request arguments must be sent as a query string or an application/x-www-form-urlencoded body",
            StatusCode::BAD_REQUEST,
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            OaiErrorCode::BadArgument,
            "Rate limit exceeded. Please try again later.",
            StatusCode::TOO_MANY_REQUESTS,
        )
    }

    pub fn internal() -> Self {
        Self::new(
            OaiErrorCode::BadRequest,
            "Internal server error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }

    /// Whether the `<request>` element may carry the request's attributes.
    ///
    /// OAI-PMH requires `badVerb` and `badArgument` responses to echo only
    /// the base URL.
    pub fn echoes_request(&self) -> bool {
        !matches!(self.code, OaiErrorCode::BadArgument | OaiErrorCode::BadVerb)
    }
}

impl fmt::Display for OaiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for OaiError {}

/// Store and rendering failures surface as a generic server error; the
/// detail stays in the logs.
impl From<AppError> for OaiError {
    fn from(err: AppError) -> Self {
        tracing::error!(error = %err, code = ?err.code(), "OAI-PMH request failed");
        OaiError::internal()
    }
}
