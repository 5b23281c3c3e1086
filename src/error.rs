/// Error types for the token lifecycle and authorization layers
///
/// Credential errors (bad or unknown tokens) and infrastructure errors
/// (session store down) are kept apart so callers and operators can tell
/// "bad request" from "dependency down".

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::auth::TokenKind;

/// ============================================================================
/// SESSION STORE ERRORS
/// ============================================================================

/// Failures reported by a session store backend
#[derive(Debug, Clone)]
pub enum StoreError {
    /// The backend could not be reached (connection refused, dropped, ...)
    Connection(String),
    /// The backend answered but rejected or failed the command
    Command(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "session store connection error: {}", msg),
            StoreError::Command(msg) => write!(f, "session store command failed: {}", msg),
        }
    }
}

impl StdError for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// ============================================================================
/// AUTHENTICATION ERRORS
/// ============================================================================

/// Every way an issuance, verification, rotation or authorization can fail
#[derive(Debug)]
pub enum AuthError {
    /// No credential-bearing header or cookie on the request
    NoCredentialPresented,
    /// Token does not decode to the expected three-segment structure
    Malformed,
    /// Wrong key, tampered content, or an algorithm other than the configured one
    InvalidSignature,
    /// Authentic token that lacks a required claim (foreign issuer or wrong class)
    ClaimMissing(&'static str),
    /// No live session record: expired, revoked, or already rotated
    SessionNotFound,
    /// Session store unreachable during a read or delete
    StoreUnavailable(StoreError),
    /// One of the two session records of a new pair could not be written
    SessionStoreWriteFailed { class: TokenKind, source: StoreError },
    /// Session record exists but does not hold a decimal user id
    InvalidSessionRecord(String),
    /// Signing a freshly built token failed
    Signing(String),
    /// Settings the service cannot run with (e.g. a TTL out of range)
    InvalidSettings(String),
}

impl AuthError {
    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoCredentialPresented => "NO_CREDENTIALS",
            AuthError::Malformed => "TOKEN_MALFORMED",
            AuthError::InvalidSignature => "TOKEN_INVALID_SIGNATURE",
            AuthError::ClaimMissing(_) => "TOKEN_CLAIM_MISSING",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::StoreUnavailable(_) => "SESSION_STORE_UNAVAILABLE",
            AuthError::SessionStoreWriteFailed { .. } => "SESSION_STORE_WRITE_FAILED",
            AuthError::InvalidSessionRecord(_) => "SESSION_RECORD_INVALID",
            AuthError::Signing(_) => "TOKEN_SIGNING_FAILED",
            AuthError::InvalidSettings(_) => "AUTH_SETTINGS_INVALID",
        }
    }

    /// True for failures caused by the caller's credentials rather than by
    /// the service or its dependencies
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthError::NoCredentialPresented
                | AuthError::Malformed
                | AuthError::InvalidSignature
                | AuthError::ClaimMissing(_)
                | AuthError::SessionNotFound
        )
    }

    /// Reason disclosed to the client. Infrastructure details stay in the logs.
    pub fn reason(&self) -> String {
        if self.is_credential_error() {
            self.to_string()
        } else {
            "authentication service temporarily unavailable".to_string()
        }
    }

    /// Emit a log event at a level matching the error's severity
    pub fn log(&self, request_id: &str) {
        match self {
            AuthError::InvalidSignature => {
                tracing::warn!(
                    request_id = request_id,
                    security_event = true,
                    error = %self,
                    "Rejected token with invalid signature or algorithm"
                );
            }
            AuthError::Malformed | AuthError::ClaimMissing(_) => {
                tracing::warn!(request_id = request_id, error = %self, "Rejected token");
            }
            AuthError::NoCredentialPresented | AuthError::SessionNotFound => {
                tracing::info!(request_id = request_id, error = %self, "Request not authenticated");
            }
            AuthError::StoreUnavailable(_)
            | AuthError::SessionStoreWriteFailed { .. }
            | AuthError::InvalidSessionRecord(_)
            | AuthError::Signing(_)
            | AuthError::InvalidSettings(_) => {
                tracing::error!(request_id = request_id, error = %self, "Session infrastructure error");
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NoCredentialPresented => write!(f, "no credentials were provided"),
            AuthError::Malformed => write!(f, "token is malformed"),
            AuthError::InvalidSignature => write!(f, "token signature is not valid"),
            AuthError::ClaimMissing(claim) => write!(f, "token does not include the {} claim", claim),
            AuthError::SessionNotFound => write!(f, "session not found"),
            AuthError::StoreUnavailable(e) => write!(f, "session store unavailable: {}", e),
            AuthError::SessionStoreWriteFailed { class, source } => {
                write!(f, "cannot store new {} session: {}", class, source)
            }
            AuthError::InvalidSessionRecord(value) => {
                write!(f, "session record holds an invalid user id: {:?}", value)
            }
            AuthError::Signing(msg) => write!(f, "token signing failed: {}", msg),
            AuthError::InvalidSettings(msg) => write!(f, "invalid auth settings: {}", msg),
        }
    }
}

impl StdError for AuthError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AuthError::StoreUnavailable(e) => Some(e),
            AuthError::SessionStoreWriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreUnavailable(err)
    }
}

/// ============================================================================
/// HTTP RESPONSE MAPPING
/// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with logs
    pub error_id: String,
    /// Human-readable reason
    pub error: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, error: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            error,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        if self.is_credential_error() {
            StatusCode::UNAUTHORIZED
        } else {
            match self {
                AuthError::StoreUnavailable(_) | AuthError::SessionStoreWriteFailed { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log(&request_id);

        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse::new(
            request_id,
            self.reason(),
            self.code().to_string(),
            status.as_u16(),
        ))
    }
}
