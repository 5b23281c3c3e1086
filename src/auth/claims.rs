/// Token claims, one explicit structure per token class
///
/// The class is carried by the *name* of the session claim: access tokens
/// hold `access_uuid`, refresh tokens hold `refresh_uuid`. A token of one
/// class never deserializes as the other.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_VISITOR: &str = "visitor";

/// Which of the two credentials of a pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Payload claim carrying the session identifier for this class
    pub fn session_claim(self) -> &'static str {
        match self {
            TokenKind::Access => "access_uuid",
            TokenKind::Refresh => "refresh_uuid",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Common view over [`AccessClaims`] and [`RefreshClaims`]
pub trait SessionClaims: Serialize + DeserializeOwned {
    const KIND: TokenKind;

    fn new(session_id: Uuid, role: String, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self;
    fn session_id(&self) -> Uuid;
    fn role(&self) -> &str;
    /// Expiration time (Unix timestamp)
    fn expires_at(&self) -> i64;
}

/// Claims of a short-lived access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccessClaims {
    pub access_uuid: Uuid,
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims of a long-lived, single-use refresh token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RefreshClaims {
    pub refresh_uuid: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn new(session_id: Uuid, role: String, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_uuid: session_id,
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    fn session_id(&self) -> Uuid {
        self.access_uuid
    }

    fn role(&self) -> &str {
        &self.role
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl SessionClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn new(session_id: Uuid, role: String, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            refresh_uuid: session_id,
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    fn session_id(&self) -> Uuid {
        self.refresh_uuid
    }

    fn role(&self) -> &str {
        &self.role
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}
