/// Credential transport
///
/// Where tokens live on the wire. Each token class has a slot: a cookie,
/// with a header fallback for clients that cannot hold cookies. Tokens are
/// always written back as `HttpOnly`, `Secure`, `SameSite=Strict` cookies
/// scoped to `/`.

use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpRequest;
use chrono::{DateTime, Utc};

use crate::auth::TokenKind;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const REFRESH_HEADER: &str = "X-Refresh-Token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSlot {
    Access,
    Refresh,
}

impl CredentialSlot {
    pub fn cookie_name(self) -> &'static str {
        match self {
            CredentialSlot::Access => ACCESS_COOKIE,
            CredentialSlot::Refresh => REFRESH_COOKIE,
        }
    }

    pub fn kind(self) -> TokenKind {
        match self {
            CredentialSlot::Access => TokenKind::Access,
            CredentialSlot::Refresh => TokenKind::Refresh,
        }
    }
}

/// Read side of the transport: an inbound request
pub trait CredentialSource {
    /// Raw token carried in `slot`, if any. Empty values count as absent.
    fn read_credential(&self, slot: CredentialSlot) -> Option<String>;

    /// Whether the request carries any credential-bearing header or cookie
    fn presents_credentials(&self) -> bool;
}

/// Write side of the transport: the outbound response
pub trait CredentialSink {
    fn write_credential(&mut self, slot: CredentialSlot, raw_token: &str, expires_at: DateTime<Utc>);

    /// Human-readable reason accompanying a denial
    fn write_reason(&mut self, reason: &str);
}

impl CredentialSource for HttpRequest {
    fn read_credential(&self, slot: CredentialSlot) -> Option<String> {
        if let Some(cookie) = self.cookie(slot.cookie_name()) {
            if !cookie.value().is_empty() {
                return Some(cookie.value().to_string());
            }
        }

        match slot {
            CredentialSlot::Access => self
                .headers()
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
            CredentialSlot::Refresh => self
                .headers()
                .get(REFRESH_HEADER)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        }
    }

    fn presents_credentials(&self) -> bool {
        let headers = self.headers();
        headers.contains_key(AUTHORIZATION)
            || headers.contains_key(REFRESH_HEADER)
            || self.cookie(ACCESS_COOKIE).is_some()
            || self.cookie(REFRESH_COOKIE).is_some()
    }
}

/// Cookie carrying `raw_token` in `slot` until `expires_at`
pub fn credential_cookie(slot: CredentialSlot, raw_token: &str, expires_at: DateTime<Utc>) -> Cookie<'static> {
    Cookie::build(slot.cookie_name(), raw_token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .expires(OffsetDateTime::from_unix_timestamp(expires_at.timestamp()).ok())
        .finish()
}

/// Cookie instructing the client to drop `slot`
pub fn removal_cookie(slot: CredentialSlot) -> Cookie<'static> {
    let mut cookie = credential_cookie(slot, "", Utc::now());
    cookie.make_removal();
    cookie
}

/// Collects what the authorization decision wants written to the response
#[derive(Debug, Default)]
pub struct ResponseCredentials {
    cookies: Vec<Cookie<'static>>,
    reason: Option<String>,
}

impl ResponseCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl CredentialSink for ResponseCredentials {
    fn write_credential(&mut self, slot: CredentialSlot, raw_token: &str, expires_at: DateTime<Utc>) {
        self.cookies.retain(|c| c.name() != slot.cookie_name());
        self.cookies.push(credential_cookie(slot, raw_token, expires_at));
    }

    fn write_reason(&mut self, reason: &str) {
        self.reason = Some(reason.to_string());
    }
}
