/// Authorization decision procedure
///
/// 1. No credential on the request at all: deny.
/// 2. Access token present: verify it. An expired or revoked session falls
///    through to the refresh step; any other failure (tampering, wrong
///    class, store outage) denies immediately.
/// 3. Refresh token present: rotate the pair, write the new tokens to the
///    response and allow. Anything else denies.
///
/// Every denial writes a human-readable reason to the sink.

use crate::auth::{AccessDetails, TokenService};
use crate::error::AuthError;
use crate::transport::{CredentialSink, CredentialSlot, CredentialSource};

#[derive(Debug)]
pub enum AuthOutcome {
    Allowed(AccessDetails),
    Denied(AuthError),
}

impl AuthOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthOutcome::Allowed(_))
    }
}

pub async fn authorize<R, W>(tokens: &TokenService, request: &R, sink: &mut W) -> AuthOutcome
where
    R: CredentialSource + ?Sized,
    W: CredentialSink,
{
    match decide(tokens, request, sink).await {
        Ok(details) => AuthOutcome::Allowed(details),
        Err(err) => {
            sink.write_reason(&err.reason());
            AuthOutcome::Denied(err)
        }
    }
}

async fn decide<R, W>(tokens: &TokenService, request: &R, sink: &mut W) -> Result<AccessDetails, AuthError>
where
    R: CredentialSource + ?Sized,
    W: CredentialSink,
{
    if !request.presents_credentials() {
        return Err(AuthError::NoCredentialPresented);
    }

    let mut access_failure = None;
    if let Some(access_token) = request.read_credential(CredentialSlot::Access) {
        match tokens.verify_access_token(&access_token).await {
            Ok(details) => return Ok(details),
            Err(AuthError::SessionNotFound) => {
                tracing::debug!("Access session expired or revoked; trying refresh token");
                access_failure = Some(AuthError::SessionNotFound);
            }
            Err(err) => return Err(err),
        }
    }

    let refresh_token = match request.read_credential(CredentialSlot::Refresh) {
        Some(token) => token,
        None => return Err(access_failure.unwrap_or(AuthError::NoCredentialPresented)),
    };

    let (pair, details) = tokens.refresh_session(&refresh_token).await?;
    sink.write_credential(CredentialSlot::Access, &pair.access_token, pair.access_expires_at);
    sink.write_credential(CredentialSlot::Refresh, &pair.refresh_token, pair.refresh_expires_at);

    tracing::info!(user_id = details.user_id, "Session silently rotated");
    Ok(details)
}
