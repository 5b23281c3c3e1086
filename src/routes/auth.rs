/// Authentication Routes
///
/// Session issuance, explicit rotation, logout and the current identity.
/// Tokens travel in cookies; bodies only describe the session.

use actix_web::{web, Error, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::{AccessDetails, TokenKind, TokenPair, TokenService};
use crate::error::AuthError;
use crate::transport::{credential_cookie, removal_cookie, CredentialSlot, CredentialSource};

/// Session issuance request
///
/// Credential checks belong to the user service in front of this route.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub user_id: i64,
    pub role: String,
}

/// Description of the session behind freshly written cookies
#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: i64,
    pub role: String,
    pub access_expires_at: String,
    pub refresh_expires_at: String,
}

fn session_response(mut builder: HttpResponseBuilder, pair: &TokenPair, details: AccessDetails) -> HttpResponse {
    builder
        .cookie(credential_cookie(CredentialSlot::Access, &pair.access_token, pair.access_expires_at))
        .cookie(credential_cookie(CredentialSlot::Refresh, &pair.refresh_token, pair.refresh_expires_at))
        .json(SessionResponse {
            user_id: details.user_id,
            role: details.role,
            access_expires_at: pair.access_expires_at.to_rfc3339(),
            refresh_expires_at: pair.refresh_expires_at.to_rfc3339(),
        })
}

/// POST /auth/login
///
/// Issue a token pair for an already authenticated principal.
///
/// # Errors
/// - 400: Empty role
/// - 503: Session store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, Error> {
    let LoginRequest { user_id, role } = form.into_inner();
    let role = role.trim().to_string();
    if role.is_empty() {
        return Err(actix_web::error::ErrorBadRequest("role must not be empty"));
    }

    let pair = tokens.issue_token_pair(user_id, &role).await?;

    Ok(session_response(
        HttpResponse::Ok(),
        &pair,
        AccessDetails { user_id, role },
    ))
}

/// POST /auth/refresh
///
/// Exchange the refresh token for a new pair. The presented refresh token
/// is retired and cannot be used again.
///
/// # Errors
/// - 401: Missing, invalid, expired or already used refresh token
/// - 503: Session store unavailable
pub async fn refresh(req: HttpRequest, tokens: web::Data<TokenService>) -> Result<HttpResponse, AuthError> {
    let refresh_token = req
        .read_credential(CredentialSlot::Refresh)
        .ok_or(AuthError::NoCredentialPresented)?;

    let (pair, details) = tokens.refresh_session(&refresh_token).await?;

    Ok(session_response(HttpResponse::Ok(), &pair, details))
}

/// POST /auth/logout
///
/// Revoke the sessions behind whichever tokens are presented and clear both
/// cookies. Expired tokens are accepted; tokens that are not ours are not,
/// and one such token aborts the whole logout before anything is deleted.
///
/// # Errors
/// - 401: No tokens, or a token that fails signature/structure checks
/// - 503: Session store unavailable
pub async fn logout(req: HttpRequest, tokens: web::Data<TokenService>) -> Result<HttpResponse, AuthError> {
    let presented: Vec<(TokenKind, String)> = [CredentialSlot::Access, CredentialSlot::Refresh]
        .into_iter()
        .filter_map(|slot| req.read_credential(slot).map(|token| (slot.kind(), token)))
        .collect();

    if presented.is_empty() {
        return Err(AuthError::NoCredentialPresented);
    }

    // All or nothing: a bad token in either slot leaves both sessions alive
    tokens.revoke(&presented).await?;

    Ok(HttpResponse::NoContent()
        .cookie(removal_cookie(CredentialSlot::Access))
        .cookie(removal_cookie(CredentialSlot::Refresh))
        .finish())
}

/// GET /api/me
///
/// **Requires an authenticated session** (see `SessionAuth`).
pub async fn current_user(details: web::ReqData<AccessDetails>) -> HttpResponse {
    HttpResponse::Ok().json(details.into_inner())
}
