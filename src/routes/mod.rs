mod auth;

use actix_web::HttpResponse;

pub use auth::{current_user, login, logout, refresh, LoginRequest, SessionResponse};

/// Liveness probe. Does not touch the session store.
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
