use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::logger::RequestLogger;
use crate::middleware::SessionAuth;
use crate::routes::{current_user, health_check, login, logout, refresh};

pub fn run(
    listener: TcpListener,
    tokens: Arc<TokenService>,
    expose_login: bool,
) -> Result<Server, std::io::Error> {
    let tokens_data = web::Data::from(tokens.clone());

    let server = HttpServer::new(move || {
        let mut auth_routes = web::scope("/auth")
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout));
        if expose_login {
            auth_routes = auth_routes.route("/login", web::post().to(login));
        }

        App::new()
            .wrap(RequestLogger)
            .app_data(tokens_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(auth_routes)
            // Protected routes (require an authenticated session)
            .service(
                web::scope("/api")
                    .wrap(SessionAuth::new(tokens.clone()))
                    .route("/me", web::get().to(current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
