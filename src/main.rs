use std::net::TcpListener;
use std::sync::Arc;

use session_auth::auth::TokenService;
use session_auth::configuration::{get_configuration, StoreBackend};
use session_auth::session_store::{InMemorySessionStore, RedisSessionStore, SessionStore};
use session_auth::startup::run;
use session_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Telemetry is configured by the settings, so nothing is subscribed yet
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    init_telemetry(&configuration.telemetry);
    tracing::info!(auth = ?configuration.auth, "Configuration loaded");

    let store: Arc<dyn SessionStore> = match configuration.session_store.backend {
        StoreBackend::Redis => {
            let store = RedisSessionStore::connect(&configuration.session_store.redis_url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to session store: {}", e);
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Session store connection error")
                })?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions do not survive restarts");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let tokens = TokenService::new(&configuration.auth, store).map_err(|e| {
        tracing::error!("Failed to build token service: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Token service error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    if configuration.application.expose_login {
        tracing::warn!("POST /auth/login is exposed; it issues sessions without checking credentials");
    }

    let server = run(listener, Arc::new(tokens), configuration.application.expose_login)?;
    server.await
}
