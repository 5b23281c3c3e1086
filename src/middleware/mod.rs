/// Middleware module
///
/// The authorization decision procedure and the actix middleware running it.

mod authorize;
mod session_auth;

pub use authorize::{authorize, AuthOutcome};
pub use session_auth::SessionAuth;
