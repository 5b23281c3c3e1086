/// Authentication module
///
/// Token claims, the signed token codec, and the token lifecycle service
/// backed by the session store.

mod claims;
mod jwt;
mod service;

pub use claims::{AccessClaims, RefreshClaims, SessionClaims, TokenKind, ROLE_USER, ROLE_VISITOR};
pub use jwt::{is_hmac, ParsedToken, TokenCodec};
pub use service::{AccessDetails, TokenPair, TokenService};
