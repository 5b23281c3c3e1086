/// Token Lifecycle Service
///
/// Issues access/refresh pairs, verifies them against the session store and
/// rotates a pair when its refresh token is exercised.
///
/// The session store is the only authority on validity: an authentic token
/// whose session record is gone is treated exactly like an expired one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims, SessionClaims, TokenKind};
use crate::auth::jwt::TokenCodec;
use crate::configuration::AuthSettings;
use crate::error::AuthError;
use crate::session_store::SessionStore;

/// A freshly issued access/refresh pair. Rotation always builds a new one.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_session_id: Uuid,
    pub refresh_session_id: Uuid,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Identity resolved from a token and its session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDetails {
    pub user_id: i64,
    pub role: String,
}

#[derive(Debug, Clone, Copy)]
struct Lifetime {
    span: chrono::Duration,
    store_ttl: Duration,
}

impl Lifetime {
    fn new(class: TokenKind, span: Option<chrono::Duration>) -> Result<Self, AuthError> {
        let span = span.ok_or_else(|| {
            AuthError::InvalidSettings(format!("{} token TTL is out of range", class))
        })?;
        let store_ttl = span
            .to_std()
            .map_err(|e| AuthError::InvalidSettings(format!("{} token TTL: {}", class, e)))?;
        Ok(Self { span, store_ttl })
    }
}

pub struct TokenService {
    codec: TokenCodec,
    store: Arc<dyn SessionStore>,
    access: Lifetime,
    refresh: Lifetime,
}

impl TokenService {
    /// # Errors
    /// - `Signing` if the configured algorithm is not an HMAC algorithm
    /// - `InvalidSettings` if a TTL is not positive or exceeds
    ///   `MAX_TOKEN_TTL_SECONDS`
    pub fn new(settings: &AuthSettings, store: Arc<dyn SessionStore>) -> Result<Self, AuthError> {
        Ok(Self {
            codec: TokenCodec::new(&settings.secret, settings.algorithm)?,
            store,
            access: Lifetime::new(TokenKind::Access, settings.access_ttl())?,
            refresh: Lifetime::new(TokenKind::Refresh, settings.refresh_ttl())?,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue a new pair for `user_id` and record both sessions
    ///
    /// Both records get an absolute TTL counted from the same issuance
    /// instant. A failed second write does not undo the first; the orphaned
    /// record expires on its own.
    ///
    /// # Errors
    /// - `SessionStoreWriteFailed` if either record cannot be written
    /// - `Signing` if a token cannot be signed
    pub async fn issue_token_pair(&self, user_id: i64, role: &str) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_session_id = Uuid::new_v4();
        let refresh_session_id = Uuid::new_v4();
        let access_expires_at = now + self.access.span;
        let refresh_expires_at = now + self.refresh.span;

        let access_token = self.codec.generate(&AccessClaims::new(
            access_session_id,
            role.to_string(),
            now,
            access_expires_at,
        ))?;
        let refresh_token = self.codec.generate(&RefreshClaims::new(
            refresh_session_id,
            role.to_string(),
            now,
            refresh_expires_at,
        ))?;

        let value = user_id.to_string();
        self.record_session(TokenKind::Access, access_session_id, &value, self.access.store_ttl)
            .await?;
        self.record_session(TokenKind::Refresh, refresh_session_id, &value, self.refresh.store_ttl)
            .await?;

        tracing::info!(
            user_id = user_id,
            access_session = %access_session_id,
            refresh_session = %refresh_session_id,
            "Token pair issued"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_session_id,
            refresh_session_id,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Resolve the identity behind an access token
    pub async fn verify_access_token(&self, raw_token: &str) -> Result<AccessDetails, AuthError> {
        self.verify::<AccessClaims>(raw_token).await.map(|(_, details)| details)
    }

    /// Resolve the identity behind a refresh token without consuming it
    pub async fn verify_refresh_token(&self, raw_token: &str) -> Result<AccessDetails, AuthError> {
        self.verify::<RefreshClaims>(raw_token).await.map(|(_, details)| details)
    }

    /// Retire the refresh session and issue a new pair for the same user
    ///
    /// The old refresh record is deleted before the new pair is written, so a
    /// failure in between leaves the user logged out rather than holding two
    /// live refresh sessions. If the record was already gone at delete time
    /// (a concurrent rotation won), this rotation fails.
    ///
    /// # Errors
    /// - any verification error of the refresh token
    /// - `SessionNotFound` on replay of an already rotated refresh token
    /// - `StoreUnavailable` if the old record cannot be deleted
    /// - `SessionStoreWriteFailed` if the new pair cannot be recorded
    pub async fn refresh_session(
        &self,
        raw_refresh_token: &str,
    ) -> Result<(TokenPair, AccessDetails), AuthError> {
        let (claims, details) = self.verify::<RefreshClaims>(raw_refresh_token).await?;
        let old_session = claims.session_id();

        if !self.store.delete(&old_session.to_string()).await? {
            tracing::warn!(
                refresh_session = %old_session,
                "Refresh session vanished before rotation; refusing to issue"
            );
            return Err(AuthError::SessionNotFound);
        }

        let pair = self.issue_token_pair(details.user_id, &details.role).await?;

        tracing::info!(
            user_id = details.user_id,
            retired_session = %old_session,
            refresh_session = %pair.refresh_session_id,
            "Refresh session rotated"
        );

        Ok((pair, details))
    }

    /// Delete the session records behind a set of authentic tokens
    ///
    /// Every token is checked before any record is touched, so one bad token
    /// leaves all sessions in place. Returns how many live records were
    /// removed. Expired tokens are still accepted; their record is already
    /// gone or about to be.
    ///
    /// # Errors
    /// - any codec error of a presented token (nothing is deleted)
    /// - `StoreUnavailable` if a delete fails
    pub async fn revoke<T: AsRef<str>>(&self, presented: &[(TokenKind, T)]) -> Result<usize, AuthError> {
        let session_ids = presented
            .iter()
            .map(|(kind, raw_token)| {
                let raw_token = raw_token.as_ref();
                let session_id = match kind {
                    TokenKind::Access => self.codec.parse::<AccessClaims>(raw_token)?.claims.session_id(),
                    TokenKind::Refresh => self.codec.parse::<RefreshClaims>(raw_token)?.claims.session_id(),
                };
                Ok::<_, AuthError>((*kind, session_id))
            })
            .collect::<Result<Vec<_>, AuthError>>()?;

        let mut removed = 0;
        for (kind, session_id) in session_ids {
            let live = self.store.delete(&session_id.to_string()).await?;
            tracing::info!(class = %kind, removed = live, "Session revoked");
            if live {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn verify<C: SessionClaims>(&self, raw_token: &str) -> Result<(C, AccessDetails), AuthError> {
        let parsed = self.codec.parse::<C>(raw_token)?;
        if !parsed.valid {
            let class = C::KIND;
            tracing::debug!(class = %class, "Token past its expiry");
            return Err(AuthError::SessionNotFound);
        }

        let session_id = parsed.claims.session_id();
        let stored = self
            .store
            .get(&session_id.to_string())
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let user_id = stored
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidSessionRecord(stored.clone()))?;

        let details = AccessDetails {
            user_id,
            role: parsed.claims.role().to_string(),
        };
        Ok((parsed.claims, details))
    }

    async fn record_session(
        &self,
        class: TokenKind,
        session_id: Uuid,
        user_id: &str,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        self.store
            .put(&session_id.to_string(), user_id, ttl)
            .await
            .map_err(|source| AuthError::SessionStoreWriteFailed { class, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{ROLE_USER, ROLE_VISITOR};
    use crate::error::StoreError;
    use crate::session_store::InMemorySessionStore;
    use async_trait::async_trait;
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings() -> AuthSettings {
        AuthSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 604800,
            algorithm: Algorithm::HS256,
        }
    }

    fn service_with(store: Arc<dyn SessionStore>) -> TokenService {
        TokenService::new(&settings(), store).expect("Failed to build token service")
    }

    /// Delegates to an in-memory store but fails the `fail_on`-th put
    struct FailingPutStore {
        inner: InMemorySessionStore,
        puts: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl SessionStore for FailingPutStore {
        async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(StoreError::Connection("connection reset".into()));
            }
            self.inner.put(key, value, ttl).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<bool, StoreError> {
            self.inner.delete(key).await
        }
    }

    /// Unreachable backend
    struct DownStore;

    #[async_trait]
    impl SessionStore for DownStore {
        async fn put(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Connection("refused".into()))
        }

        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }

        async fn delete(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Connection("refused".into()))
        }
    }

    #[tokio::test]
    async fn issued_access_token_verifies_to_user_and_role() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));

        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();
        let details = service.verify_access_token(&pair.access_token).await.unwrap();

        assert_eq!(details, AccessDetails { user_id: 7, role: "user".to_string() });
        assert_eq!(store.len().await, 2);
        assert_ne!(pair.access_session_id, pair.refresh_session_id);
    }

    #[tokio::test]
    async fn issued_pair_expiries_follow_configured_ttls() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let before = Utc::now();

        let pair = service.issue_token_pair(1, ROLE_USER).await.unwrap();

        let access = pair.access_expires_at - before;
        let refresh = pair.refresh_expires_at - before;
        assert!(access >= chrono::Duration::minutes(15));
        assert!(access < chrono::Duration::minutes(15) + chrono::Duration::seconds(5));
        assert!(refresh >= chrono::Duration::days(7));
        assert!(refresh < chrono::Duration::days(7) + chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn session_records_hold_decimal_user_id() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));

        let pair = service.issue_token_pair(42, ROLE_VISITOR).await.unwrap();

        let access = store.get(&pair.access_session_id.to_string()).await.unwrap();
        let refresh = store.get(&pair.refresh_session_id.to_string()).await.unwrap();
        assert_eq!(access.as_deref(), Some("42"));
        assert_eq!(refresh.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn token_classes_are_not_interchangeable() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        let as_access = service.verify_access_token(&pair.refresh_token).await;
        assert!(matches!(as_access, Err(AuthError::ClaimMissing("access_uuid"))));

        let as_refresh = service.verify_refresh_token(&pair.access_token).await;
        assert!(matches!(as_refresh, Err(AuthError::ClaimMissing("refresh_uuid"))));
    }

    #[tokio::test]
    async fn deleted_session_is_session_not_found() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));
        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        store.delete(&pair.access_session_id.to_string()).await.unwrap();

        let result = service.verify_access_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::SessionNotFound)));
    }

    #[tokio::test]
    async fn expired_access_token_is_session_not_found() {
        let mut short = settings();
        short.access_token_ttl = 1;
        let service = TokenService::new(&short, Arc::new(InMemorySessionStore::new())).unwrap();
        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let result = service.verify_access_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::SessionNotFound)));
        assert!(service.verify_refresh_token(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn foreign_secret_is_invalid_signature() {
        let service = service_with(Arc::new(InMemorySessionStore::new()));
        let mut other = settings();
        other.secret = "another-secret-entirely-for-this-test".to_string();
        let foreign = TokenService::new(&other, Arc::new(InMemorySessionStore::new())).unwrap();

        let pair = foreign.issue_token_pair(7, ROLE_USER).await.unwrap();

        let result = service.verify_access_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn refresh_rotates_and_is_single_use() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));
        let original = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        let (rotated, details) = service.refresh_session(&original.refresh_token).await.unwrap();
        assert_eq!(details, AccessDetails { user_id: 7, role: "user".to_string() });
        assert_ne!(rotated.refresh_session_id, original.refresh_session_id);
        assert_ne!(rotated.access_session_id, original.access_session_id);

        // The retired refresh record is gone from the store
        let old = store.get(&original.refresh_session_id.to_string()).await.unwrap();
        assert!(old.is_none());

        let replay = service.refresh_session(&original.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::SessionNotFound)));

        let fresh = service.verify_access_token(&rotated.access_token).await.unwrap();
        assert_eq!(fresh.user_id, 7);
    }

    #[tokio::test]
    async fn concurrent_rotations_mint_at_most_one_pair() {
        let service = Arc::new(service_with(Arc::new(InMemorySessionStore::new())));
        let pair = service.issue_token_pair(9, ROLE_USER).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                let token = pair.refresh_token.clone();
                tokio::spawn(async move { service.refresh_session(&token).await.is_ok() })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn failed_second_put_reports_write_failure_and_keeps_first_key() {
        let inner = InMemorySessionStore::new();
        let store = FailingPutStore {
            inner: inner.clone(),
            puts: AtomicUsize::new(0),
            fail_on: 2,
        };
        let service = service_with(Arc::new(store));

        let result = service.issue_token_pair(7, ROLE_USER).await;
        assert!(matches!(
            result,
            Err(AuthError::SessionStoreWriteFailed { class: TokenKind::Refresh, .. })
        ));

        // The access record written first is not rolled back
        assert_eq!(inner.len().await, 1);
    }

    #[tokio::test]
    async fn store_outage_is_distinct_from_credential_errors() {
        let store = InMemorySessionStore::new();
        let issuer = service_with(Arc::new(store));
        let pair = issuer.issue_token_pair(7, ROLE_USER).await.unwrap();

        let service = service_with(Arc::new(DownStore));
        let result = service.verify_access_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));

        let result = service.issue_token_pair(7, ROLE_USER).await;
        assert!(matches!(
            result,
            Err(AuthError::SessionStoreWriteFailed { class: TokenKind::Access, .. })
        ));
    }

    #[tokio::test]
    async fn corrupt_session_record_is_reported() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));
        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        store
            .put(&pair.access_session_id.to_string(), "seven", Duration::from_secs(60))
            .await
            .unwrap();

        let result = service.verify_access_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidSessionRecord(v)) if v == "seven"));
    }

    #[tokio::test]
    async fn revoke_removes_session_record() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));
        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        let access = [(TokenKind::Access, pair.access_token.as_str())];
        assert_eq!(service.revoke(&access).await.unwrap(), 1);
        assert_eq!(service.revoke(&access).await.unwrap(), 0);
        assert!(matches!(
            service.verify_access_token(&pair.access_token).await,
            Err(AuthError::SessionNotFound)
        ));

        let refresh = [(TokenKind::Refresh, pair.refresh_token.as_str())];
        assert_eq!(service.revoke(&refresh).await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn revoke_deletes_nothing_when_any_token_is_bad() {
        let store = InMemorySessionStore::new();
        let service = service_with(Arc::new(store.clone()));
        let pair = service.issue_token_pair(7, ROLE_USER).await.unwrap();

        let presented = [
            (TokenKind::Access, pair.access_token.clone()),
            (TokenKind::Refresh, format!("{}x", pair.refresh_token)),
        ];
        let result = service.revoke(&presented).await;

        assert!(matches!(result, Err(AuthError::InvalidSignature)));
        assert_eq!(store.len().await, 2);
        assert!(service.verify_access_token(&pair.access_token).await.is_ok());
    }

    #[test]
    fn out_of_range_ttl_is_rejected_at_construction() {
        let mut huge = settings();
        huge.refresh_token_ttl = i64::MAX / 10;
        let result = TokenService::new(&huge, Arc::new(InMemorySessionStore::new()));
        assert!(matches!(result, Err(AuthError::InvalidSettings(_))));

        let mut zero = settings();
        zero.access_token_ttl = 0;
        let result = TokenService::new(&zero, Arc::new(InMemorySessionStore::new()));
        assert!(matches!(result, Err(AuthError::InvalidSettings(_))));
    }
}
