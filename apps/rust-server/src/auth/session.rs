// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token signing and verification.
//!
//! ## Key Material
//!
//! Every replica must verify tokens signed by any other replica, so the
//! signing secret lives in the shared store. The cluster primary creates it
//! on first boot; replicas only ever read it and refuse to start without it.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::info;

use super::claims::{RawSessionClaims, SessionClaims};
use super::AuthError;
use crate::cluster::ClusterAuthority;
use crate::storage::{ConfigStore, StoreError};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Length of a freshly generated signing secret.
const SECRET_LEN: usize = 32;

/// Token-verification collaborator used by the session validator.
#[async_trait]
pub trait SessionTokens: Send + Sync {
    /// Verify integrity and expiry, then decode the claims.
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthError>;

    /// Sign claims into a token for the login cookie.
    fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionKeyError {
    #[error("failed to access signing secret: {0}")]
    Store(#[from] StoreError),

    #[error("no session signing secret in the store and this node is not the primary")]
    MissingSecret,

    #[error("system random number generator failed")]
    Random,
}

/// HS256 session keys derived from the shared secret.
pub struct JwtSessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtSessionKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Load the cluster-wide secret, creating it when this node is primary.
    pub fn load_or_create(
        store: &dyn ConfigStore,
        cluster: &ClusterAuthority,
    ) -> Result<Arc<Self>, SessionKeyError> {
        if let Some(secret) = store.signing_secret()? {
            return Ok(Arc::new(Self::from_secret(&secret)));
        }

        if !cluster.is_primary() {
            return Err(SessionKeyError::MissingSecret);
        }

        let mut secret = [0u8; SECRET_LEN];
        SystemRandom::new()
            .fill(&mut secret)
            .map_err(|_| SessionKeyError::Random)?;
        store.set_signing_secret(&secret)?;
        info!("Generated new session signing secret");

        Ok(Arc::new(Self::from_secret(&secret)))
    }

    fn validation() -> jsonwebtoken::Validation {
        let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }
}

#[async_trait]
impl SessionTokens for JwtSessionKeys {
    async fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let token_data = decode::<RawSessionClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        SessionClaims::try_from(token_data.claims)
    }

    fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterRole, StaticRole};
    use crate::models::Identity;
    use crate::storage::InMemoryStore;

    fn keys() -> JwtSessionKeys {
        JwtSessionKeys::from_secret(b"0123456789abcdef0123456789abcdef")
    }

    #[tokio::test]
    async fn issued_tokens_verify() {
        let keys = keys();
        let claims = SessionClaims::new(vec![Identity::email("a@b.com", "Email")], 3600);
        let token = keys.issue(&claims).unwrap();

        let verified = keys.verify(&token).await.unwrap();
        assert_eq!(verified.identities, claims.identities);
    }

    #[tokio::test]
    async fn foreign_secret_fails_signature() {
        let claims = SessionClaims::new(vec![Identity::email("a@b.com", "Email")], 3600);
        let token = JwtSessionKeys::from_secret(b"another secret entirely........")
            .issue(&claims)
            .unwrap();

        let result = keys().verify(&token).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let keys = keys();
        let mut claims = SessionClaims::new(vec![Identity::email("a@b.com", "Email")], 0);
        claims.exp -= 3600;
        let token = keys.issue(&claims).unwrap();

        assert!(matches!(keys.verify(&token).await, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        assert!(matches!(
            keys().verify("not.a.token").await,
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn primary_creates_secret_once() {
        let store = InMemoryStore::new();
        let primary = ClusterAuthority::detect(&StaticRole(ClusterRole::Primary));

        JwtSessionKeys::load_or_create(&store, &primary).unwrap();
        let first = store.signing_secret().unwrap().unwrap();
        assert_eq!(first.len(), SECRET_LEN);

        JwtSessionKeys::load_or_create(&store, &primary).unwrap();
        assert_eq!(store.signing_secret().unwrap().unwrap(), first);
    }

    #[tokio::test]
    async fn replica_shares_primary_secret() {
        let store = InMemoryStore::new();
        let replica = ClusterAuthority::detect(&StaticRole(ClusterRole::Replica));
        assert!(matches!(
            JwtSessionKeys::load_or_create(&store, &replica),
            Err(SessionKeyError::MissingSecret)
        ));

        let primary = ClusterAuthority::detect(&StaticRole(ClusterRole::Primary));
        let primary_keys = JwtSessionKeys::load_or_create(&store, &primary).unwrap();
        let replica_keys = JwtSessionKeys::load_or_create(&store, &replica).unwrap();

        let claims = SessionClaims::new(vec![Identity::email("a@b.com", "Email")], 3600);
        let token = primary_keys.issue(&claims).unwrap();
        assert!(replica_keys.verify(&token).await.is_ok());
    }
}
