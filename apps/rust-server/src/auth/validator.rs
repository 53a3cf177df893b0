// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Forward-auth session validation.
//!
//! ## Passthrough Policy
//!
//! When the store's forward-auth passthrough flag is set, any failure to
//! establish a session (no cookie, bad token, no identities, timeout) yields
//! an anonymous `Ok(None)` and the request proceeds with empty identity
//! headers. A failure to read the store itself is always an error.
//!
//! ## Deadline
//!
//! One deadline of `timeout` covers the whole validation. Store reads run on
//! the blocking pool so the deadline can interrupt them; a store read that
//! misses it is a store failure, never a passthrough candidate.

use std::{sync::Arc, time::Duration};

use axum::http::HeaderMap;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use super::{cookie::cookie_value, AuthError, SessionTokens};
use crate::models::Validation;
use crate::storage::{ConfigStore, StoreResult};

/// Resolves the verified identity of a request from its login cookie.
///
/// Read-only: never touches the session or the store beyond reading.
#[derive(Clone)]
pub struct SessionValidator {
    store: Arc<dyn ConfigStore>,
    tokens: Arc<dyn SessionTokens>,
    timeout: Duration,
}

impl SessionValidator {
    pub fn new(store: Arc<dyn ConfigStore>, tokens: Arc<dyn SessionTokens>, timeout: Duration) -> Self {
        Self {
            store,
            tokens,
            timeout,
        }
    }

    /// Identity of the active session, `None` for an anonymous passthrough.
    pub async fn validate(&self, headers: &HeaderMap) -> Result<Option<Validation>, AuthError> {
        let deadline = Instant::now() + self.timeout;

        let passthrough = self
            .read_store(deadline, "forward-auth passthrough", |store| {
                store.forward_auth_passthrough()
            })
            .await?;

        let outcome = match self.read_store(deadline, "login cookie name", |store| store.login_cookie_name()).await {
            Ok(cookie_name) => match timeout_at(deadline, self.session_identity(headers, &cookie_name)).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::Timeout),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(validation) => Ok(Some(validation)),
            Err(e) if passthrough && e.passthrough_eligible() => {
                debug!(error_code = e.error_code(), error = %e, "Passing request through anonymously");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run a synchronous store read off the async workers, bounded by `deadline`.
    async fn read_store<T, F>(&self, deadline: Instant, what: &'static str, read: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ConfigStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || read(store.as_ref()));

        match timeout_at(deadline, task).await {
            Ok(Ok(result)) => result.map_err(AuthError::from),
            Ok(Err(join_error)) => Err(AuthError::Store(format!("reading {what} failed: {join_error}"))),
            Err(_) => Err(AuthError::Store(format!("timed out reading {what}"))),
        }
    }

    async fn session_identity(&self, headers: &HeaderMap, cookie_name: &str) -> Result<Validation, AuthError> {
        let token = cookie_value(headers, cookie_name).ok_or(AuthError::MissingSessionCookie)?;
        if token.is_empty() {
            return Err(AuthError::MalformedCookie);
        }

        let claims = self.tokens.verify(token).await?;

        // TODO: expose every linked identity once downstream header names are agreed
        claims
            .active_identity()
            .map(Validation::from)
            .ok_or(AuthError::MissingIdentities)
    }
}
