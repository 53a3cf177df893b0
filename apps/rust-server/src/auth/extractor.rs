// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the session identity.
//!
//! ```rust,ignore
//! async fn my_handler(Validated(identity): Validated) -> impl IntoResponse {
//!     // identity is None for an anonymous passthrough
//! }
//! ```
//!
//! Handlers that must react to a failed validation themselves take
//! `Result<Validated, AuthError>` instead.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AuthError;
use crate::models::Validation;
use crate::state::AppState;

/// Validated session identity of the request.
pub struct Validated(pub Option<Validation>);

impl FromRequestParts<AppState> for Validated {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let validation = state.validator.validate(&parts.headers).await?;
        Ok(Validated(validation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionClaims, SessionTokens};
    use crate::models::Identity;
    use crate::state::test_state;
    use crate::storage::ConfigStore;
    use axum::http::Request;

    #[tokio::test]
    async fn rejects_without_cookie() {
        let (state, _) = test_state();
        let mut parts = Request::builder().uri("/").body(()).unwrap().into_parts().0;

        let result = Validated::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingSessionCookie)));
    }

    #[tokio::test]
    async fn extracts_identity_from_cookie() {
        let (state, keys) = test_state();
        let token = keys
            .issue(&SessionClaims::new(vec![Identity::email("a@b.com", "Email")], 60))
            .unwrap();
        let mut parts = Request::builder()
            .uri("/")
            .header("Cookie", format!("obligator_login_key={token}"))
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let Validated(validation) = Validated::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(validation.unwrap().id, "a@b.com");
    }

    #[tokio::test]
    async fn anonymous_under_passthrough() {
        let (state, _) = test_state();
        state.store.set_forward_auth_passthrough(true).unwrap();
        let mut parts = Request::builder().uri("/").body(()).unwrap().into_parts().0;

        let Validated(validation) = Validated::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(validation.is_none());
    }
}
