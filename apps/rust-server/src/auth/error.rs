// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session validation errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request could not be tied to a session identity.
///
/// Everything except [`AuthError::Store`] describes an invalid or absent
/// session and is subject to the forward-auth passthrough policy.
#[derive(Debug)]
pub enum AuthError {
    /// No login cookie present
    MissingSessionCookie,
    /// Login cookie present but empty or unreadable
    MalformedCookie,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token carries no identities (absent, null or empty list)
    MissingIdentities,
    /// `identities` claim is not a list of identities
    MalformedIdentities(String),
    /// Token verification did not finish in time
    Timeout,
    /// Internal error in the token collaborator
    InternalError(String),
    /// Configuration store could not be read
    Store(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Get the error code for this error (for logs, never sent to clients).
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingSessionCookie => "missing_session_cookie",
            AuthError::MalformedCookie => "malformed_cookie",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::MissingIdentities => "missing_identities",
            AuthError::MalformedIdentities(_) => "malformed_identities",
            AuthError::Timeout => "timeout",
            AuthError::InternalError(_) => "internal_error",
            AuthError::Store(_) => "store_unavailable",
        }
    }

    /// Whether the passthrough policy may turn this failure into an
    /// anonymous result. A store failure never is.
    pub fn passthrough_eligible(&self) -> bool {
        !matches!(self, AuthError::Store(_))
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingSessionCookie => write!(f, "No login cookie"),
            AuthError::MalformedCookie => write!(f, "Login cookie is malformed"),
            AuthError::MalformedToken => write!(f, "Session token is malformed"),
            AuthError::InvalidSignature => write!(f, "Session token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Session token has expired"),
            AuthError::MissingIdentities => write!(f, "No identities"),
            AuthError::MalformedIdentities(msg) => write!(f, "Invalid identities claim: {msg}"),
            AuthError::Timeout => write!(f, "Session validation timed out"),
            AuthError::InternalError(msg) => write!(f, "Internal session error: {msg}"),
            AuthError::Store(msg) => write!(f, "Configuration store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<crate::storage::StoreError> for AuthError {
    fn from(e: crate::storage::StoreError) -> Self {
        AuthError::Store(e.to_string())
    }
}

/// Always 401 with an opaque body; the detail belongs in server logs.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!(error_code = self.error_code(), error = %self, "Rejected unauthenticated request");
        let body = Json(AuthErrorBody {
            error: "Unauthorized",
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn rejection_is_opaque_401() {
        let response = AuthError::InvalidSignature.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn store_errors_do_not_leak_detail() {
        let response = AuthError::Store("disk /var/lib/obligator is read-only".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!String::from_utf8_lossy(&body_bytes).contains("read-only"));
    }

    #[test]
    fn only_store_failures_bypass_passthrough() {
        assert!(AuthError::MissingSessionCookie.passthrough_eligible());
        assert!(AuthError::MalformedIdentities("x".into()).passthrough_eligible());
        assert!(AuthError::Timeout.passthrough_eligible());
        assert!(!AuthError::Store("down".into()).passthrough_eligible());
    }
}
