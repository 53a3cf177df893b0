// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims.

use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::Identity;

/// Claims signed into a session token.
///
/// `identities` is never empty for a valid session. The first element is
/// the active identity; later elements are identities linked to the same
/// session by further logins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub identities: Vec<Identity>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for `identities`, valid from now for `ttl_secs`.
    pub fn new(identities: Vec<Identity>, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            identities,
            iat: now,
            exp: now + ttl_secs,
        }
    }

    /// The identity used for forward-auth headers.
    pub fn active_identity(&self) -> Option<&Identity> {
        self.identities.first()
    }
}

/// Claims as decoded, before the identities list has been checked.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSessionClaims {
    #[serde(default)]
    identities: Option<serde_json::Value>,
    #[serde(default)]
    iat: i64,
    #[serde(default)]
    exp: i64,
}

impl TryFrom<RawSessionClaims> for SessionClaims {
    type Error = AuthError;

    /// Rejects an `identities` value that is not a list of identities, and
    /// treats an empty list exactly like an absent claim.
    fn try_from(raw: RawSessionClaims) -> Result<Self, Self::Error> {
        let value = raw.identities.ok_or(AuthError::MissingIdentities)?;

        let identities: Vec<Identity> = serde_json::from_value(value)
            .map_err(|e| AuthError::MalformedIdentities(e.to_string()))?;

        if identities.is_empty() {
            return Err(AuthError::MissingIdentities);
        }

        Ok(Self {
            identities,
            iat: raw.iat,
            exp: raw.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<SessionClaims, AuthError> {
        let raw: RawSessionClaims = serde_json::from_value(value).unwrap();
        SessionClaims::try_from(raw)
    }

    fn identity_json(id_type: &str, id: &str) -> serde_json::Value {
        json!({
            "id_type": id_type,
            "id": id,
            "provider_name": "Test",
            "email": "",
            "email_verified": false
        })
    }

    #[test]
    fn keeps_identity_order() {
        let claims = parse(json!({
            "identities": [identity_json("email", "a@b.com"), identity_json("github", "42")],
            "iat": 1,
            "exp": 2
        }))
        .unwrap();
        assert_eq!(claims.identities.len(), 2);
        assert_eq!(claims.active_identity().unwrap().id, "a@b.com");
    }

    #[test]
    fn absent_null_and_empty_are_all_missing() {
        assert!(matches!(parse(json!({})), Err(AuthError::MissingIdentities)));
        assert!(matches!(
            parse(json!({"identities": null})),
            Err(AuthError::MissingIdentities)
        ));
        assert!(matches!(
            parse(json!({"identities": []})),
            Err(AuthError::MissingIdentities)
        ));
    }

    #[test]
    fn wrong_shapes_are_rejected_not_coerced() {
        assert!(matches!(
            parse(json!({"identities": "a@b.com"})),
            Err(AuthError::MalformedIdentities(_))
        ));
        assert!(matches!(
            parse(json!({"identities": [{"id_type": "email"}]})),
            Err(AuthError::MalformedIdentities(_))
        ));
        // Numeric id must not be coerced into a string
        assert!(matches!(
            parse(json!({"identities": [{
                "id_type": "github", "id": 42, "provider_name": "GitHub",
                "email": "", "email_verified": false
            }]})),
            Err(AuthError::MalformedIdentities(_))
        ));
    }
}
