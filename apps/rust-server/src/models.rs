// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Data Model
//!
//! Shared data shapes passed between the session validator, the tenancy
//! router and the configuration store. Nothing in here has behaviour beyond
//! construction and projection.
//!
//! ## Model Categories
//!
//! - **Identities**: proven external identities carried inside a session
//! - **Logins**: historical audit records of completed logins
//! - **Validation**: the per-request projection used for forward-auth headers
//! - **Configuration records**: domains, users, OAuth2 providers, SMTP

use serde::{Deserialize, Serialize};

/// Identity type for email-address identities.
pub const IDENTITY_TYPE_EMAIL: &str = "email";

/// Owner id of domains administered by the gateway operator itself.
pub const ROOT_OWNER: &str = "root";

// =============================================================================
// Identities
// =============================================================================

/// One proven external identity (an email address, an OAuth2 subject, ...).
///
/// Immutable once recorded into a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id_type: String,
    pub id: String,
    pub provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
    pub email_verified: bool,
}

impl Identity {
    /// Build an identity whose id is a verified email address.
    pub fn email(address: impl Into<String>, provider_name: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            id_type: IDENTITY_TYPE_EMAIL.to_string(),
            id: address.clone(),
            provider_name: provider_name.into(),
            name: None,
            email: address,
            email_verified: true,
        }
    }
}

/// Audit record of a completed login event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Login {
    pub id_type: String,
    pub id: String,
    pub provider_name: String,
    /// RFC 3339 timestamp of the login.
    #[serde(rename = "ts")]
    pub timestamp: String,
}

// =============================================================================
// Validation
// =============================================================================

/// Minimal projection of the active identity, used for header injection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Validation {
    pub id_type: String,
    pub id: String,
}

impl From<&Identity> for Validation {
    fn from(identity: &Identity) -> Self {
        Self {
            id_type: identity.id_type.clone(),
            id: identity.id.clone(),
        }
    }
}

// =============================================================================
// Configuration Records
// =============================================================================

/// Ownership record for a hostname served by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Domain {
    pub domain: String,
    /// Hex SHA-256 of the owner id. See [`crate::storage::hash_owner`].
    pub hashed_owner_id: String,
}

impl Domain {
    /// Whether the domain is administered by the operator (static landing page).
    pub fn is_root_owned(&self) -> bool {
        self.hashed_owner_id == crate::storage::hash_owner(ROOT_OWNER)
    }
}

/// A user provisioned from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct User {
    pub id_type: String,
    pub id: String,
}

impl User {
    pub fn email(address: &str) -> Self {
        Self {
            id_type: IDENTITY_TYPE_EMAIL.to_string(),
            id: normalize_email(address),
        }
    }
}

/// External OAuth2/OIDC provider a user can link an identity from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuth2Provider {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub openid_connect: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Outbound mail settings for the email magic-link login method.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmtpConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_name: String,
}

/// Canonical form of an email address used as an identity id.
pub fn normalize_email(address: &str) -> String {
    use unicode_normalization::UnicodeNormalization;

    address.trim().nfkc().collect::<String>().to_lowercase()
}
