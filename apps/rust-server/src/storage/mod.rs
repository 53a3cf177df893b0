// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Configuration and Identity Store
//!
//! Every replica of the gateway reads the same store: forward-auth policy,
//! owned domains, provisioned users, OAuth2 providers and the session signing
//! secret all live here.
//!
//! ## Implementations
//!
//! - [`InMemoryStore`] - process-local, used by tests and embedding hosts
//! - [`RedbStore`] - embedded redb database file, the default for `main`
//!
//! ## Write Semantics
//!
//! All setters are idempotent: writing the same value twice leaves the
//! store in the same state as writing it once. Only the cluster primary
//! performs configuration-seeding writes (see [`crate::cluster`]).

pub mod database;
#[cfg(test)]
pub(crate) mod faulty;
pub mod memory;
pub mod paths;
pub mod seed;

pub use database::RedbStore;
pub use memory::{InMemoryStore, StoreSnapshot};
pub use paths::StoragePaths;
pub use seed::seed_store;

use sha2::{Digest, Sha256};

use crate::models::{Domain, OAuth2Provider, SmtpConfig, User};

/// Route/cookie prefix used when the store has none.
pub const DEFAULT_PREFIX: &str = "obligator_";

/// Display name used when the store has none.
pub const DEFAULT_DISPLAY_NAME: &str = "obligator";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Store Trait
// =============================================================================

/// The configuration/identity store collaborator.
pub trait ConfigStore: Send + Sync {
    fn prefix(&self) -> StoreResult<Option<String>>;
    fn set_prefix(&self, prefix: &str) -> StoreResult<()>;

    fn display_name(&self) -> StoreResult<Option<String>>;
    fn set_display_name(&self, name: &str) -> StoreResult<()>;

    fn smtp_config(&self) -> StoreResult<Option<SmtpConfig>>;
    fn set_smtp_config(&self, smtp: &SmtpConfig) -> StoreResult<()>;

    /// Whether forward-auth failures degrade to anonymous pass-through.
    fn forward_auth_passthrough(&self) -> StoreResult<bool>;
    fn set_forward_auth_passthrough(&self, enabled: bool) -> StoreResult<()>;

    fn set_public(&self, public: bool) -> StoreResult<()>;

    /// Lookup is case-insensitive; see [`normalize_domain`].
    fn domain(&self, domain: &str) -> StoreResult<Option<Domain>>;
    fn domains(&self) -> StoreResult<Vec<Domain>>;
    /// Record `domain` (normalised) as owned by `owner_id`. An existing
    /// record keeps its owner.
    fn add_domain(&self, domain: &str, owner_id: &str) -> StoreResult<()>;

    fn users(&self) -> StoreResult<Vec<User>>;
    fn set_user(&self, user: &User) -> StoreResult<()>;

    fn oauth2_providers(&self) -> StoreResult<Vec<OAuth2Provider>>;
    /// Insert or replace the provider with the same id.
    fn set_oauth2_provider(&self, provider: &OAuth2Provider) -> StoreResult<()>;

    fn signing_secret(&self) -> StoreResult<Option<Vec<u8>>>;
    fn set_signing_secret(&self, secret: &[u8]) -> StoreResult<()>;

    /// Stored prefix, or [`DEFAULT_PREFIX`].
    fn prefix_or_default(&self) -> StoreResult<String> {
        Ok(self.prefix()?.unwrap_or_else(|| DEFAULT_PREFIX.to_string()))
    }

    /// Name of the session cookie: `{prefix}login_key`.
    fn login_cookie_name(&self) -> StoreResult<String> {
        Ok(format!("{}login_key", self.prefix_or_default()?))
    }
}

/// Stored form of a hostname: trimmed and lowercased.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_lowercase()
}

/// Hex SHA-256 of an owner id, as stored in [`Domain::hashed_owner_id`].
pub fn hash_owner(owner_id: &str) -> String {
    format!("{:x}", Sha256::digest(owner_id.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_owner_is_hex_sha256() {
        assert_eq!(
            hash_owner("root"),
            "4813494d137e1631bba301d5acab6e7bb7aa74ce1185d456565ef51d737677b2"
        );
        assert_ne!(hash_owner("root"), hash_owner("Root"));
    }

    #[test]
    fn domains_normalise_to_lowercase() {
        assert_eq!(normalize_domain(" Example.COM "), "example.com");
    }

    #[test]
    fn login_cookie_name_uses_default_prefix() {
        let store = InMemoryStore::new();
        assert_eq!(store.login_cookie_name().unwrap(), "obligator_login_key");

        store.set_prefix("lastlogin_").unwrap();
        assert_eq!(store.login_cookie_name().unwrap(), "lastlogin_login_key");
    }
}
