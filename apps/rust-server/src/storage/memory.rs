// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local store.
//!
//! Used by tests and by hosts that embed the gateway without a database
//! file. State lives behind a single lock so every setter is atomic.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{hash_owner, normalize_domain, ConfigStore, StoreError, StoreResult};
use crate::models::{Domain, OAuth2Provider, SmtpConfig, User};

/// Full contents of an [`InMemoryStore`]. Comparable, so tests can assert
/// that two write sequences converge on the same state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub prefix: Option<String>,
    pub display_name: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub forward_auth_passthrough: bool,
    pub public: bool,
    pub domains: BTreeMap<String, Domain>,
    pub users: BTreeMap<(String, String), User>,
    pub oauth2_providers: BTreeMap<String, OAuth2Provider>,
    pub signing_secret: Option<Vec<u8>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreSnapshot>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreSnapshot>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".into()))
    }
}

impl ConfigStore for InMemoryStore {
    fn prefix(&self) -> StoreResult<Option<String>> {
        Ok(self.read()?.prefix.clone())
    }

    fn set_prefix(&self, prefix: &str) -> StoreResult<()> {
        self.write()?.prefix = Some(prefix.to_string());
        Ok(())
    }

    fn display_name(&self) -> StoreResult<Option<String>> {
        Ok(self.read()?.display_name.clone())
    }

    fn set_display_name(&self, name: &str) -> StoreResult<()> {
        self.write()?.display_name = Some(name.to_string());
        Ok(())
    }

    fn smtp_config(&self) -> StoreResult<Option<SmtpConfig>> {
        Ok(self.read()?.smtp.clone())
    }

    fn set_smtp_config(&self, smtp: &SmtpConfig) -> StoreResult<()> {
        self.write()?.smtp = Some(smtp.clone());
        Ok(())
    }

    fn forward_auth_passthrough(&self) -> StoreResult<bool> {
        Ok(self.read()?.forward_auth_passthrough)
    }

    fn set_forward_auth_passthrough(&self, enabled: bool) -> StoreResult<()> {
        self.write()?.forward_auth_passthrough = enabled;
        Ok(())
    }

    fn set_public(&self, public: bool) -> StoreResult<()> {
        self.write()?.public = public;
        Ok(())
    }

    fn domain(&self, domain: &str) -> StoreResult<Option<Domain>> {
        Ok(self.read()?.domains.get(&normalize_domain(domain)).cloned())
    }

    fn domains(&self) -> StoreResult<Vec<Domain>> {
        Ok(self.read()?.domains.values().cloned().collect())
    }

    fn add_domain(&self, domain: &str, owner_id: &str) -> StoreResult<()> {
        let domain = normalize_domain(domain);
        self.write()?
            .domains
            .entry(domain.clone())
            .or_insert_with(|| Domain {
                domain,
                hashed_owner_id: hash_owner(owner_id),
            });
        Ok(())
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    fn set_user(&self, user: &User) -> StoreResult<()> {
        self.write()?
            .users
            .insert((user.id_type.clone(), user.id.clone()), user.clone());
        Ok(())
    }

    fn oauth2_providers(&self) -> StoreResult<Vec<OAuth2Provider>> {
        Ok(self.read()?.oauth2_providers.values().cloned().collect())
    }

    fn set_oauth2_provider(&self, provider: &OAuth2Provider) -> StoreResult<()> {
        self.write()?
            .oauth2_providers
            .insert(provider.id.clone(), provider.clone());
        Ok(())
    }

    fn signing_secret(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read()?.signing_secret.clone())
    }

    fn set_signing_secret(&self, secret: &[u8]) -> StoreResult<()> {
        self.write()?.signing_secret = Some(secret.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROOT_OWNER;

    #[test]
    fn add_domain_keeps_first_owner() {
        let store = InMemoryStore::new();
        store.add_domain("example.com", ROOT_OWNER).unwrap();
        store.add_domain("example.com", "mallory@example.com").unwrap();

        let domain = store.domain("example.com").unwrap().unwrap();
        assert!(domain.is_root_owned());
        assert_eq!(store.domains().unwrap().len(), 1);
    }

    #[test]
    fn oauth2_provider_upserts_by_id() {
        let store = InMemoryStore::new();
        let mut provider = OAuth2Provider {
            id: "github".into(),
            name: "GitHub".into(),
            uri: "https://github.com".into(),
            client_id: "id".into(),
            client_secret: "secret".into(),
            openid_connect: false,
            authorization_uri: None,
            token_uri: None,
            userinfo_uri: None,
            scope: None,
        };
        store.set_oauth2_provider(&provider).unwrap();
        provider.client_secret = "rotated".into();
        store.set_oauth2_provider(&provider).unwrap();

        let providers = store.oauth2_providers().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].client_secret, "rotated");
    }

    #[test]
    fn configured_domain_case_does_not_matter() {
        let store = InMemoryStore::new();
        store.add_domain(" Example.COM", ROOT_OWNER).unwrap();

        assert_eq!(store.domain("example.com").unwrap().unwrap().domain, "example.com");
        assert!(store.domain("EXAMPLE.com").unwrap().is_some());
        store.add_domain("example.com", "mallory@example.com").unwrap();
        assert_eq!(store.domains().unwrap().len(), 1);
    }

    #[test]
    fn flags_default_to_false() {
        let store = InMemoryStore::new();
        assert!(!store.forward_auth_passthrough().unwrap());
        assert!(!store.snapshot().unwrap().public);
        assert!(store.signing_secret().unwrap().is_none());
    }
}
