// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test store that delays or fails selected operations of an
//! [`InMemoryStore`].

use std::time::Duration;

use super::{ConfigStore, InMemoryStore, StoreError, StoreResult};
use crate::models::{Domain, OAuth2Provider, SmtpConfig, User};

#[derive(Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryStore,
    /// Blocking delay applied to every settings read.
    pub read_delay: Duration,
    pub fail_passthrough: bool,
    pub fail_set_user: bool,
}

impl FaultyStore {
    fn pause(&self) {
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }
    }
}

impl ConfigStore for FaultyStore {
    fn prefix(&self) -> StoreResult<Option<String>> {
        self.pause();
        self.inner.prefix()
    }
    fn set_prefix(&self, prefix: &str) -> StoreResult<()> {
        self.inner.set_prefix(prefix)
    }
    fn display_name(&self) -> StoreResult<Option<String>> {
        self.inner.display_name()
    }
    fn set_display_name(&self, name: &str) -> StoreResult<()> {
        self.inner.set_display_name(name)
    }
    fn smtp_config(&self) -> StoreResult<Option<SmtpConfig>> {
        self.inner.smtp_config()
    }
    fn set_smtp_config(&self, smtp: &SmtpConfig) -> StoreResult<()> {
        self.inner.set_smtp_config(smtp)
    }
    fn forward_auth_passthrough(&self) -> StoreResult<bool> {
        self.pause();
        if self.fail_passthrough {
            return Err(StoreError::Unavailable("disk gone".into()));
        }
        self.inner.forward_auth_passthrough()
    }
    fn set_forward_auth_passthrough(&self, enabled: bool) -> StoreResult<()> {
        self.inner.set_forward_auth_passthrough(enabled)
    }
    fn set_public(&self, public: bool) -> StoreResult<()> {
        self.inner.set_public(public)
    }
    fn domain(&self, domain: &str) -> StoreResult<Option<Domain>> {
        self.inner.domain(domain)
    }
    fn domains(&self) -> StoreResult<Vec<Domain>> {
        self.inner.domains()
    }
    fn add_domain(&self, domain: &str, owner_id: &str) -> StoreResult<()> {
        self.inner.add_domain(domain, owner_id)
    }
    fn users(&self) -> StoreResult<Vec<User>> {
        self.inner.users()
    }
    fn set_user(&self, user: &User) -> StoreResult<()> {
        if self.fail_set_user {
            return Err(StoreError::Unavailable("users table is read-only".into()));
        }
        self.inner.set_user(user)
    }
    fn oauth2_providers(&self) -> StoreResult<Vec<OAuth2Provider>> {
        self.inner.oauth2_providers()
    }
    fn set_oauth2_provider(&self, provider: &OAuth2Provider) -> StoreResult<()> {
        self.inner.set_oauth2_provider(provider)
    }
    fn signing_secret(&self) -> StoreResult<Option<Vec<u8>>> {
        self.inner.signing_secret()
    }
    fn set_signing_secret(&self, secret: &[u8]) -> StoreResult<()> {
        self.inner.set_signing_secret(secret)
    }
}
