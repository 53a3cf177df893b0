// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded configuration database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `settings`: setting name → JSON value (prefix, display name, flags, SMTP)
//! - `domains`: hostname → serialized Domain
//! - `users`: `id_type|id` → serialized User
//! - `oauth2_providers`: provider id → serialized OAuth2Provider
//! - `secrets`: name → raw bytes (session signing secret)

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use super::{hash_owner, normalize_domain, ConfigStore, StoreResult};
use crate::models::{Domain, OAuth2Provider, SmtpConfig, User};

// =============================================================================
// Table Definitions
// =============================================================================

const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

const DOMAINS: TableDefinition<&str, &[u8]> = TableDefinition::new("domains");

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const OAUTH2_PROVIDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("oauth2_providers");

const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

const KEY_PREFIX: &str = "prefix";
const KEY_DISPLAY_NAME: &str = "display_name";
const KEY_SMTP: &str = "smtp";
const KEY_PASSTHROUGH: &str = "forward_auth_passthrough";
const KEY_PUBLIC: &str = "public";
const KEY_SIGNING_SECRET: &str = "session_signing";

// =============================================================================
// Key Helpers
// =============================================================================

fn user_key(user: &User) -> String {
    format!("{}|{}", user.id_type, user.id)
}

// =============================================================================
// RedbStore
// =============================================================================

/// Store persisted in a single redb file shared by all replicas.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SETTINGS)?;
            let _ = write_txn.open_table(DOMAINS)?;
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(OAUTH2_PROVIDERS)?;
            let _ = write_txn.open_table(SECRETS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(
        &self,
        definition: TableDefinition<&str, &[u8]>,
        key: &str,
        value: &T,
    ) -> StoreResult<()> {
        let json = serde_json::to_vec(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(definition)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_json<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<&str, &[u8]>,
    ) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        let mut items = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }
}

impl ConfigStore for RedbStore {
    fn prefix(&self) -> StoreResult<Option<String>> {
        self.get_json(SETTINGS, KEY_PREFIX)
    }

    fn set_prefix(&self, prefix: &str) -> StoreResult<()> {
        self.put_json(SETTINGS, KEY_PREFIX, &prefix)
    }

    fn display_name(&self) -> StoreResult<Option<String>> {
        self.get_json(SETTINGS, KEY_DISPLAY_NAME)
    }

    fn set_display_name(&self, name: &str) -> StoreResult<()> {
        self.put_json(SETTINGS, KEY_DISPLAY_NAME, &name)
    }

    fn smtp_config(&self) -> StoreResult<Option<SmtpConfig>> {
        self.get_json(SETTINGS, KEY_SMTP)
    }

    fn set_smtp_config(&self, smtp: &SmtpConfig) -> StoreResult<()> {
        self.put_json(SETTINGS, KEY_SMTP, smtp)
    }

    fn forward_auth_passthrough(&self) -> StoreResult<bool> {
        Ok(self.get_json(SETTINGS, KEY_PASSTHROUGH)?.unwrap_or(false))
    }

    fn set_forward_auth_passthrough(&self, enabled: bool) -> StoreResult<()> {
        self.put_json(SETTINGS, KEY_PASSTHROUGH, &enabled)
    }

    fn set_public(&self, public: bool) -> StoreResult<()> {
        self.put_json(SETTINGS, KEY_PUBLIC, &public)
    }

    fn domain(&self, domain: &str) -> StoreResult<Option<Domain>> {
        self.get_json(DOMAINS, &normalize_domain(domain))
    }

    fn domains(&self) -> StoreResult<Vec<Domain>> {
        self.list_json(DOMAINS)
    }

    fn add_domain(&self, domain: &str, owner_id: &str) -> StoreResult<()> {
        let domain = normalize_domain(domain);
        let record = Domain {
            domain: domain.clone(),
            hashed_owner_id: hash_owner(owner_id),
        };
        let json = serde_json::to_vec(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOMAINS)?;
            let exists = table.get(domain.as_str())?.is_some();
            if !exists {
                table.insert(domain.as_str(), json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        self.list_json(USERS)
    }

    fn set_user(&self, user: &User) -> StoreResult<()> {
        self.put_json(USERS, &user_key(user), user)
    }

    fn oauth2_providers(&self) -> StoreResult<Vec<OAuth2Provider>> {
        self.list_json(OAUTH2_PROVIDERS)
    }

    fn set_oauth2_provider(&self, provider: &OAuth2Provider) -> StoreResult<()> {
        self.put_json(OAUTH2_PROVIDERS, &provider.id, provider)
    }

    fn signing_secret(&self) -> StoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SECRETS)?;
        Ok(table
            .get(KEY_SIGNING_SECRET)?
            .map(|value| value.value().to_vec()))
    }

    fn set_signing_secret(&self, secret: &[u8]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SECRETS)?;
            table.insert(KEY_SIGNING_SECRET, secret)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}
