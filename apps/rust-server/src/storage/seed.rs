// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Configuration seeding.
//!
//! Copies operator configuration into the shared store at startup. Only the
//! cluster primary runs this, and a restarted primary runs it again, so
//! every write is idempotent: settings are overwritten with the same value,
//! domains keep their first owner, users and providers are keyed upserts.
//!
//! Settings that are absent (or at their default) are not written, leaving
//! whatever the store already holds.

use tracing::{info, warn};

use super::{ConfigStore, StoreResult, DEFAULT_DISPLAY_NAME, DEFAULT_PREFIX};
use crate::config::ServerConfig;
use crate::models::{User, ROOT_OWNER};

/// Apply `config` to `store`.
///
/// # Errors
/// Fails when the store cannot be read, or when SMTP settings, a user or an
/// OAuth2 provider cannot be written. Other writes are logged and skipped.
pub fn seed_store(store: &dyn ConfigStore, config: &ServerConfig) -> StoreResult<()> {
    if let Some(smtp) = &config.smtp {
        store.set_smtp_config(smtp)?;
    }

    let stored_prefix = store.prefix()?;
    if config.prefix != DEFAULT_PREFIX || stored_prefix.is_none() {
        if let Err(e) = store.set_prefix(&config.prefix) {
            warn!(error = %e, prefix = %config.prefix, "Failed to store prefix");
        }
    }

    if config.display_name != DEFAULT_DISPLAY_NAME {
        if let Err(e) = store.set_display_name(&config.display_name) {
            warn!(error = %e, "Failed to store display name");
        }
    }

    for domain in &config.domains {
        if let Err(e) = store.add_domain(domain, ROOT_OWNER) {
            warn!(error = %e, domain = %domain, "Failed to add domain");
        }
    }

    for user_id in &config.users {
        store.set_user(&User::email(user_id))?;
    }

    if config.forward_auth_passthrough {
        if let Err(e) = store.set_forward_auth_passthrough(true) {
            warn!(error = %e, "Failed to enable forward-auth passthrough");
        }
    }

    if config.public {
        if let Err(e) = store.set_public(true) {
            warn!(error = %e, "Failed to mark instance public");
        }
    }

    for provider in &config.oauth2_providers {
        store.set_oauth2_provider(provider)?;
    }

    info!(
        domains = config.domains.len(),
        users = config.users.len(),
        oauth2_providers = config.oauth2_providers.len(),
        "Seeded configuration store"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OAuth2Provider, SmtpConfig};
    use crate::storage::{InMemoryStore, RedbStore};

    fn full_config() -> ServerConfig {
        ServerConfig {
            prefix: "lastlogin_".into(),
            display_name: "LastLogin".into(),
            domains: vec!["lastlogin.net".into(), "example.com".into()],
            users: vec!["Admin@Example.com".into()],
            forward_auth_passthrough: true,
            public: true,
            oauth2_providers: vec![OAuth2Provider {
                id: "google".into(),
                name: "Google".into(),
                uri: "https://accounts.google.com".into(),
                client_id: "cid".into(),
                client_secret: "secret".into(),
                openid_connect: true,
                authorization_uri: None,
                token_uri: None,
                userinfo_uri: None,
                scope: None,
            }],
            smtp: Some(SmtpConfig {
                server: "smtp.example.com".into(),
                port: 587,
                ..SmtpConfig::default()
            }),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn seeding_twice_equals_seeding_once() {
        let config = full_config();

        let once = InMemoryStore::new();
        seed_store(&once, &config).unwrap();

        let twice = InMemoryStore::new();
        seed_store(&twice, &config).unwrap();
        seed_store(&twice, &config).unwrap();

        assert_eq!(once.snapshot().unwrap(), twice.snapshot().unwrap());
    }

    #[test]
    fn seeding_twice_is_idempotent_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("db.redb")).unwrap();
        let config = full_config();

        seed_store(&store, &config).unwrap();
        let domains = store.domains().unwrap();
        let users = store.users().unwrap();
        let providers = store.oauth2_providers().unwrap();

        seed_store(&store, &config).unwrap();
        assert_eq!(store.domains().unwrap(), domains);
        assert_eq!(store.users().unwrap(), users);
        assert_eq!(store.oauth2_providers().unwrap(), providers);
        assert_eq!(store.prefix().unwrap().as_deref(), Some("lastlogin_"));
    }

    #[test]
    fn seeding_writes_configured_values() {
        let store = InMemoryStore::new();
        seed_store(&store, &full_config()).unwrap();
        let snapshot = store.snapshot().unwrap();

        assert_eq!(snapshot.prefix.as_deref(), Some("lastlogin_"));
        assert_eq!(snapshot.display_name.as_deref(), Some("LastLogin"));
        assert!(snapshot.forward_auth_passthrough);
        assert!(snapshot.public);
        assert!(snapshot.domains["example.com"].is_root_owned());
        assert!(snapshot
            .users
            .contains_key(&("email".to_string(), "admin@example.com".to_string())));
        assert!(snapshot.oauth2_providers.contains_key("google"));
        assert_eq!(snapshot.smtp.map(|s| s.port), Some(587));
    }

    #[test]
    fn defaults_leave_existing_state_untouched() {
        let store = InMemoryStore::new();
        store.set_prefix("custom_").unwrap();
        store.set_display_name("Custom").unwrap();
        store.set_forward_auth_passthrough(true).unwrap();

        seed_store(&store, &ServerConfig::default()).unwrap();

        assert_eq!(store.prefix().unwrap().as_deref(), Some("custom_"));
        assert_eq!(store.display_name().unwrap().as_deref(), Some("Custom"));
        assert!(store.forward_auth_passthrough().unwrap());
    }

    #[test]
    fn default_prefix_is_written_to_empty_store() {
        let store = InMemoryStore::new();
        seed_store(&store, &ServerConfig::default()).unwrap();
        assert_eq!(store.prefix().unwrap().as_deref(), Some(DEFAULT_PREFIX));
    }
}
