// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;

use crate::auth::SessionValidator;
use crate::cluster::ClusterRole;
use crate::storage::ConfigStore;

/// Shared state of the self-service handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConfigStore>,
    pub validator: SessionValidator,
    pub cluster_role: ClusterRole,
    /// Trust `X-Forwarded-For` / `X-Real-IP` for client addresses.
    pub behind_proxy: bool,
    /// Operator-supplied logo, served instead of the static one.
    pub logo_svg: Option<Bytes>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<dyn ConfigStore>, validator: SessionValidator, cluster_role: ClusterRole) -> Self {
        Self {
            store,
            validator,
            cluster_role,
            behind_proxy: false,
            logo_svg: None,
            static_dir: PathBuf::from("static"),
        }
    }

    pub fn with_behind_proxy(mut self, behind_proxy: bool) -> Self {
        self.behind_proxy = behind_proxy;
        self
    }

    pub fn with_logo_svg(mut self, logo_svg: Option<Bytes>) -> Self {
        self.logo_svg = logo_svg;
        self
    }

    pub fn with_static_dir(mut self, static_dir: PathBuf) -> Self {
        self.static_dir = static_dir;
        self
    }
}

/// In-memory primary state and the keys its validator trusts.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, Arc<crate::auth::JwtSessionKeys>) {
    use crate::auth::JwtSessionKeys;
    use crate::storage::InMemoryStore;

    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryStore::new());
    let keys = Arc::new(JwtSessionKeys::from_secret(b"state-test-secret-0123456789abcd"));
    let validator = SessionValidator::new(
        store.clone(),
        keys.clone(),
        std::time::Duration::from_secs(5),
    );
    (AppState::new(store, validator, ClusterRole::Primary), keys)
}
