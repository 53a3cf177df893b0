// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy host aliases that permanently redirect to a canonical host.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use axum::{
    http::{header::LOCATION, StatusCode, Uri},
    response::{IntoResponse, Response},
};

#[derive(Default)]
pub struct LegacyRedirects {
    aliases: RwLock<HashMap<String, String>>,
}

impl LegacyRedirects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirect every request for `from` to `to`. Re-adding an alias replaces it.
    pub fn add_redirect(&self, from: &str, to: &str) {
        self.aliases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(from.trim().to_ascii_lowercase(), to.trim().to_string());
    }

    /// Canonical host for `host`, if it is a legacy alias.
    pub fn canonical_host(&self, host: &str) -> Option<String> {
        self.aliases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for LegacyRedirects
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(aliases: I) -> Self {
        let redirects = Self::new();
        for (from, to) in aliases {
            redirects.add_redirect(from.as_ref(), to.as_ref());
        }
        redirects
    }
}

/// `308` to the same path and query on `canonical`.
pub fn redirect_to_canonical(canonical: &str, uri: &Uri) -> Response {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let location = format!("https://{canonical}{path_and_query}");
    (StatusCode::PERMANENT_REDIRECT, [(LOCATION, location)]).into_response()
}
