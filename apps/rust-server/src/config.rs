// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once at startup: an optional JSON file supplies
//! list-valued settings (domains, users, OAuth2 providers, SMTP, redirect
//! aliases) and environment variables override scalar settings. Every
//! setting is optional; absent settings leave prior store state untouched.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OBLIGATOR_CONFIG` | Path to a JSON config file | unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `1616` |
//! | `OBLIGATOR_PREFIX` | Route and cookie prefix | `obligator_` |
//! | `OBLIGATOR_DB_PREFIX` | Database file name prefix | empty |
//! | `DATABASE_DIR` | Directory holding the database file | `.` |
//! | `DISPLAY_NAME` | Name shown on self-service pages | `obligator` |
//! | `BEHIND_PROXY` | Trust `X-Forwarded-For` for client IPs | `false` |
//! | `DOMAINS` | Comma-separated operator-owned domains | empty |
//! | `USERS` | Comma-separated bootstrap user emails | empty |
//! | `FORWARD_AUTH_PASSTHROUGH` | Fail open on forward-auth failures | `false` |
//! | `PUBLIC` | Allow anyone to create an account | `false` |
//! | `PROXY_TYPE` | Reverse-proxy provisioning backend | `builtin` |
//! | `DISABLE_QR_LOGIN` | Do not mount the QR handoff routes | `false` |
//! | `STATIC_DIR` | Files served for operator-owned landing pages | `static` |
//! | `LOGO_SVG_PATH` | Custom logo served at `/logo.svg` | unset |
//! | `CLUSTER_MOUNT_DIR` | LiteFS-style mount used to detect the primary | unset |
//! | `CLUSTER_ROLE` | Force `primary` or `replica` | unset |
//! | `VALIDATE_TIMEOUT_SECS` | Bound on session validation per request | `5` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cluster::ClusterRole;
use crate::models::{OAuth2Provider, SmtpConfig};
use crate::storage::{DEFAULT_DISPLAY_NAME, DEFAULT_PREFIX};

pub const CONFIG_PATH_ENV: &str = "OBLIGATOR_CONFIG";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PREFIX_ENV: &str = "OBLIGATOR_PREFIX";
pub const DB_PREFIX_ENV: &str = "OBLIGATOR_DB_PREFIX";
pub const DATABASE_DIR_ENV: &str = "DATABASE_DIR";
pub const DISPLAY_NAME_ENV: &str = "DISPLAY_NAME";
pub const BEHIND_PROXY_ENV: &str = "BEHIND_PROXY";
pub const DOMAINS_ENV: &str = "DOMAINS";
pub const USERS_ENV: &str = "USERS";
pub const FORWARD_AUTH_PASSTHROUGH_ENV: &str = "FORWARD_AUTH_PASSTHROUGH";
pub const PUBLIC_ENV: &str = "PUBLIC";
pub const PROXY_TYPE_ENV: &str = "PROXY_TYPE";
pub const DISABLE_QR_LOGIN_ENV: &str = "DISABLE_QR_LOGIN";
pub const STATIC_DIR_ENV: &str = "STATIC_DIR";
pub const LOGO_SVG_PATH_ENV: &str = "LOGO_SVG_PATH";
pub const CLUSTER_MOUNT_DIR_ENV: &str = "CLUSTER_MOUNT_DIR";
pub const CLUSTER_ROLE_ENV: &str = "CLUSTER_ROLE";
pub const VALIDATE_TIMEOUT_ENV: &str = "VALIDATE_TIMEOUT_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Logging format selector (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PORT: u16 = 1616;
pub const DEFAULT_PROXY_TYPE: &str = "builtin";
pub const DEFAULT_VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Everything the gateway needs to assemble itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub prefix: String,
    pub db_prefix: String,
    pub database_dir: PathBuf,
    pub display_name: String,
    pub behind_proxy: bool,
    pub domains: Vec<String>,
    pub users: Vec<String>,
    pub forward_auth_passthrough: bool,
    pub public: bool,
    pub proxy_type: String,
    pub disable_qr_login: bool,
    pub static_dir: PathBuf,
    pub logo_svg_path: Option<PathBuf>,
    pub oauth2_providers: Vec<OAuth2Provider>,
    pub smtp: Option<SmtpConfig>,
    /// Legacy host → canonical host. Requests to a legacy host get a 308.
    pub legacy_redirects: BTreeMap<String, String>,
    pub cluster_mount_dir: Option<PathBuf>,
    pub cluster_role: Option<ClusterRole>,
    pub validate_timeout_secs: u64,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            prefix: DEFAULT_PREFIX.to_string(),
            db_prefix: String::new(),
            database_dir: PathBuf::from(crate::storage::paths::DATA_ROOT),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            behind_proxy: false,
            domains: Vec::new(),
            users: Vec::new(),
            forward_auth_passthrough: false,
            public: false,
            proxy_type: DEFAULT_PROXY_TYPE.to_string(),
            disable_qr_login: false,
            static_dir: PathBuf::from("static"),
            logo_svg_path: None,
            oauth2_providers: Vec::new(),
            smtp: None,
            legacy_redirects: default_legacy_redirects(),
            cluster_mount_dir: None,
            cluster_role: None,
            validate_timeout_secs: DEFAULT_VALIDATE_TIMEOUT.as_secs(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

/// The LastLogin deployment moved from `.io` to `.net`.
pub fn default_legacy_redirects() -> BTreeMap<String, String> {
    BTreeMap::from([("lastlogin.io".to_string(), "lastlogin.net".to_string())])
}

impl ServerConfig {
    /// Load from `OBLIGATOR_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        if config.validate_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: VALIDATE_TIMEOUT_ENV,
                value: "0".to_string(),
            });
        }
        Ok(config)
    }

    /// Parse a JSON config file. Redirect aliases from the file are added
    /// to the default table, overriding entries with the same legacy host.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut redirects = default_legacy_redirects();
        redirects.extend(std::mem::take(&mut config.legacy_redirects));
        config.legacy_redirects = redirects;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = parse_value(PORT_ENV, &port)?;
        }
        if let Some(prefix) = lookup(PREFIX_ENV) {
            self.prefix = prefix;
        }
        if let Some(db_prefix) = lookup(DB_PREFIX_ENV) {
            self.db_prefix = db_prefix;
        }
        if let Some(dir) = lookup(DATABASE_DIR_ENV) {
            self.database_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup(DISPLAY_NAME_ENV) {
            self.display_name = name;
        }
        if let Some(flag) = lookup(BEHIND_PROXY_ENV) {
            self.behind_proxy = parse_bool(BEHIND_PROXY_ENV, &flag)?;
        }
        if let Some(domains) = lookup(DOMAINS_ENV) {
            self.domains.extend(split_list(&domains));
        }
        if let Some(users) = lookup(USERS_ENV) {
            self.users.extend(split_list(&users));
        }
        if let Some(flag) = lookup(FORWARD_AUTH_PASSTHROUGH_ENV) {
            self.forward_auth_passthrough = parse_bool(FORWARD_AUTH_PASSTHROUGH_ENV, &flag)?;
        }
        if let Some(flag) = lookup(PUBLIC_ENV) {
            self.public = parse_bool(PUBLIC_ENV, &flag)?;
        }
        if let Some(proxy_type) = lookup(PROXY_TYPE_ENV) {
            self.proxy_type = proxy_type;
        }
        if let Some(flag) = lookup(DISABLE_QR_LOGIN_ENV) {
            self.disable_qr_login = parse_bool(DISABLE_QR_LOGIN_ENV, &flag)?;
        }
        if let Some(dir) = lookup(STATIC_DIR_ENV) {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(LOGO_SVG_PATH_ENV) {
            self.logo_svg_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(CLUSTER_MOUNT_DIR_ENV) {
            self.cluster_mount_dir = Some(PathBuf::from(dir));
        }
        if let Some(role) = lookup(CLUSTER_ROLE_ENV) {
            self.cluster_role = Some(match role.to_lowercase().as_str() {
                "primary" => ClusterRole::Primary,
                "replica" => ClusterRole::Replica,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: CLUSTER_ROLE_ENV,
                        value: role,
                    })
                }
            });
        }
        if let Some(secs) = lookup(VALIDATE_TIMEOUT_ENV) {
            self.validate_timeout_secs = parse_value(VALIDATE_TIMEOUT_ENV, &secs)?;
        }
        if let Some(path) = lookup(TLS_CERT_PATH_ENV) {
            self.tls_cert_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(TLS_KEY_PATH_ENV) {
            self.tls_key_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_secs)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_value<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
