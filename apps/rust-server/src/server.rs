// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway Assembly
//!
//! Startup sequence:
//!
//! 1. Open the store (or take the injected one)
//! 2. Decide the cluster role
//! 3. Primary only: seed the store from configuration
//! 4. Provision reverse-proxy routes for every owned domain (best-effort)
//! 5. Load or create the session signing keys
//! 6. Build the self-service table and the tenancy router
//!
//! After assembly, tenants are added with [`Gateway::register_tenant`] at any
//! time, including while serving.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Bytes, http::HeaderMap, http::HeaderName, Router};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::api::{self, ProtocolHandlers};
use crate::auth::{AuthError, JwtSessionKeys, SessionKeyError, SessionTokens, SessionValidator};
use crate::cluster::{ClusterAuthority, ClusterMembership, ClusterRole};
use crate::config::ServerConfig;
use crate::models::Validation;
use crate::provision::{provisioner_for, ProvisionError, RouteProvisioner};
use crate::router::{GatewayError, LegacyRedirects, RequestHandler, TenancyRouter};
use crate::state::AppState;
use crate::storage::{seed_store, ConfigStore, RedbStore, StoragePaths, StoreError};

/// Grace period for in-flight requests after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open store: {0}")]
    Store(#[source] StoreError),

    #[error("failed to seed store: {0}")]
    Seed(#[source] StoreError),

    #[error("session signing keys unavailable: {0}")]
    SigningKey(#[from] SessionKeyError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("failed to read logo {path}: {source}")]
    Logo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,

    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),

    #[error("invalid bind address {0}")]
    InvalidAddress(String),

    #[error("server on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Implementations the embedding host may supply instead of the defaults.
#[derive(Default)]
pub struct Collaborators {
    /// Defaults to the redb database under `database_dir`.
    pub store: Option<Arc<dyn ConfigStore>>,
    /// Defaults to the source selected by the cluster configuration.
    pub membership: Option<Box<dyn ClusterMembership>>,
    /// Defaults to HS256 keys from the store's signing secret.
    pub tokens: Option<Arc<dyn SessionTokens>>,
    /// Defaults to the provisioner for `proxy_type`.
    pub provisioner: Option<Arc<dyn RouteProvisioner>>,
    pub protocols: ProtocolHandlers,
}

/// The assembled identity provider and forward-auth gateway.
pub struct Gateway {
    config: ServerConfig,
    cluster: ClusterAuthority,
    store: Arc<dyn ConfigStore>,
    validator: SessionValidator,
    tenancy: TenancyRouter,
}

impl Gateway {
    pub async fn assemble(config: ServerConfig, collaborators: Collaborators) -> Result<Self, StartupError> {
        let store: Arc<dyn ConfigStore> = match collaborators.store {
            Some(store) => store,
            None => {
                let path = StoragePaths::new(&config.database_dir).database(&config.db_prefix);
                info!(path = %path.display(), "Opening database");
                Arc::new(RedbStore::open(&path).map_err(StartupError::Store)?)
            }
        };

        let cluster = match &collaborators.membership {
            Some(membership) => ClusterAuthority::detect(membership.as_ref()),
            None => ClusterAuthority::from_config(&config),
        };

        if cluster.is_primary() {
            seed_store(store.as_ref(), &config).map_err(StartupError::Seed)?;
        } else {
            info!("Replica: skipping configuration seeding");
        }

        let provisioner = match collaborators.provisioner {
            Some(provisioner) => provisioner,
            None => provisioner_for(&config.proxy_type)?,
        };
        provision_domains(store.as_ref(), provisioner.as_ref()).await;

        let tokens: Arc<dyn SessionTokens> = match collaborators.tokens {
            Some(tokens) => tokens,
            None => JwtSessionKeys::load_or_create(store.as_ref(), &cluster)?,
        };
        let validator = SessionValidator::new(store.clone(), tokens, config.validate_timeout());

        let logo_svg = match &config.logo_svg_path {
            Some(path) => Some(Bytes::from(std::fs::read(path).map_err(|source| {
                StartupError::Logo {
                    path: path.clone(),
                    source,
                }
            })?)),
            None => None,
        };

        let state = AppState::new(store.clone(), validator.clone(), cluster.role())
            .with_behind_proxy(config.behind_proxy)
            .with_logo_svg(logo_svg)
            .with_static_dir(config.static_dir.clone());
        let self_service = api::router(state, collaborators.protocols, config.disable_qr_login);

        let redirects: LegacyRedirects = config.legacy_redirects.iter().collect();
        let tenancy = TenancyRouter::new(
            validator.clone(),
            self_service,
            redirects,
            config.behind_proxy,
        );

        Ok(Self {
            config,
            cluster,
            store,
            validator,
            tenancy,
        })
    }

    pub fn cluster_role(&self) -> ClusterRole {
        self.cluster.role()
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Put `domain` behind forward-auth, served by `handler`.
    pub fn register_tenant(&self, domain: &str, handler: RequestHandler) -> Result<(), GatewayError> {
        self.tenancy.register_tenant(domain, handler)
    }

    /// Permanently redirect `from` to `to`.
    pub fn add_redirect(&self, from: &str, to: &str) {
        self.tenancy.add_redirect(from, to);
    }

    /// Session identity for a request carrying `headers`.
    pub async fn validate(&self, headers: &HeaderMap) -> Result<Option<Validation>, AuthError> {
        self.validator.validate(headers).await
    }

    /// The complete HTTP application.
    pub fn router(&self) -> Router {
        let x_request_id = HeaderName::from_static("x-request-id");
        self.tenancy
            .clone()
            .into_router()
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// Serve until `shutdown` is cancelled. HTTPS when TLS material is configured.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), StartupError> {
        let bind = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = bind.parse().map_err(|_| StartupError::InvalidAddress(bind))?;

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let handle: Handle<SocketAddr> = Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            info!("Shutdown requested, draining connections");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        let served = match (&self.config.tls_cert_path, &self.config.tls_key_path) {
            (Some(cert), Some(key)) => {
                let tls = RustlsConfig::from_pem_file(cert, key)
                    .await
                    .map_err(StartupError::Tls)?;
                info!(%addr, role = %self.cluster.role(), "Obligator listening on https");
                axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await
            }
            (None, None) => {
                info!(%addr, role = %self.cluster.role(), "Obligator listening on http");
                axum_server::bind(addr).handle(handle).serve(app).await
            }
            _ => return Err(StartupError::IncompleteTls),
        };

        served.map_err(|source| StartupError::Serve { addr, source })
    }
}

async fn provision_domains(store: &dyn ConfigStore, provisioner: &dyn RouteProvisioner) {
    let domains = match store.domains() {
        Ok(domains) => domains,
        Err(e) => {
            warn!(error = %e, "Failed to load domains for provisioning");
            return;
        }
    };

    if domains.is_empty() {
        warn!("No domains configured; add one with DOMAINS or the domains page");
    }

    for domain in &domains {
        if let Err(e) = provisioner.add_domain(&domain.domain).await {
            warn!(domain = %domain.domain, error = %e, "Failed to provision domain route");
        }
    }
}
