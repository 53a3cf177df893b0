// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Host-Based Tenancy Router
//!
//! Every request is classified by its target host, in this order:
//!
//! 1. **Legacy alias** - `308` to the canonical host, path and query kept.
//! 2. **Tenant** - forward-auth: the session is validated and the verified
//!    identity is written into `Remote-Id-Type` / `Remote-Id` before the
//!    tenant handler runs. Without a session (and without passthrough) the
//!    request is answered `401` and never reaches the tenant.
//! 3. **Self-service** - the identity provider's own pages and protocol
//!    endpoints, with security headers and the cross-site detector cookie.
//!
//! Host lookups try the exact `Host` value first, then the host with its
//! port stripped.

pub mod handler;
pub mod redirect;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::{Request, State},
    http::{
        header::{CONTENT_SECURITY_POLICY, REFERRER_POLICY, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue,
    },
    response::{IntoResponse, Response},
    Router,
};
use tower::ServiceExt;
use tracing::{debug, info};

pub use handler::{into_handler, not_implemented, RequestHandler};
pub use redirect::LegacyRedirects;

use crate::auth::{cookie::cross_site_detector_cookie, AuthError, SessionValidator};
use crate::host::{client_ip, request_host, strip_port};
use crate::models::Validation;

pub const REMOTE_ID_TYPE: HeaderName = HeaderName::from_static("remote-id-type");
pub const REMOTE_ID: HeaderName = HeaderName::from_static("remote-id");

/// Log target for self-service access events.
pub const ACCESS_LOG_TARGET: &str = "obligator::access";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("tenant domain must not be empty")]
    EmptyDomain,
}

/// Dispatches requests to legacy redirects, tenants or the self-service table.
///
/// Cheap to clone; clones share the same registries.
#[derive(Clone)]
pub struct TenancyRouter {
    inner: Arc<Inner>,
}

struct Inner {
    tenants: RwLock<HashMap<String, RequestHandler>>,
    redirects: LegacyRedirects,
    validator: SessionValidator,
    self_service: Router,
    behind_proxy: bool,
}

impl TenancyRouter {
    pub fn new(
        validator: SessionValidator,
        self_service: Router,
        redirects: LegacyRedirects,
        behind_proxy: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tenants: RwLock::new(HashMap::new()),
                redirects,
                validator,
                self_service,
                behind_proxy,
            }),
        }
    }

    /// Route requests for `domain` through forward-auth to `handler`.
    ///
    /// Registering a domain again replaces its handler. There is no removal.
    pub fn register_tenant(&self, domain: &str, handler: RequestHandler) -> Result<(), GatewayError> {
        let domain = domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(GatewayError::EmptyDomain);
        }

        self.inner
            .tenants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(domain.clone(), handler);
        info!(domain = %domain, "Registered tenant");
        Ok(())
    }

    pub fn add_redirect(&self, from: &str, to: &str) {
        self.inner.redirects.add_redirect(from, to);
    }

    /// Outer axum router with this dispatcher as its only handler.
    pub fn into_router(self) -> Router {
        Router::new().fallback(dispatch).with_state(self)
    }

    fn tenant(&self, host: &str) -> Option<RequestHandler> {
        let tenants = self.inner.tenants.read().unwrap_or_else(PoisonError::into_inner);
        tenants
            .get(host)
            .or_else(|| tenants.get(strip_port(host)))
            .cloned()
    }

    fn canonical_host(&self, host: &str) -> Option<String> {
        self.inner
            .redirects
            .canonical_host(host)
            .or_else(|| self.inner.redirects.canonical_host(strip_port(host)))
    }

    async fn forward_auth(&self, handler: RequestHandler, mut request: Request) -> Response {
        let validation = match self.inner.validator.validate(request.headers()).await {
            Ok(validation) => validation,
            Err(e) => return e.into_response(),
        };

        if let Err(e) = set_identity_headers(request.headers_mut(), validation.as_ref()) {
            return e.into_response();
        }

        match handler.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    async fn self_service(&self, host: &str, request: Request) -> Response {
        let ip = client_ip(&request, self.inner.behind_proxy);
        info!(
            target: ACCESS_LOG_TARGET,
            timestamp = %chrono::Utc::now().to_rfc3339(),
            client_ip = ip.as_deref().unwrap_or("-"),
            method = %request.method(),
            host = %host,
            path = %request.uri().path(),
            "access"
        );

        let mut response = match self.inner.self_service.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let headers = response.headers_mut();
        headers.insert(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("frame-ancestors 'none'"),
        );
        headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
        match HeaderValue::from_str(&cross_site_detector_cookie(host)) {
            Ok(cookie) => {
                headers.append(SET_COOKIE, cookie);
            }
            Err(_) => debug!(host = %host, "Host not usable in a cookie domain"),
        }
        response
    }
}

/// Overwrite the identity headers, discarding any client-supplied copies.
/// Anonymous requests get both headers with empty values.
fn set_identity_headers(headers: &mut HeaderMap, validation: Option<&Validation>) -> Result<(), AuthError> {
    let (id_type, id) = validation
        .map(|v| (v.id_type.as_str(), v.id.as_str()))
        .unwrap_or(("", ""));

    let id_type = HeaderValue::from_bytes(id_type.as_bytes())
        .map_err(|_| AuthError::MalformedIdentities("id_type is not a valid header value".into()))?;
    let id = HeaderValue::from_bytes(id.as_bytes())
        .map_err(|_| AuthError::MalformedIdentities("id is not a valid header value".into()))?;

    headers.insert(REMOTE_ID_TYPE, id_type);
    headers.insert(REMOTE_ID, id);
    Ok(())
}

async fn dispatch(State(router): State<TenancyRouter>, request: Request) -> Response {
    let host = request_host(&request).unwrap_or_default();

    if let Some(canonical) = router.canonical_host(&host) {
        return redirect::redirect_to_canonical(&canonical, request.uri());
    }

    if let Some(handler) = router.tenant(&host) {
        return router.forward_auth(handler, request).await;
    }

    router.self_service(&host, request).await
}
