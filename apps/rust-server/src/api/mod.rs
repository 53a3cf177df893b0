// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Self-service route table: the identity provider's own pages plus the
//! login protocol endpoints.

use axum::{routing::get, Router};

use crate::router::{not_implemented, RequestHandler};
use crate::state::AppState;

pub mod health;
pub mod landing;

/// Login protocol endpoints supplied by the embedding host.
///
/// Each is an opaque handler mounted on the paths of its protocol. Absent
/// handlers answer `501 Not Implemented`.
#[derive(Clone, Default)]
pub struct ProtocolHandlers {
    /// OpenID Connect provider: discovery, JWKS, registration, userinfo,
    /// authorization, consent, token and end-session.
    pub oidc: Option<RequestHandler>,
    /// Login chooser (`/login`, `/login-fedcm-auto`) and the no-account page.
    pub login: Option<RequestHandler>,
    /// Adding an identity via an upstream OAuth2 provider.
    pub oauth2: Option<RequestHandler>,
    /// Email magic-link login.
    pub email: Option<RequestHandler>,
    /// IndieAuth authorization server.
    pub indieauth: Option<RequestHandler>,
    /// Domain claiming.
    pub domains: Option<RequestHandler>,
    /// FedCM identity provider.
    pub fedcm: Option<RequestHandler>,
    /// Adding an identity via another FedCM provider.
    pub add_identity_fedcm: Option<RequestHandler>,
    /// Adding an identity via GAML.
    pub gaml: Option<RequestHandler>,
    /// Cross-device QR login handoff.
    pub qr: Option<RequestHandler>,
}

const OIDC_PATHS: &[&str] = &[
    "/.well-known/openid-configuration",
    "/jwks",
    "/register",
    "/userinfo",
    "/auth",
    "/approve",
    "/token",
    "/end-session",
];
const LOGIN_PATHS: &[&str] = &["/login", "/login-fedcm-auto", "/no-account"];
const OAUTH2_PATHS: &[&str] = &["/login-oauth2", "/callback"];
const EMAIL_PATHS: &[&str] = &[
    "/login-email",
    "/email-sent",
    "/magic",
    "/confirm-magic",
    "/complete-email-login",
];
const GAML_PATHS: &[&str] = &["/login-gaml", "/gaml-code", "/complete-gaml-login"];
const DOMAIN_PATHS: &[&str] = &["/domains", "/add-domain"];
const ADD_IDENTITY_FEDCM_PATHS: &[&str] = &["/login-fedcm", "/complete-login-fedcm"];
const QR_PATHS: &[&str] = &["/login-qr", "/qr", "/send", "/receive"];

fn mount(router: Router<AppState>, paths: &[&str], handler: &RequestHandler) -> Router<AppState> {
    paths
        .iter()
        .fold(router, |router, path| router.route_service(path, handler.clone()))
}

fn or_placeholder(handler: Option<RequestHandler>) -> RequestHandler {
    handler.unwrap_or_else(not_implemented)
}

pub fn router(state: AppState, protocols: ProtocolHandlers, disable_qr_login: bool) -> Router {
    let mut routes = Router::new()
        .route("/", get(landing::landing))
        .route("/u/{*rest}", get(landing::user_profile))
        .route("/logo.svg", get(landing::logo))
        .route("/ip", get(landing::client_address))
        .route("/validate", get(landing::validate))
        .route("/logout", get(landing::logout).post(landing::logout))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    routes = mount(routes, OIDC_PATHS, &or_placeholder(protocols.oidc));
    routes = mount(routes, LOGIN_PATHS, &or_placeholder(protocols.login));
    routes = mount(routes, OAUTH2_PATHS, &or_placeholder(protocols.oauth2));
    routes = mount(routes, EMAIL_PATHS, &or_placeholder(protocols.email));
    routes = mount(routes, GAML_PATHS, &or_placeholder(protocols.gaml));

    let indieauth = or_placeholder(protocols.indieauth);
    routes = mount(
        routes,
        &["/users/{*rest}", "/.well-known/oauth-authorization-server"],
        &indieauth,
    )
    .nest_service("/indieauth", indieauth);

    routes = mount(routes, DOMAIN_PATHS, &or_placeholder(protocols.domains));

    let fedcm = or_placeholder(protocols.fedcm);
    routes = mount(routes, &["/.well-known/web-identity"], &fedcm).nest_service("/fedcm", fedcm);
    routes = mount(
        routes,
        ADD_IDENTITY_FEDCM_PATHS,
        &or_placeholder(protocols.add_identity_fedcm),
    );

    if !disable_qr_login {
        routes = mount(routes, QR_PATHS, &or_placeholder(protocols.qr));
    }

    // Everything else is a static asset of the landing site.
    routes.fallback(landing::landing).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::into_handler;
    use crate::state::test_state;
    use axum::{
        body::{to_bytes, Body},
        extract::Request,
        http::{StatusCode, Uri},
    };
    use tower::ServiceExt;

    fn get_request(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header("Host", "auth.example.com")
            .body(Body::empty())
            .unwrap()
    }

    /// Handler that answers with the path it received.
    fn path_echo() -> RequestHandler {
        into_handler(Router::new().fallback(|uri: Uri| async move { uri.path().to_string() }))
    }

    #[tokio::test]
    async fn missing_protocol_handlers_answer_501() {
        let (state, _) = test_state();
        let app = router(state, ProtocolHandlers::default(), false);

        for path in [
            "/token",
            "/login",
            "/login-fedcm-auto",
            "/no-account",
            "/login-email",
            "/login-gaml",
            "/gaml-code",
            "/complete-gaml-login",
            "/domains",
            "/qr",
            "/fedcm/accounts",
        ] {
            let response = app.clone().oneshot(get_request(path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED, "{path}");
        }
    }

    #[tokio::test]
    async fn prefixed_protocols_see_stripped_paths() {
        let (state, _) = test_state();
        let protocols = ProtocolHandlers {
            indieauth: Some(path_echo()),
            fedcm: Some(path_echo()),
            ..Default::default()
        };
        let app = router(state, protocols, false);

        let response = app.clone().oneshot(get_request("/indieauth/token")).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"/token");

        let response = app.clone().oneshot(get_request("/fedcm/accounts")).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"/accounts");

        let response = app.oneshot(get_request("/users/alice")).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"/users/alice");
    }

    #[tokio::test]
    async fn login_handler_serves_every_login_page() {
        let (state, _) = test_state();
        let protocols = ProtocolHandlers {
            login: Some(path_echo()),
            ..Default::default()
        };
        let app = router(state, protocols, false);

        for path in ["/login", "/login-fedcm-auto", "/no-account"] {
            let response = app.clone().oneshot(get_request(path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], path.as_bytes());
        }
    }

    #[tokio::test]
    async fn qr_routes_can_be_disabled() {
        let (state, _) = test_state();
        let app = router(state, ProtocolHandlers::default(), true);

        let response = app.oneshot(get_request("/qr")).await.unwrap();
        assert_ne!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn health_is_mounted() {
        let (state, _) = test_state();
        let app = router(state, ProtocolHandlers::default(), false);

        let response = app.oneshot(get_request("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
