// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Landing, profile and session endpoints of the self-service table.

use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, LINK, LOCATION, SET_COOKIE},
        HeaderMap, HeaderName, HeaderValue, StatusCode, Uri,
    },
    response::{Html, IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info};

use crate::auth::{cookie::expired_cookie, AuthError, Validated};
use crate::error::ApiError;
use crate::host::{client_ip, domain_to_uri, request_host, strip_port};
use crate::router::{REMOTE_ID, REMOTE_ID_TYPE};
use crate::state::AppState;
use crate::storage::DEFAULT_DISPLAY_NAME;

const SET_LOGIN: HeaderName = HeaderName::from_static("set-login");

fn query_params(uri: &Uri) -> HashMap<String, String> {
    uri.query()
        .map(|query| url::form_urlencoded::parse(query.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

async fn serve_static(state: &AppState, request: Request) -> Response {
    match ServeDir::new(&state.static_dir).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Landing page of a domain.
///
/// Operator-owned and unknown domains get the static site. A domain claimed
/// by a user is that user's IndieAuth identity URL.
pub async fn landing(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let host = request_host(&request).unwrap_or_default();

    let domain = match state.store.domain(&host)? {
        Some(domain) => Some(domain),
        None => state.store.domain(strip_port(&host))?,
    };

    match domain {
        Some(domain) if !domain.is_root_owned() => identity_page(&state, &host),
        _ => Ok(serve_static(&state, request).await),
    }
}

/// IndieAuth user profile page (`/u/...`).
pub async fn user_profile(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let host = request_host(&request).unwrap_or_default();
    identity_page(&state, &host)
}

/// Identity-claim page advertising this server's IndieAuth metadata.
fn identity_page(state: &AppState, host: &str) -> Result<Response, ApiError> {
    let metadata = format!("{}/.well-known/oauth-authorization-server", domain_to_uri(host));
    let link = HeaderValue::from_str(&format!("<{metadata}>; rel=\"indieauth-metadata\""))
        .map_err(|_| ApiError::bad_request("Invalid host"))?;

    let display_name = state
        .store
        .display_name()?
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

    let page = format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{host}</title>\
         <link rel=\"indieauth-metadata\" href=\"{metadata}\"></head>\n\
         <body><h1>{host}</h1><p>This domain is an identity managed by {name}.</p></body>\n</html>\n",
        host = escape_html(host),
        metadata = escape_html(&metadata),
        name = escape_html(&display_name),
    );

    Ok(([(LINK, link)], Html(page)).into_response())
}

pub async fn logo(State(state): State<AppState>, request: Request) -> Response {
    match &state.logo_svg {
        Some(svg) => (
            [
                (CONTENT_TYPE, HeaderValue::from_static("image/svg+xml")),
                (CACHE_CONTROL, HeaderValue::from_static("max-age=86400")),
            ],
            svg.clone(),
        )
            .into_response(),
        None => serve_static(&state, request).await,
    }
}

/// Client address as seen by the server.
pub async fn client_address(State(state): State<AppState>, request: Request) -> String {
    client_ip(&request, state.behind_proxy).unwrap_or_else(|| "-".to_string())
}

/// Forward-auth check for external reverse proxies.
///
/// `200` with the identity headers, or `307` into the authorization flow of
/// `auth_server` with `redirect_uri` as the client.
pub async fn validate(
    uri: Uri,
    validated: Result<Validated, AuthError>,
) -> Result<Response, ApiError> {
    let validation = match validated {
        Ok(Validated(validation)) => validation,
        Err(e) => {
            debug!(error_code = e.error_code(), error = %e, "Validation failed, redirecting to login");
            let params = query_params(&uri);
            let auth_server = params.get("auth_server").map(String::as_str).unwrap_or("");
            let redirect_uri = params.get("redirect_uri").map(String::as_str).unwrap_or("");
            let location = format!(
                "{}/auth?client_id={redirect_uri}&redirect_uri={redirect_uri}&response_type=code&state=&scope=",
                domain_to_uri(auth_server)
            );
            let location = HeaderValue::from_str(&location)
                .map_err(|_| ApiError::bad_request("Invalid redirect_uri"))?;
            return Ok((StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response());
        }
    };

    let (id_type, id) = validation
        .as_ref()
        .map(|v| (v.id_type.as_str(), v.id.as_str()))
        .unwrap_or(("", ""));
    let mut headers = HeaderMap::new();
    headers.insert(
        REMOTE_ID_TYPE,
        HeaderValue::from_bytes(id_type.as_bytes()).map_err(ApiError::internal)?,
    );
    headers.insert(
        REMOTE_ID,
        HeaderValue::from_bytes(id.as_bytes()).map_err(ApiError::internal)?,
    );
    Ok((StatusCode::OK, headers).into_response())
}

/// Expire the login cookie and return to `prev_page`.
pub async fn logout(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let host = request_host(&request).unwrap_or_default();
    let cookie_name = state.store.login_cookie_name()?;
    let prev_page = query_params(request.uri())
        .remove("prev_page")
        .filter(|page| !page.is_empty())
        .unwrap_or_else(|| "/".to_string());

    let cookie = HeaderValue::from_str(&expired_cookie(&cookie_name, &host))
        .map_err(|_| ApiError::bad_request("Invalid host"))?;
    let location =
        HeaderValue::from_str(&prev_page).map_err(|_| ApiError::bad_request("Invalid prev_page"))?;

    info!(host = %host, "Logged out");
    Ok((
        StatusCode::SEE_OTHER,
        [
            (SET_COOKIE, cookie),
            (SET_LOGIN, HeaderValue::from_static("logged-out")),
            (LOCATION, location),
        ],
    )
        .into_response())
}
