// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cookie parsing and `Set-Cookie` construction.

use axum::http::{header::COOKIE, HeaderMap};

use crate::host::{is_ip_literal, strip_port};

/// Name of the cookie that marks a browser as having made a same-site request.
pub const CROSS_SITE_DETECTOR_COOKIE: &str = "obligator_not_cross_site";

/// One year.
pub const CROSS_SITE_DETECTOR_MAX_AGE: u64 = 86_400 * 365;

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| token_from_cookie_header(cookie_header, name))
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Cookie `Domain` shared by every subdomain of the request host's
/// registrable domain (public suffix plus one label).
///
/// IP literals, single-label hosts (`localhost`) and bare public suffixes
/// (`co.uk`) get no `Domain` attribute, which makes the cookie host-only.
pub fn cookie_domain(host: &str) -> Option<String> {
    let host = strip_port(host).trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || is_ip_literal(&host) || !host.contains('.') {
        return None;
    }

    psl::domain_str(&host).map(str::to_string)
}

fn domain_attribute(host: &str) -> String {
    cookie_domain(host)
        .map(|domain| format!(" Domain={domain};"))
        .unwrap_or_default()
}

/// `Set-Cookie` value for the cross-site detector.
pub fn cross_site_detector_cookie(host: &str) -> String {
    format!(
        "{}=true;{} Path=/; Max-Age={}; Secure; HttpOnly; SameSite=Lax",
        CROSS_SITE_DETECTOR_COOKIE,
        domain_attribute(host),
        CROSS_SITE_DETECTOR_MAX_AGE
    )
}

/// `Set-Cookie` value that deletes cookie `name` on the host's apex.
pub fn expired_cookie(name: &str, host: &str) -> String {
    format!(
        "{name}=;{} Path=/; Max-Age=0; Secure; HttpOnly; SameSite=Lax",
        domain_attribute(host)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; obligator_login_key=abc.def.ghi; other=1"),
        );
        assert_eq!(
            cookie_value(&headers, "obligator_login_key"),
            Some("abc.def.ghi")
        );
        assert_eq!(cookie_value(&headers, "login_key"), None);
    }

    #[test]
    fn searches_every_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(cookie_value(&headers, "b"), Some("2"));
    }

    #[test]
    fn apex_domain_derivation() {
        assert_eq!(cookie_domain("example.com").as_deref(), Some("example.com"));
        assert_eq!(cookie_domain("auth.example.com").as_deref(), Some("example.com"));
        assert_eq!(cookie_domain("a.b.example.com:8443").as_deref(), Some("example.com"));
        assert_eq!(cookie_domain("auth.example.co.uk").as_deref(), Some("example.co.uk"));
        assert_eq!(cookie_domain("Example.CO.UK").as_deref(), Some("example.co.uk"));
        assert_eq!(cookie_domain("co.uk"), None);
        assert_eq!(cookie_domain("localhost:1616"), None);
        assert_eq!(cookie_domain("127.0.0.1:1616"), None);
        assert_eq!(cookie_domain("[::1]:1616"), None);
    }

    #[test]
    fn detector_cookie_attributes() {
        let cookie = cross_site_detector_cookie("login.example.com");
        assert_eq!(
            cookie,
            "obligator_not_cross_site=true; Domain=example.com; Path=/; Max-Age=31536000; Secure; HttpOnly; SameSite=Lax"
        );

        let host_only = cross_site_detector_cookie("localhost");
        assert!(!host_only.contains("Domain="));
    }
}
