// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! Login sessions for the identity provider and its forward-auth filter.
//!
//! ## Session Flow
//!
//! 1. A login flow (email, OAuth2, FedCM, QR) signs a session token listing
//!    the user's identities and stores it in the `{prefix}login_key` cookie
//!    on the apex domain.
//! 2. For every request to a tenant host, the gateway:
//!    - reads the cookie
//!    - verifies the HS256 signature and expiry
//!    - projects the first identity into `Remote-Id-Type` / `Remote-Id`
//!
//! ## Security
//!
//! - Tokens are signed with a secret shared through the store, so any replica
//!   verifies any other replica's sessions
//! - Clock skew tolerance is 60 seconds
//! - Failure detail is logged server-side only

pub mod claims;
pub mod cookie;
pub mod error;
pub mod extractor;
pub mod session;
pub mod validator;

pub use claims::SessionClaims;
pub use error::AuthError;
pub use extractor::Validated;
pub use session::{JwtSessionKeys, SessionKeyError, SessionTokens};
pub use validator::SessionValidator;
