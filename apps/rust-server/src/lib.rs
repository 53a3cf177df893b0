// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Obligator - Shared Identity Provider and Forward-Auth Gateway
//!
//! Independently owned domains delegate login to one service. The service
//! serves its own login surface and sits in front of tenant applications as
//! a forward-auth filter, injecting the verified identity into each request.
//!
//! ## Modules
//!
//! - `router` - Host-based dispatch: legacy redirects, tenants, self-service
//! - `auth` - Session tokens, cookies and forward-auth validation
//! - `cluster` - Startup primary/replica decision
//! - `server` - Gateway assembly and serving
//! - `api` - Self-service route table (Axum)
//! - `storage` - Configuration and identity store (redb)

pub mod api;
pub mod auth;
pub mod cluster;
pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod provision;
pub mod router;
pub mod server;
pub mod state;
pub mod storage;

pub use router::{into_handler, RequestHandler};
pub use server::{Collaborators, Gateway, StartupError};
