// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The request-handler capability shared by tenants and protocol endpoints.

use std::convert::Infallible;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower::{util::BoxCloneSyncService, Service};

/// Opaque HTTP handler: a tenant application, or one of the login protocol
/// endpoints mounted on the self-service table.
///
/// Any `axum::Router` (after `with_state`) converts with [`into_handler`].
pub type RequestHandler = BoxCloneSyncService<Request, Response, Infallible>;

/// Box a service as a [`RequestHandler`].
pub fn into_handler<S>(service: S) -> RequestHandler
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    BoxCloneSyncService::new(service)
}

/// Placeholder mounted for protocol endpoints that were not supplied.
pub fn not_implemented() -> RequestHandler {
    into_handler(tower::service_fn(|_request: Request| async {
        Ok::<_, Infallible>(StatusCode::NOT_IMPLEMENTED.into_response())
    }))
}
