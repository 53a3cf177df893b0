// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reverse-proxy route provisioning for owned domains.
//!
//! With the `builtin` proxy type the gateway terminates every domain itself,
//! so there is nothing to provision. Deployments behind an external proxy
//! plug in their own [`RouteProvisioner`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::DEFAULT_PROXY_TYPE;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("unsupported proxy type: {0}")]
    UnsupportedProxyType(String),

    #[error("failed to provision route for {domain}: {reason}")]
    Route { domain: String, reason: String },
}

/// Makes an owned domain reachable through the fronting reverse proxy.
#[async_trait]
pub trait RouteProvisioner: Send + Sync {
    async fn add_domain(&self, domain: &str) -> Result<(), ProvisionError>;
}

/// The gateway itself is the proxy.
pub struct BuiltinProvisioner;

#[async_trait]
impl RouteProvisioner for BuiltinProvisioner {
    async fn add_domain(&self, domain: &str) -> Result<(), ProvisionError> {
        debug!(domain = %domain, "Builtin proxy serves domain directly");
        Ok(())
    }
}

/// Provisioner for the configured `proxy_type`.
pub fn provisioner_for(proxy_type: &str) -> Result<Arc<dyn RouteProvisioner>, ProvisionError> {
    match proxy_type {
        "" | DEFAULT_PROXY_TYPE => Ok(Arc::new(BuiltinProvisioner)),
        other => Err(ProvisionError::UnsupportedProxyType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtin_accepts_every_domain() {
        let provisioner = provisioner_for("builtin").unwrap();
        assert!(provisioner.add_domain("example.com").await.is_ok());
    }

    #[test]
    fn unknown_proxy_types_are_rejected() {
        assert!(matches!(
            provisioner_for("nginx"),
            Err(ProvisionError::UnsupportedProxyType(t)) if t == "nginx"
        ));
    }
}
