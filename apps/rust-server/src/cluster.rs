// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cluster Write Authority
//!
//! Replicas share one configuration store. Exactly one of them, the
//! primary, may perform the configuration-seeding writes at boot; the
//! others rely on the primary (or an earlier seeding) having done so.
//!
//! The role is decided once per process and never re-evaluated. A leader
//! failover while running is not picked up until restart.
//!
//! ## Membership Sources
//!
//! - [`Standalone`] - no cluster configured, this process is the primary
//! - [`StaticRole`] - role forced by configuration
//! - [`LeaseFileMembership`] - LiteFS-style mount: a `.primary` file names
//!   the current lease holder, so its presence means we are a replica

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Name of the lease file written by the primary's cluster agent.
pub const PRIMARY_LEASE_FILE: &str = ".primary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    Primary,
    Replica,
}

impl fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterRole::Primary => write!(f, "primary"),
            ClusterRole::Replica => write!(f, "replica"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("cluster mount {0} is not available")]
    MountMissing(PathBuf),

    #[error("failed to read cluster lease state: {0}")]
    Io(#[from] io::Error),
}

/// Source of truth for this process's cluster role.
pub trait ClusterMembership: Send + Sync {
    fn role(&self) -> Result<ClusterRole, ClusterError>;
}

/// Single-node deployment.
pub struct Standalone;

impl ClusterMembership for Standalone {
    fn role(&self) -> Result<ClusterRole, ClusterError> {
        Ok(ClusterRole::Primary)
    }
}

/// Role pinned by the operator.
pub struct StaticRole(pub ClusterRole);

impl ClusterMembership for StaticRole {
    fn role(&self) -> Result<ClusterRole, ClusterError> {
        Ok(self.0)
    }
}

/// Lease detection through a LiteFS-style FUSE mount.
pub struct LeaseFileMembership {
    mount_dir: PathBuf,
}

impl LeaseFileMembership {
    pub fn new(mount_dir: impl AsRef<Path>) -> Self {
        Self {
            mount_dir: mount_dir.as_ref().to_path_buf(),
        }
    }
}

impl ClusterMembership for LeaseFileMembership {
    fn role(&self) -> Result<ClusterRole, ClusterError> {
        match std::fs::metadata(&self.mount_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ClusterError::MountMissing(self.mount_dir.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ClusterError::MountMissing(self.mount_dir.clone()))
            }
            Err(e) => return Err(e.into()),
        }

        match std::fs::read_to_string(self.mount_dir.join(PRIMARY_LEASE_FILE)) {
            Ok(holder) => {
                debug!(primary = %holder.trim(), "Primary lease held by another node");
                Ok(ClusterRole::Replica)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ClusterRole::Primary),
            Err(e) => Err(e.into()),
        }
    }
}

/// The startup-time role decision.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAuthority {
    role: ClusterRole,
}

impl ClusterAuthority {
    /// Ask `membership` once. An undetermined role is treated as replica so
    /// that two nodes never both seed the shared store.
    pub fn detect(membership: &dyn ClusterMembership) -> Self {
        let role = match membership.role() {
            Ok(role) => role,
            Err(e) => {
                warn!(error = %e, "Cluster role undetermined, assuming replica");
                ClusterRole::Replica
            }
        };
        info!(role = %role, "Cluster role decided");
        Self { role }
    }

    /// Pick the membership source from configuration and detect.
    pub fn from_config(config: &ServerConfig) -> Self {
        if let Some(role) = config.cluster_role {
            Self::detect(&StaticRole(role))
        } else if let Some(dir) = &config.cluster_mount_dir {
            Self::detect(&LeaseFileMembership::new(dir))
        } else {
            Self::detect(&Standalone)
        }
    }

    pub fn role(&self) -> ClusterRole {
        self.role
    }

    pub fn is_primary(&self) -> bool {
        self.role == ClusterRole::Primary
    }
}
