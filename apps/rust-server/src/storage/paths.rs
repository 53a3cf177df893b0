// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path utilities for on-disk state.

use std::path::{Path, PathBuf};

/// Default directory for the database file.
pub const DATA_ROOT: &str = ".";

/// On-disk layout rooted at the configured database directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Database file: `{root}/{db_prefix}db.redb`.
    ///
    /// The prefix lets several gateway instances share one directory.
    pub fn database(&self, db_prefix: &str) -> PathBuf {
        self.root.join(format!("{db_prefix}db.redb"))
    }
}
