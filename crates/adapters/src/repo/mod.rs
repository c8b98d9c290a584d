// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working copy adapters

mod git;

pub use git::GitAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRepoAdapter, RepoCall, RepoOp};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from repo operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("no working copy at {0}")]
    NotCloned(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for the local working copy of the site repository
#[async_trait]
pub trait RepoAdapter: Clone + Send + Sync + 'static {
    /// Clone `url`, replacing any existing working copy
    async fn clone_repo(&self, url: &str) -> Result<(), RepoError>;

    /// Whether a working copy exists
    fn is_cloned(&self) -> bool;

    /// Discard local modifications
    async fn reset(&self) -> Result<(), RepoError>;

    /// Fetch and force-switch to the remote's `branch`
    async fn checkout(&self, branch: &str) -> Result<(), RepoError>;

    /// Pull `branch` from the remote. Being up to date is not an error.
    async fn pull(&self, branch: &str) -> Result<(), RepoError>;
}
