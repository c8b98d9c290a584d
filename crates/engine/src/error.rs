// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use pv_adapters::{ClaimError, RepoError, SourceError};
use thiserror::Error;

/// Errors from starting the resource watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watcher failed to sync with the cluster: {0}")]
    SyncFailed(#[source] SourceError),
}

/// Errors from the job monitor's control surface
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor is not running")]
    NotRunning,
    #[error("monitor has shut down")]
    Closed,
}

/// Errors from a rebuild; nothing is submitted when one occurs
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("branch name is empty")]
    EmptyBranch,
    #[error("working copy: {0}")]
    Repo(#[from] RepoError),
    #[error("claim lookup: {0}")]
    Claims(#[from] ClaimError),
    #[error("no volume claim matching '{fragment}' in namespace '{namespace}'")]
    ClaimNotFound { fragment: String, namespace: String },
    #[error("submitting build: {0}")]
    Submit(#[from] MonitorError),
}
