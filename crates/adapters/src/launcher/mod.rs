// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job launcher adapters

mod kubectl;
mod manifest;

pub use kubectl::KubectlLauncher;
pub use manifest::job_manifest;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLauncher, LaunchScript, LauncherCall};

use crate::kubectl::KubectlError;
use async_trait::async_trait;
use pv_core::{JobNotifier, JobRequest};
use std::sync::Arc;
use thiserror::Error;

/// Errors from launcher operations
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid job request: {0}")]
    InvalidRequest(String),
    #[error("job rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Kubectl(#[from] KubectlError),
}

/// Identity of a job the cluster accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
}

/// Creates and retires job resources in the orchestration substrate.
///
/// `create_job` registers `notifier` so that every state change for the new
/// job is delivered to it. `in_progress` reports whether any launched job is
/// still outstanding; the job monitor relies on it to keep one job in flight.
#[async_trait]
pub trait JobLauncher: Clone + Send + Sync + 'static {
    /// Create a job resource for `request`
    async fn create_job(
        &self,
        request: &JobRequest,
        notifier: Arc<dyn JobNotifier>,
    ) -> Result<JobHandle, LaunchError>;

    /// Delete a finished job resource
    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), LaunchError>;

    /// Record that a job failed. The resource is left in place for inspection.
    async fn failed_job(&self, name: &str, namespace: &str);

    /// Whether a launched job has not been retired yet
    fn in_progress(&self) -> bool;
}
