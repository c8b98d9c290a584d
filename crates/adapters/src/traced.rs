// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::claims::{ClaimError, ClaimResolver};
use crate::launcher::{JobHandle, JobLauncher, LaunchError};
use crate::repo::{RepoAdapter, RepoError};
use async_trait::async_trait;
use pv_core::{JobNotifier, JobRequest};
use std::sync::Arc;
use tracing::Instrument;

/// Wrapper that adds tracing to any JobLauncher
#[derive(Clone)]
pub struct TracedLauncher<L> {
    inner: L,
}

impl<L> TracedLauncher<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<L: JobLauncher> JobLauncher for TracedLauncher<L> {
    async fn create_job(
        &self,
        request: &JobRequest,
        notifier: Arc<dyn JobNotifier>,
    ) -> Result<JobHandle, LaunchError> {
        let span = tracing::info_span!(
            "launcher.create",
            job = %request.name,
            namespace = %request.namespace
        );

        async {
            tracing::info!(
                image = %request.image,
                mounts = request.mount_refs.len(),
                "creating job"
            );

            // Precondition: the name is the routing key
            if !request.has_name() {
                tracing::error!("job name is empty");
                return Err(LaunchError::InvalidRequest("job name is empty".to_string()));
            }

            let start = std::time::Instant::now();
            let result = self.inner.create_job(request, notifier).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(handle) => tracing::info!(
                    uid = handle.uid.as_deref().unwrap_or(""),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "job created"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "create failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), LaunchError> {
        let span = tracing::info_span!("launcher.delete", job = name, namespace);

        async {
            let start = std::time::Instant::now();
            let result = self.inner.delete_job(name, namespace).await;
            match &result {
                Ok(()) => tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "job deleted"
                ),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn failed_job(&self, name: &str, namespace: &str) {
        let span = tracing::info_span!("launcher.failed", job = name, namespace);
        self.inner
            .failed_job(name, namespace)
            .instrument(span)
            .await
    }

    fn in_progress(&self) -> bool {
        let busy = self.inner.in_progress();
        tracing::trace!(busy, "checked progress");
        busy
    }
}

/// Wrapper that adds tracing to any RepoAdapter
#[derive(Clone)]
pub struct TracedRepoAdapter<R> {
    inner: R,
}

impl<R> TracedRepoAdapter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RepoAdapter> RepoAdapter for TracedRepoAdapter<R> {
    async fn clone_repo(&self, url: &str) -> Result<(), RepoError> {
        let span = tracing::info_span!("repo.clone", url);

        async {
            tracing::info!("cloning");

            // Precondition: something to clone
            if url.is_empty() {
                tracing::error!("repository url is empty");
                return Err(RepoError::CommandFailed(
                    "repository url is empty".to_string(),
                ));
            }

            let start = std::time::Instant::now();
            let result = self.inner.clone_repo(url).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "cloned"),
                Err(e) => {
                    tracing::error!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "failed")
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    fn is_cloned(&self) -> bool {
        self.inner.is_cloned()
    }

    async fn reset(&self) -> Result<(), RepoError> {
        let span = tracing::info_span!("repo.reset");

        async {
            let result = self.inner.reset().await;
            match &result {
                Ok(()) => tracing::info!("working copy reset"),
                Err(e) => tracing::error!(error = %e, "reset failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn checkout(&self, branch: &str) -> Result<(), RepoError> {
        let span = tracing::info_span!("repo.checkout", branch);

        async {
            let start = std::time::Instant::now();
            let result = self.inner.checkout(branch).await;
            match &result {
                Ok(()) => tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "switched branch"
                ),
                Err(e) => tracing::error!(error = %e, "checkout failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn pull(&self, branch: &str) -> Result<(), RepoError> {
        let span = tracing::info_span!("repo.pull", branch);

        async {
            let start = std::time::Instant::now();
            let result = self.inner.pull(branch).await;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "pulled"),
                Err(e) => tracing::error!(error = %e, "pull failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any ClaimResolver
#[derive(Clone)]
pub struct TracedClaims<C> {
    inner: C,
}

impl<C> TracedClaims<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ClaimResolver> ClaimResolver for TracedClaims<C> {
    async fn find_claim_by_name(
        &self,
        fragment: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClaimError> {
        let result = self.inner.find_claim_by_name(fragment, namespace).await;
        match &result {
            Ok(Some(claim)) => tracing::debug!(fragment, namespace, claim, "claim found"),
            Ok(None) => tracing::warn!(fragment, namespace, "no matching claim"),
            Err(e) => tracing::error!(fragment, namespace, error = %e, "claim lookup failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
