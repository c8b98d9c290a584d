// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup sequence, listening, shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use pv_adapters::{
    ClaimResolver, ClusterSource, GitAdapter, JobLauncher, Kubectl, KubectlClaims,
    KubectlLauncher, KubectlSource, RepoAdapter, TracedClaims, TracedLauncher, TracedRepoAdapter,
    WatchScope,
};
use pv_core::{JobRequest, NotifierRegistry};
use pv_engine::{
    JobOutcome, Monitor, MonitorExit, OutcomeKind, PipelineError, RebuildPipeline, WatchError,
    Watcher, WatcherHandle,
};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ServerSettings;
use crate::webhook::{self, BranchHandler};

/// Services with the concrete adapters, each wrapped with tracing
pub type DaemonServices = Services<
    TracedRepoAdapter<GitAdapter>,
    TracedLauncher<KubectlLauncher>,
    TracedClaims<KubectlClaims>,
    KubectlSource,
>;

/// Launcher, claim lookup and change stream bound to one cluster
pub struct KubeServices<L, C, S> {
    pub launcher: L,
    pub claims: C,
    pub source: S,
    /// Notifier table shared by the launcher and the watcher
    pub registry: NotifierRegistry,
}

/// Everything the daemon drives
pub struct Services<R, L, C, S> {
    pub repo: R,
    /// Absent when neither a build nor the listener was requested
    pub kube: Option<KubeServices<L, C, S>>,
}

impl DaemonServices {
    /// Git working copy under the local dir plus a kubectl session if needed
    pub fn for_settings(settings: &ServerSettings) -> Self {
        let repo = TracedRepoAdapter::new(GitAdapter::new(settings.source_dir()));
        let kube = settings.needs_cluster().then(|| {
            let kubectl = Kubectl::new(settings.kubeconfig.clone());
            let registry = NotifierRegistry::new();
            info!(
                kubeconfig = ?settings.kubeconfig,
                namespace = %settings.namespace,
                "kube session created"
            );
            KubeServices {
                launcher: TracedLauncher::new(KubectlLauncher::new(
                    kubectl.clone(),
                    registry.clone(),
                )),
                claims: TracedClaims::new(KubectlClaims::new(kubectl.clone())),
                source: KubectlSource::new(kubectl),
                registry,
            }
        });
        Self { repo, kube }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("startup: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("webhook listener: {0}")]
    Listen(#[source] std::io::Error),
    #[error("resource watch lost")]
    WatchLost,
    #[error("build '{name}' failed: {reason}")]
    BuildFailed { name: String, reason: String },
}

/// Run the startup sequence and, if requested, the webhook listener.
///
/// Order: initial clone, initial build, listener. Returns when the listener
/// stops (shutdown or watch loss), or once the initial build finished when
/// not listening. The monitor and watcher are torn down before returning.
pub async fn run<R, L, C, S>(
    settings: &ServerSettings,
    services: Services<R, L, C, S>,
    shutdown: CancellationToken,
) -> Result<(), LifecycleError>
where
    R: RepoAdapter,
    L: JobLauncher,
    C: ClaimResolver,
    S: ClusterSource,
{
    let Services { repo, kube } = services;
    let Some(kube) = kube else {
        if settings.initial_clone {
            clone_only(&repo, settings).await?;
        }
        info!("no build or listener requested");
        return Ok(());
    };

    let scope = WatchScope::new(settings.namespace.as_str());
    let watcher = Watcher::watch(&kube.source, kube.registry.clone(), scope).await?;

    let mut monitor = Monitor::new();
    let outcomes = monitor.subscribe();
    monitor.start_watched(kube.launcher, watcher.token());

    let pipeline = RebuildPipeline::new(
        repo,
        kube.claims,
        monitor.submitter(),
        settings.namespace.as_str(),
    );
    let result = drive(settings, pipeline, outcomes, &watcher, &shutdown).await;

    match monitor.stop().await {
        MonitorExit::WatchLost => warn!("monitor ended on watch loss"),
        exit => info!(?exit, "monitor stopped"),
    }
    watcher.close().await;
    result
}

async fn clone_only<R: RepoAdapter>(
    repo: &R,
    settings: &ServerSettings,
) -> Result<(), PipelineError> {
    info!(url = %settings.target_repo, "initial clone");
    repo.clone_repo(&settings.target_repo).await?;
    if !settings.initial_branch.is_empty() {
        repo.checkout(&settings.initial_branch).await?;
    }
    Ok(())
}

async fn drive<R, C>(
    settings: &ServerSettings,
    mut pipeline: RebuildPipeline<R, C>,
    mut outcomes: broadcast::Receiver<JobOutcome>,
    watcher: &WatcherHandle,
    shutdown: &CancellationToken,
) -> Result<(), LifecycleError>
where
    R: RepoAdapter,
    C: ClaimResolver,
{
    if settings.initial_clone {
        pipeline
            .initial_clone(&settings.target_repo, Some(settings.initial_branch.as_str()))
            .await?;
    }

    let build = if settings.initial_build {
        Some(pipeline.initial_build().await?)
    } else {
        None
    };

    if settings.webhook_listen {
        let handler: Arc<dyn BranchHandler> = Arc::new(Mutex::new(pipeline));
        return listen(settings.port, handler, watcher.token(), shutdown.clone()).await;
    }

    match build {
        Some(request) => await_build(&request, &mut outcomes, watcher, shutdown).await,
        None => Ok(()),
    }
}

async fn listen(
    port: u16,
    handler: Arc<dyn BranchHandler>,
    lost: CancellationToken,
    shutdown: CancellationToken,
) -> Result<(), LifecycleError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let stop = {
        let lost = lost.clone();
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => info!("shutdown requested"),
                _ = lost.cancelled() => error!("resource watch lost, stopping listener"),
            }
        }
    };

    webhook::serve(addr, webhook::router(handler), stop)
        .await
        .map_err(LifecycleError::Listen)?;

    if lost.is_cancelled() {
        return Err(LifecycleError::WatchLost);
    }
    Ok(())
}

/// Wait for the outcome of `request`
async fn await_build(
    request: &JobRequest,
    outcomes: &mut broadcast::Receiver<JobOutcome>,
    watcher: &WatcherHandle,
    shutdown: &CancellationToken,
) -> Result<(), LifecycleError> {
    let lost = watcher.token();
    loop {
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(job = %request.name, "shutdown before build finished");
                return Ok(());
            }
            _ = lost.cancelled() => return Err(LifecycleError::WatchLost),
            outcome = outcomes.recv() => outcome,
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "outcome receiver lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Err(LifecycleError::WatchLost),
        };
        if outcome.name != request.name {
            continue;
        }

        return match outcome.kind {
            OutcomeKind::Succeeded => {
                info!(job = %outcome.name, "initial build succeeded");
                Ok(())
            }
            OutcomeKind::Failed => Err(LifecycleError::BuildFailed {
                name: outcome.name,
                reason: "job reported failure".to_string(),
            }),
            OutcomeKind::LaunchFailed(reason) => Err(LifecycleError::BuildFailed {
                name: outcome.name,
                reason,
            }),
        };
    }
}

/// Cancel the returned token on SIGTERM or SIGINT
pub fn shutdown_on_signal() -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
        trigger.cancel();
    });

    Ok(token)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
