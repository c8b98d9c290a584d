// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource state watcher: routes cluster events to registered notifiers

use crate::error::WatchError;
use pv_adapters::{ClusterEvent, ClusterSource, ClusterStream, WatchScope};
use pv_core::NotifierRegistry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Running watcher. Its token is cancelled when the stream is lost.
pub struct WatcherHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Cancelled once the watcher stops routing events
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_lost(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop routing and wait for the routing task to finish
    pub async fn close(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "watcher task ended abnormally");
        }
    }
}

pub struct Watcher;

impl Watcher {
    /// Open the change stream for `scope` and start routing its events.
    ///
    /// Returns once the source has synchronized with the cluster. Job events
    /// go to the notifier registered under the job's name; a `Delete` also
    /// drops the registration. Pod events are only logged. Namespace events
    /// go to the registry's namespace notifiers.
    pub async fn watch<S: ClusterSource>(
        source: &S,
        registry: NotifierRegistry,
        scope: WatchScope,
    ) -> Result<WatcherHandle, WatchError> {
        let stream = source
            .watch(&scope)
            .await
            .map_err(WatchError::SyncFailed)?;

        info!(
            namespace = %scope.namespace,
            namespaces = scope.namespaces,
            "resource watcher synced"
        );

        let token = CancellationToken::new();
        let task = tokio::spawn(route(stream, registry, token.clone()));
        Ok(WatcherHandle { token, task })
    }
}

async fn route(mut stream: ClusterStream, registry: NotifierRegistry, token: CancellationToken) {
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            next = stream.recv() => next,
        };

        match next {
            Some(Ok(event)) => dispatch(&registry, event),
            Some(Err(e)) => {
                error!(error = %e, "resource watch failed");
                break;
            }
            None => {
                error!("resource watch stream closed");
                break;
            }
        }
    }
    token.cancel();
}

fn dispatch(registry: &NotifierRegistry, event: ClusterEvent) {
    match event {
        ClusterEvent::Job(event) => {
            let name = event.name().to_string();
            let state = event.state;
            if registry.dispatch(event) {
                debug!(job = %name, state = %state, "job event routed");
            } else {
                debug!(job = %name, state = %state, "no notifier for job");
            }
        }
        ClusterEvent::Pod {
            name,
            namespace,
            state,
        } => {
            debug!(pod = %name, namespace = %namespace, state = %state, "pod event");
        }
        ClusterEvent::Namespace(event) => {
            let name = event.name.clone();
            let state = event.state;
            if !registry.dispatch_namespace(event) {
                debug!(namespace = %name, state = %state, "no notifier for namespace");
            }
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
