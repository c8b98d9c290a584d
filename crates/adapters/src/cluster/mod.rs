// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster change-stream adapters

mod kubectl;

pub use kubectl::{decode_watch_event, KubectlSource, WatchKind};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClusterSource;

use crate::kubectl::KubectlError;
use async_trait::async_trait;
use pv_core::{NamespaceEvent, ResourceEvent, ResourceState};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the cluster change stream
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("initial listing failed: {0}")]
    Sync(String),
    #[error("watch stream reported an error: {0}")]
    Stream(String),
    #[error(transparent)]
    Kubectl(#[from] KubectlError),
}

/// Which resources to observe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchScope {
    /// Namespace to watch; empty watches every namespace
    pub namespace: String,
    /// Also observe namespace objects
    pub namespaces: bool,
}

impl WatchScope {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            namespaces: false,
        }
    }

    pub fn with_namespaces(mut self, namespaces: bool) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn is_cluster_wide(&self) -> bool {
        self.namespace.is_empty()
    }
}

/// A change observed in the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    Job(ResourceEvent),
    Pod {
        name: String,
        namespace: String,
        state: ResourceState,
    },
    Namespace(NamespaceEvent),
}

/// Events in arrival order; an `Err` is terminal for the stream
pub type ClusterStream = mpsc::Receiver<Result<ClusterEvent, SourceError>>;

/// Opens a change stream over cluster resources.
///
/// `watch` returns once every watched kind has been listed successfully; a
/// listing failure is returned instead of a stream. Objects that already
/// exist are delivered on the stream as `Create` events ahead of later
/// changes, which follow in arrival order. Nothing is guaranteed to be
/// queued by the time `watch` returns.
#[async_trait]
pub trait ClusterSource: Clone + Send + Sync + 'static {
    async fn watch(&self, scope: &WatchScope) -> Result<ClusterStream, SourceError>;
}
