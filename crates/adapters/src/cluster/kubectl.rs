// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kubectl-backed change stream

use super::{ClusterEvent, ClusterSource, ClusterStream, SourceError, WatchScope};
use crate::kubectl::{JsonStream, Kubectl, KubectlError, ObjectList, ObjectMeta};
use async_trait::async_trait;
use pv_core::{JobSnapshot, JobStatus, NamespaceEvent, ResourceEvent, ResourceState};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::mpsc;

/// Events buffered per stream before the kubectl readers wait
const STREAM_CAPACITY: usize = 256;

/// Resource kinds the source can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Jobs,
    Pods,
    Namespaces,
}

impl WatchKind {
    fn resource(self) -> &'static str {
        match self {
            WatchKind::Jobs => "jobs",
            WatchKind::Pods => "pods",
            WatchKind::Namespaces => "namespaces",
        }
    }

    fn namespaced(self) -> bool {
        !matches!(self, WatchKind::Namespaces)
    }

    fn for_scope(scope: &WatchScope) -> Vec<WatchKind> {
        let mut kinds = vec![WatchKind::Jobs, WatchKind::Pods];
        if scope.namespaces {
            kinds.push(WatchKind::Namespaces);
        }
        kinds
    }
}

#[derive(Deserialize)]
struct JobObject {
    metadata: ObjectMeta,
    #[serde(default)]
    status: JobStatus,
}

#[derive(Deserialize)]
struct PlainObject {
    metadata: ObjectMeta,
}

#[derive(Deserialize)]
struct WatchEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: Value,
}

fn object_event(
    kind: WatchKind,
    state: ResourceState,
    object: Value,
) -> Result<ClusterEvent, SourceError> {
    let event = match kind {
        WatchKind::Jobs => {
            let job: JobObject = serde_json::from_value(object).map_err(KubectlError::from)?;
            let mut snapshot = JobSnapshot::new(job.metadata.name, job.metadata.namespace)
                .with_status(job.status);
            snapshot.uid = job.metadata.uid;
            ClusterEvent::Job(ResourceEvent::new(snapshot, state))
        }
        WatchKind::Pods => {
            let pod: PlainObject = serde_json::from_value(object).map_err(KubectlError::from)?;
            ClusterEvent::Pod {
                name: pod.metadata.name,
                namespace: pod.metadata.namespace,
                state,
            }
        }
        WatchKind::Namespaces => {
            let ns: PlainObject = serde_json::from_value(object).map_err(KubectlError::from)?;
            ClusterEvent::Namespace(NamespaceEvent {
                name: ns.metadata.name,
                state,
            })
        }
    };
    Ok(event)
}

/// Decode one `--output-watch-events` document.
///
/// Returns `Ok(None)` for event types that carry no state change (bookmarks)
/// and `Err(SourceError::Stream)` for server-side watch errors.
pub fn decode_watch_event(
    kind: WatchKind,
    document: Value,
) -> Result<Option<ClusterEvent>, SourceError> {
    let envelope: WatchEnvelope = serde_json::from_value(document).map_err(KubectlError::from)?;
    let state = match envelope.kind.as_str() {
        "ADDED" => ResourceState::Create,
        "MODIFIED" => ResourceState::Update,
        "DELETED" => ResourceState::Delete,
        "ERROR" => {
            let message = envelope
                .object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown watch error");
            return Err(SourceError::Stream(message.to_string()));
        }
        _ => return Ok(None),
    };
    object_event(kind, state, envelope.object).map(Some)
}

/// Change stream built from `kubectl get --watch` processes, one per kind.
///
/// `watch` first lists every kind to prove the cluster is reachable and the
/// credentials allow it. Each watch process then replays the existing
/// objects as `ADDED` events before streaming changes, so the snapshot and
/// the stream cannot drift apart.
#[derive(Clone, Debug, Default)]
pub struct KubectlSource {
    kubectl: Kubectl,
}

impl KubectlSource {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }

    fn scope_args(kind: WatchKind, scope: &WatchScope) -> Vec<String> {
        let mut args = vec!["get".to_string(), kind.resource().to_string()];
        if kind.namespaced() {
            if scope.is_cluster_wide() {
                args.push("--all-namespaces".to_string());
            } else {
                args.push("--namespace".to_string());
                args.push(scope.namespace.clone());
            }
        }
        args
    }

    async fn list(&self, kind: WatchKind, scope: &WatchScope) -> Result<usize, SourceError> {
        let mut args = Self::scope_args(kind, scope);
        args.extend(["-o".to_string(), "json".to_string()]);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let list: ObjectList<Value> = self
            .kubectl
            .run_json(&args, None)
            .await
            .map_err(|e| SourceError::Sync(e.to_string()))?;
        Ok(list.items.len())
    }

    fn spawn_watch(&self, kind: WatchKind, scope: &WatchScope) -> Result<Child, SourceError> {
        let mut args = Self::scope_args(kind, scope);
        args.extend(
            ["--watch", "--output-watch-events", "-o", "json"]
                .into_iter()
                .map(String::from),
        );
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.kubectl
            .spawn(&args)
            .map_err(|e| SourceError::Sync(e.to_string()))
    }
}

async fn pump(
    kind: WatchKind,
    mut child: Child,
    tx: mpsc::Sender<Result<ClusterEvent, SourceError>>,
) {
    let Some(stdout) = child.stdout.take() else {
        let _ = tx
            .send(Err(SourceError::Stream("watch has no output".to_string())))
            .await;
        return;
    };

    let mut stream = JsonStream::new(stdout);
    loop {
        let decoded = match stream.next::<Value>().await {
            Some(Ok(document)) => decode_watch_event(kind, document),
            Some(Err(e)) => Err(e.into()),
            None => Err(SourceError::Stream(format!(
                "watch for {} ended",
                kind.resource()
            ))),
        };

        let terminal = decoded.is_err();
        match decoded {
            Ok(None) => continue,
            Ok(Some(event)) => {
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
            }
        }
        if terminal {
            return;
        }
    }
}

#[async_trait]
impl ClusterSource for KubectlSource {
    async fn watch(&self, scope: &WatchScope) -> Result<ClusterStream, SourceError> {
        let kinds = WatchKind::for_scope(scope);

        for kind in &kinds {
            let count = self.list(*kind, scope).await?;
            tracing::debug!(kind = kind.resource(), count, "listed");
        }

        let mut children = Vec::with_capacity(kinds.len());
        for kind in &kinds {
            children.push((*kind, self.spawn_watch(*kind, scope)?));
        }

        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        for (kind, child) in children {
            tokio::spawn(pump(kind, child, tx.clone()));
        }
        Ok(rx)
    }
}

#[cfg(test)]
#[path = "kubectl_tests.rs"]
mod tests;
