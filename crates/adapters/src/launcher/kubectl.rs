// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kubectl-backed job launcher

use super::{job_manifest, JobHandle, JobLauncher, LaunchError};
use crate::kubectl::{effective_namespace, Kubectl, ObjectMeta};
use async_trait::async_trait;
use pv_core::{JobNotifier, JobRequest, NotifierRegistry, ResourceEvent, ResourceState};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

fn job_key(name: &str, namespace: &str) -> String {
    format!("{}/{}", effective_namespace(namespace), name)
}

#[derive(Deserialize)]
struct CreatedJob {
    metadata: ObjectMeta,
}

#[derive(Default)]
struct Tracking {
    /// Outstanding jobs by `namespace/name`, with the uid once known
    outstanding: HashMap<String, Option<String>>,
    /// Uids of job instances this launcher is done with
    retired: HashSet<String>,
    failed: Vec<String>,
}

impl Tracking {
    fn retire(&mut self, key: &str) {
        if let Some(Some(uid)) = self.outstanding.remove(key) {
            self.retired.insert(uid);
        }
    }
}

type SharedTracking = Arc<Mutex<Tracking>>;

fn lock(tracking: &SharedTracking) -> MutexGuard<'_, Tracking> {
    tracking.lock().unwrap_or_else(|e| e.into_inner())
}

/// Launches jobs with `kubectl create` and tracks which are outstanding.
///
/// Notifiers are registered in the shared registry the resource watcher
/// routes through. A job stops being outstanding when it is deleted through
/// this launcher, when it is reported failed, or when the watcher observes
/// its deletion. Jobs are told apart by uid, so a late event for an earlier
/// job with the same name never touches its successor.
#[derive(Clone)]
pub struct KubectlLauncher {
    kubectl: Kubectl,
    registry: NotifierRegistry,
    tracking: SharedTracking,
}

impl KubectlLauncher {
    pub fn new(kubectl: Kubectl, registry: NotifierRegistry) -> Self {
        Self {
            kubectl,
            registry,
            tracking: SharedTracking::default(),
        }
    }

    /// Jobs reported failed, as `namespace/name`
    pub fn failed_jobs(&self) -> Vec<String> {
        lock(&self.tracking).failed.clone()
    }
}

/// Follows one job instance: retires it when its deletion is observed and
/// forwards its events
struct TrackingNotifier {
    key: String,
    uid: OnceLock<String>,
    tracking: SharedTracking,
    inner: Arc<dyn JobNotifier>,
}

impl JobNotifier for TrackingNotifier {
    fn notify(&self, event: ResourceEvent) {
        if !self.tracks(&event) {
            return;
        }
        if event.state == ResourceState::Delete {
            let mut tracking = lock(&self.tracking);
            let current = tracking.outstanding.get(&self.key).cloned();
            if current.is_some_and(|uid| uid.as_ref() == self.uid.get()) {
                tracking.retire(&self.key);
            }
        }
        self.inner.notify(event);
    }

    fn tracks(&self, event: &ResourceEvent) -> bool {
        let Some(uid) = event.job.uid.as_deref() else {
            return true;
        };
        match self.uid.get() {
            Some(own) => own == uid,
            // Still being created: anything but a retired instance is ours
            None => !lock(&self.tracking).retired.contains(uid),
        }
    }
}

#[async_trait]
impl JobLauncher for KubectlLauncher {
    async fn create_job(
        &self,
        request: &JobRequest,
        notifier: Arc<dyn JobNotifier>,
    ) -> Result<JobHandle, LaunchError> {
        if !request.has_name() {
            return Err(LaunchError::InvalidRequest("job name is empty".to_string()));
        }

        let manifest = serde_json::to_vec(&job_manifest(request))
            .map_err(|e| LaunchError::InvalidRequest(e.to_string()))?;
        let key = job_key(&request.name, &request.namespace);

        // Register first so the Create event cannot race the registration
        let tracker = Arc::new(TrackingNotifier {
            key: key.clone(),
            uid: OnceLock::new(),
            tracking: Arc::clone(&self.tracking),
            inner: notifier,
        });
        self.registry.register(&request.name, tracker.clone());

        let created: CreatedJob = match self
            .kubectl
            .run_json(&["create", "-f", "-", "-o", "json"], Some(&manifest))
            .await
        {
            Ok(created) => created,
            Err(e) => {
                self.registry.unregister(&request.name);
                return Err(e.into());
            }
        };

        if let Some(uid) = &created.metadata.uid {
            let _ = tracker.uid.set(uid.clone());
        }
        lock(&self.tracking)
            .outstanding
            .insert(key, created.metadata.uid.clone());

        Ok(JobHandle {
            name: created.metadata.name,
            namespace: effective_namespace(&request.namespace).to_string(),
            uid: created.metadata.uid,
        })
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), LaunchError> {
        self.kubectl
            .run(
                &[
                    "delete",
                    "job",
                    name,
                    "--namespace",
                    effective_namespace(namespace),
                    "--grace-period=0",
                    "--cascade=background",
                    "--ignore-not-found",
                ],
                None,
            )
            .await?;
        lock(&self.tracking).retire(&job_key(name, namespace));
        Ok(())
    }

    async fn failed_job(&self, name: &str, namespace: &str) {
        let key = job_key(name, namespace);
        tracing::error!(job = name, namespace, "job failed; leaving it in place");
        let mut tracking = lock(&self.tracking);
        tracking.retire(&key);
        tracking.failed.push(key);
    }

    fn in_progress(&self) -> bool {
        !lock(&self.tracking).outstanding.is_empty()
    }
}

#[cfg(test)]
#[path = "kubectl_tests.rs"]
mod tests;
