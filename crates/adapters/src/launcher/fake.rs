// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job launcher for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobHandle, JobLauncher, LaunchError};
use async_trait::async_trait;
use pv_core::{JobNotifier, JobRequest, JobSnapshot, JobStatus, ResourceEvent};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded launcher call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherCall {
    Create { name: String, namespace: String },
    Delete { name: String, namespace: String },
    Failed { name: String, namespace: String },
}

/// What the fake cluster does with a job once it is created
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LaunchScript {
    /// Report Create (active) and nothing else; the test drives the rest
    #[default]
    Hold,
    /// Report Create (active) then Update (succeeded)
    Succeed,
    /// Report Create (active) then Update (failed)
    Fail,
    /// Refuse to create the job
    Reject(String),
}

#[derive(Default)]
struct FakeCluster {
    calls: Vec<LauncherCall>,
    scripts: HashMap<String, LaunchScript>,
    default_script: LaunchScript,
    notifiers: HashMap<String, (String, Arc<dyn JobNotifier>)>,
    outstanding: HashSet<String>,
    max_outstanding: usize,
}

/// Fake launcher that mimics the cluster's notifications for each job
#[derive(Clone, Default)]
pub struct FakeLauncher {
    inner: Arc<Mutex<FakeCluster>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script applied to jobs without a per-name script
    pub fn with_default_script(self, script: LaunchScript) -> Self {
        self.lock().default_script = script;
        self
    }

    /// Script applied to jobs with this name
    pub fn with_script(self, name: &str, script: LaunchScript) -> Self {
        self.lock().scripts.insert(name.to_string(), script);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeCluster> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<LauncherCall> {
        self.lock().calls.clone()
    }

    /// Names passed to `create_job`, in call order
    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LauncherCall::Create { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names passed to `delete_job`, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LauncherCall::Delete { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names passed to `failed_job`, in call order
    pub fn failed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LauncherCall::Failed { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Highest number of jobs that were outstanding at the same time
    pub fn max_outstanding(&self) -> usize {
        self.lock().max_outstanding
    }

    /// Deliver an event to the notifier registered for `name`.
    /// Returns false if no notifier is registered.
    pub fn emit(&self, name: &str, status: JobStatus, state: pv_core::ResourceState) -> bool {
        let target = self.lock().notifiers.get(name).cloned();
        match target {
            Some((namespace, notifier)) => {
                let job = JobSnapshot::new(name, namespace).with_status(status);
                notifier.notify(ResourceEvent::new(job, state));
                true
            }
            None => false,
        }
    }

    /// Wait until at least `count` calls were recorded
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.lock().calls.len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl JobLauncher for FakeLauncher {
    async fn create_job(
        &self,
        request: &JobRequest,
        notifier: Arc<dyn JobNotifier>,
    ) -> Result<JobHandle, LaunchError> {
        let script = {
            let mut cluster = self.lock();
            cluster.calls.push(LauncherCall::Create {
                name: request.name.clone(),
                namespace: request.namespace.clone(),
            });

            let script = cluster
                .scripts
                .get(&request.name)
                .cloned()
                .unwrap_or_else(|| cluster.default_script.clone());
            if let LaunchScript::Reject(reason) = script {
                return Err(LaunchError::Rejected(reason));
            }

            cluster.notifiers.insert(
                request.name.clone(),
                (request.namespace.clone(), Arc::clone(&notifier)),
            );
            cluster.outstanding.insert(request.name.clone());
            cluster.max_outstanding = cluster.max_outstanding.max(cluster.outstanding.len());
            script
        };

        let uid = uuid::Uuid::new_v4().to_string();
        let job = JobSnapshot::new(&request.name, &request.namespace).with_uid(&uid);
        notifier.notify(ResourceEvent::created(
            job.clone().with_status(JobStatus::active(1)),
        ));
        match script {
            LaunchScript::Succeed => {
                notifier.notify(ResourceEvent::updated(
                    job.with_status(JobStatus::succeeded(1)),
                ));
            }
            LaunchScript::Fail => {
                notifier.notify(ResourceEvent::updated(job.with_status(JobStatus::failed(1))));
            }
            LaunchScript::Hold | LaunchScript::Reject(_) => {}
        }

        Ok(JobHandle {
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            uid: Some(uid),
        })
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), LaunchError> {
        let removed = {
            let mut cluster = self.lock();
            cluster.calls.push(LauncherCall::Delete {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
            cluster.outstanding.remove(name);
            cluster.notifiers.remove(name)
        };

        // The cluster reports the deletion back to the job's notifier
        if let Some((namespace, notifier)) = removed {
            notifier.notify(ResourceEvent::deleted(JobSnapshot::new(name, namespace)));
        }
        Ok(())
    }

    async fn failed_job(&self, name: &str, namespace: &str) {
        let mut cluster = self.lock();
        cluster.calls.push(LauncherCall::Failed {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        cluster.outstanding.remove(name);
    }

    fn in_progress(&self) -> bool {
        !self.lock().outstanding.is_empty()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
