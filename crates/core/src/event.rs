// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource state-change events reported by the cluster

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pod counters reported in a job's status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub active: i32,
    #[serde(default)]
    pub succeeded: i32,
    #[serde(default)]
    pub failed: i32,
}

impl JobStatus {
    pub fn active(active: i32) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }

    pub fn succeeded(succeeded: i32) -> Self {
        Self {
            succeeded,
            ..Self::default()
        }
    }

    pub fn failed(failed: i32) -> Self {
        Self {
            failed,
            ..Self::default()
        }
    }

    /// Terminal outcome implied by the counters.
    ///
    /// Failure wins over success when both counters are set.
    pub fn completion(&self) -> Option<Completion> {
        if self.failed > 0 {
            Some(Completion::Failed)
        } else if self.succeeded > 0 {
            Some(Completion::Succeeded)
        } else {
            None
        }
    }
}

/// How a job finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    Succeeded,
    Failed,
}

/// The subset of a cluster job object the scheduler cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
}

impl JobSnapshot {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: None,
            status: JobStatus::default(),
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }
}

/// Kind of change observed for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    /// The cluster acknowledged the resource (fires once)
    Create,
    /// The resource's status changed (zero or more times)
    Update,
    /// The resource is gone (fires once, terminal for the name)
    Delete,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Create => "create",
            ResourceState::Update => "update",
            ResourceState::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// A state change for a job resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub job: JobSnapshot,
    pub state: ResourceState,
}

impl ResourceEvent {
    pub fn new(job: JobSnapshot, state: ResourceState) -> Self {
        Self { job, state }
    }

    pub fn created(job: JobSnapshot) -> Self {
        Self::new(job, ResourceState::Create)
    }

    pub fn updated(job: JobSnapshot) -> Self {
        Self::new(job, ResourceState::Update)
    }

    pub fn deleted(job: JobSnapshot) -> Self {
        Self::new(job, ResourceState::Delete)
    }

    /// Name of the job this event belongs to (the routing key)
    pub fn name(&self) -> &str {
        &self.job.name
    }

    /// Completion carried by this event.
    ///
    /// Only `Update` events can complete a job; `Create` and `Delete` never do,
    /// whatever their counters say.
    pub fn completion(&self) -> Option<Completion> {
        match self.state {
            ResourceState::Update => self.job.status.completion(),
            ResourceState::Create | ResourceState::Delete => None,
        }
    }
}

/// A state change for a namespace resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceEvent {
    pub name: String,
    pub state: ResourceState,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
