// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job requests

use serde::{Deserialize, Serialize};

/// A persistent volume claim mounted into the job's container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRef {
    pub claim_name: String,
    pub mount_path: String,
    pub read_only: bool,
}

impl MountRef {
    pub fn new(
        claim_name: impl Into<String>,
        mount_path: impl Into<String>,
        read_only: bool,
    ) -> Self {
        Self {
            claim_name: claim_name.into(),
            mount_path: mount_path.into(),
            read_only,
        }
    }
}

/// A unit of containerized work submitted to the job monitor.
///
/// `name` is both the cluster resource name and the key that state-change
/// notifications are routed by, so it must be unique within `namespace`
/// while the job is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub name: String,
    pub namespace: String,
    pub image: String,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub mount_refs: Vec<MountRef>,
    #[serde(default)]
    pub auto_delete: bool,
}

impl JobRequest {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            image: image.into(),
            command: None,
            args: None,
            mount_refs: Vec::new(),
            auto_delete: false,
        }
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mounts(mut self, mount_refs: Vec<MountRef>) -> Self {
        self.mount_refs = mount_refs;
        self
    }

    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    /// Requests without a name cannot be routed and are never scheduled
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}
