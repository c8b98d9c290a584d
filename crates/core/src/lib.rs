// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pv-core: data model shared by the previewd crates
//!
//! This crate provides:
//! - Build job requests and their volume mounts
//! - Resource state-change events as reported by the cluster
//! - The name-keyed notifier registry events are routed through

pub mod event;
pub mod notifier;
pub mod request;

pub use event::{
    Completion, JobSnapshot, JobStatus, NamespaceEvent, ResourceEvent, ResourceState,
};
pub use notifier::{JobNotifier, NamespaceNotifier, NotifierRegistry};
pub use request::{JobRequest, MountRef};
