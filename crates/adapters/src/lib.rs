// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for cluster and working-copy I/O

pub mod claims;
pub mod cluster;
pub mod kubectl;
pub mod launcher;
pub mod repo;
pub mod traced;

pub use claims::{ClaimError, ClaimResolver, KubectlClaims};
pub use cluster::{ClusterEvent, ClusterSource, ClusterStream, KubectlSource, SourceError, WatchScope};
pub use kubectl::{Kubectl, KubectlError};
pub use launcher::{JobHandle, JobLauncher, KubectlLauncher, LaunchError};
pub use repo::{GitAdapter, RepoAdapter, RepoError};
pub use traced::{TracedClaims, TracedLauncher, TracedRepoAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use claims::FakeClaims;
#[cfg(any(test, feature = "test-support"))]
pub use cluster::FakeClusterSource;
#[cfg(any(test, feature = "test-support"))]
pub use launcher::{FakeLauncher, LaunchScript, LauncherCall};
#[cfg(any(test, feature = "test-support"))]
pub use repo::{FakeRepoAdapter, RepoCall, RepoOp};
