// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake working copy adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RepoAdapter, RepoError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Recorded repo call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    Clone { url: String },
    Reset,
    Checkout { branch: String },
    Pull { branch: String },
}

/// Operation selector for injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOp {
    Clone,
    Reset,
    Checkout,
    Pull,
}

impl RepoCall {
    pub fn op(&self) -> RepoOp {
        match self {
            RepoCall::Clone { .. } => RepoOp::Clone,
            RepoCall::Reset => RepoOp::Reset,
            RepoCall::Checkout { .. } => RepoOp::Checkout,
            RepoCall::Pull { .. } => RepoOp::Pull,
        }
    }
}

#[derive(Default)]
struct FakeWorkingCopy {
    cloned: bool,
    branch: Option<String>,
    failure: Option<(RepoOp, String)>,
    calls: Vec<RepoCall>,
}

/// Fake working copy adapter for testing
#[derive(Clone, Default)]
pub struct FakeRepoAdapter {
    inner: Arc<Mutex<FakeWorkingCopy>>,
}

impl FakeRepoAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing working copy
    pub fn cloned() -> Self {
        let adapter = Self::default();
        adapter.lock().cloned = true;
        adapter
    }

    /// Make every call of `op` fail with `message`
    pub fn failing(self, op: RepoOp, message: &str) -> Self {
        self.lock().failure = Some((op, message.to_string()));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeWorkingCopy> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RepoCall> {
        self.lock().calls.clone()
    }

    /// Branch most recently checked out
    pub fn branch(&self) -> Option<String> {
        self.lock().branch.clone()
    }

    fn record(&self, call: RepoCall) -> Result<(), RepoError> {
        let mut copy = self.lock();
        let op = call.op();
        copy.calls.push(call);
        if let Some((failing, message)) = &copy.failure {
            if *failing == op {
                return Err(RepoError::CommandFailed(message.clone()));
            }
        }
        if op != RepoOp::Clone && !copy.cloned {
            return Err(RepoError::NotCloned("fake".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RepoAdapter for FakeRepoAdapter {
    async fn clone_repo(&self, url: &str) -> Result<(), RepoError> {
        self.record(RepoCall::Clone {
            url: url.to_string(),
        })?;
        self.lock().cloned = true;
        Ok(())
    }

    fn is_cloned(&self) -> bool {
        self.lock().cloned
    }

    async fn reset(&self) -> Result<(), RepoError> {
        self.record(RepoCall::Reset)
    }

    async fn checkout(&self, branch: &str) -> Result<(), RepoError> {
        self.record(RepoCall::Checkout {
            branch: branch.to_string(),
        })?;
        self.lock().branch = Some(branch.to_string());
        Ok(())
    }

    async fn pull(&self, branch: &str) -> Result<(), RepoError> {
        self.record(RepoCall::Pull {
            branch: branch.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
