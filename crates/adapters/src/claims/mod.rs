// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent volume claim lookup

mod kubectl;

pub use kubectl::KubectlClaims;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClaims;

use crate::kubectl::KubectlError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from claim lookups
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error(transparent)]
    Kubectl(#[from] KubectlError),
}

/// Finds volume claims by a fragment of their name
#[async_trait]
pub trait ClaimResolver: Clone + Send + Sync + 'static {
    /// First claim in `namespace` whose name contains `fragment`
    async fn find_claim_by_name(
        &self,
        fragment: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClaimError>;
}

/// First name in `names` containing `fragment`
pub fn first_match<'a, I>(names: I, fragment: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .find(|name| name.contains(fragment))
        .map(str::to_string)
}

#[cfg(test)]
#[path = "claims_tests.rs"]
mod tests;
