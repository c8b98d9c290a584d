// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake claim lookup for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{first_match, ClaimError, ClaimResolver};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeClaimTable {
    claims: Vec<(String, String)>,
    lookups: Vec<(String, String)>,
}

/// Fake claim resolver backed by an in-memory list of (namespace, name)
#[derive(Clone, Default)]
pub struct FakeClaims {
    inner: Arc<Mutex<FakeClaimTable>>,
}

impl FakeClaims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claim(self, namespace: &str, name: &str) -> Self {
        self.lock()
            .claims
            .push((namespace.to_string(), name.to_string()));
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeClaimTable> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Recorded lookups as (fragment, namespace)
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lock().lookups.clone()
    }
}

#[async_trait]
impl ClaimResolver for FakeClaims {
    async fn find_claim_by_name(
        &self,
        fragment: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClaimError> {
        let mut table = self.lock();
        table
            .lookups
            .push((fragment.to_string(), namespace.to_string()));
        Ok(first_match(
            table
                .claims
                .iter()
                .filter(|(ns, _)| ns == namespace)
                .map(|(_, name)| name.as_str()),
            fragment,
        ))
    }
}
