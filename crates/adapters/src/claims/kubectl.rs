// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kubectl-backed claim lookup

use super::{first_match, ClaimError, ClaimResolver};
use crate::kubectl::{effective_namespace, Kubectl, ObjectList, ObjectMeta};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Deserialize)]
struct ClaimObject {
    metadata: ObjectMeta,
}

/// Lists persistentvolumeclaims with kubectl
#[derive(Clone, Debug, Default)]
pub struct KubectlClaims {
    kubectl: Kubectl,
}

impl KubectlClaims {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }
}

#[async_trait]
impl ClaimResolver for KubectlClaims {
    async fn find_claim_by_name(
        &self,
        fragment: &str,
        namespace: &str,
    ) -> Result<Option<String>, ClaimError> {
        let claims: ObjectList<ClaimObject> = self
            .kubectl
            .run_json(
                &[
                    "get",
                    "persistentvolumeclaims",
                    "--namespace",
                    effective_namespace(namespace),
                    "-o",
                    "json",
                ],
                None,
            )
            .await?;

        Ok(first_match(
            claims.items.iter().map(|c| c.metadata.name.as_str()),
            fragment,
        ))
    }
}
