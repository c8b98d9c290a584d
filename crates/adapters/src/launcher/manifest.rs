// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch job manifest rendering

use crate::kubectl::effective_namespace;
use pv_core::JobRequest;
use serde_json::{json, Value};

/// Prefix for generated volume names (`vol0`, `vol1`, ...)
const VOLUME_PREFIX: &str = "vol";

/// Pod retries before the job is marked failed
const BACKOFF_LIMIT: i32 = 1;

/// Seconds a finished job lingers when auto-delete is requested
const TTL_SECONDS_AFTER_FINISHED: i32 = 1;

/// Render a `batch/v1` Job for `request`.
///
/// One container named after the job runs the image with the requested
/// command/args; every mount ref becomes a claim-backed volume mounted into
/// that container, in order.
pub fn job_manifest(request: &JobRequest) -> Value {
    let volumes: Vec<Value> = request
        .mount_refs
        .iter()
        .enumerate()
        .map(|(i, mount)| {
            json!({
                "name": format!("{}{}", VOLUME_PREFIX, i),
                "persistentVolumeClaim": {
                    "claimName": mount.claim_name,
                    "readOnly": mount.read_only,
                },
            })
        })
        .collect();

    let volume_mounts: Vec<Value> = request
        .mount_refs
        .iter()
        .enumerate()
        .map(|(i, mount)| {
            json!({
                "name": format!("{}{}", VOLUME_PREFIX, i),
                "mountPath": mount.mount_path,
                "readOnly": mount.read_only,
            })
        })
        .collect();

    let mut container = json!({
        "name": request.name,
        "image": request.image,
        "imagePullPolicy": "Always",
        "volumeMounts": volume_mounts,
    });
    if let Some(command) = &request.command {
        container["command"] = json!(command);
    }
    if let Some(args) = &request.args {
        container["args"] = json!(args);
    }

    let mut spec = json!({
        "backoffLimit": BACKOFF_LIMIT,
        "template": {
            "spec": {
                "containers": [container],
                "volumes": volumes,
                "restartPolicy": "Never",
            },
        },
    });
    if request.auto_delete {
        spec["ttlSecondsAfterFinished"] = json!(TTL_SECONDS_AFTER_FINISHED);
    }

    json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": request.name,
            "namespace": effective_namespace(&request.namespace),
        },
        "spec": spec,
    })
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
