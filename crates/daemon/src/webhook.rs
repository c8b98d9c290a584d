// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP receiver for repository push webhooks

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use pv_adapters::{ClaimResolver, RepoAdapter};
use pv_core::JobRequest;
use pv_engine::{PipelineError, RebuildPipeline};
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const EVENT_HEADER: &str = "x-github-event";

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";

/// Reacts to a push on a branch
#[async_trait]
pub trait BranchHandler: Send + Sync + 'static {
    async fn branch_pushed(&self, branch: &str) -> Result<JobRequest, PipelineError>;
}

/// Pushes are handled one at a time against the shared working copy
#[async_trait]
impl<R, C> BranchHandler for Mutex<RebuildPipeline<R, C>>
where
    R: RepoAdapter,
    C: ClaimResolver,
{
    async fn branch_pushed(&self, branch: &str) -> Result<JobRequest, PipelineError> {
        self.lock().await.handle_webhook(branch).await
    }
}

#[derive(Debug, Deserialize)]
struct PushEvent {
    #[serde(rename = "ref")]
    git_ref: String,
    #[serde(default)]
    after: String,
    #[serde(default)]
    repository: Option<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    #[serde(default)]
    name: Option<String>,
}

impl PushEvent {
    fn repository_name(&self) -> &str {
        self.repository.as_ref().map_or("", |r| r.name.as_str())
    }

    fn owner_name(&self) -> &str {
        self.repository
            .as_ref()
            .and_then(|r| r.owner.as_ref())
            .and_then(|o| o.name.as_deref())
            .unwrap_or("")
    }
}

/// What a `ref` names
#[derive(Debug, PartialEq, Eq)]
enum PushedRef<'a> {
    Branch(&'a str),
    Tag(&'a str),
    Other,
}

fn classify_ref(git_ref: &str) -> PushedRef<'_> {
    if let Some(branch) = git_ref.strip_prefix(BRANCH_PREFIX) {
        if !branch.is_empty() {
            return PushedRef::Branch(branch);
        }
    }
    if let Some(tag) = git_ref.strip_prefix(TAG_PREFIX) {
        return PushedRef::Tag(tag);
    }
    PushedRef::Other
}

/// Routes: `POST /` for deliveries, `GET /healthz` for probes
pub fn router(handler: Arc<dyn BranchHandler>) -> Router {
    Router::new()
        .route("/", post(receive))
        .route("/healthz", get(healthz))
        .with_state(handler)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn receive(
    State(handler): State<Arc<dyn BranchHandler>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let Some(event) = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "missing event header\n".to_string());
    };

    match event {
        "ping" => (StatusCode::OK, "pong\n".to_string()),
        "push" => push(handler.as_ref(), &body).await,
        other => {
            debug!(event = other, "ignoring webhook event");
            (StatusCode::ACCEPTED, format!("ignored {} event\n", other))
        }
    }
}

async fn push(handler: &dyn BranchHandler, body: &[u8]) -> (StatusCode, String) {
    let event: PushEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "undecodable push payload");
            return (StatusCode::BAD_REQUEST, format!("bad payload: {}\n", e));
        }
    };

    let branch = match classify_ref(&event.git_ref) {
        PushedRef::Branch(branch) => branch,
        PushedRef::Tag(tag) => {
            debug!(tag, "ignoring tag push");
            return (StatusCode::ACCEPTED, format!("ignored tag {}\n", tag));
        }
        PushedRef::Other => {
            warn!(git_ref = %event.git_ref, "push without a branch ref");
            return (
                StatusCode::BAD_REQUEST,
                format!("not a branch ref: '{}'\n", event.git_ref),
            );
        }
    };

    info!(
        repository = event.repository_name(),
        owner = event.owner_name(),
        branch,
        after = %event.after,
        "push received"
    );

    match handler.branch_pushed(branch).await {
        Ok(request) => (
            StatusCode::OK,
            format!("submitted job {} for {}\n", request.name, branch),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)),
    }
}

/// Serve `app` on `addr` until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "webhook listener started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
