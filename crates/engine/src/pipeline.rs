// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuild pipeline: bring the working copy to a branch and submit a build

use crate::error::PipelineError;
use crate::monitor::JobSubmitter;
use pv_adapters::{ClaimResolver, RepoAdapter};
use pv_core::{JobRequest, MountRef};
use tracing::{debug, info};

/// Claim fragment and mount for the rendered site
pub const RENDER_CLAIM: &str = "render";
pub const RENDER_MOUNT: &str = "/site";

/// Claim fragment and mount for the site source
pub const SOURCE_CLAIM: &str = "source";
pub const SOURCE_MOUNT: &str = "/src";

/// The containerized build a rebuild submits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub job_name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub auto_delete: bool,
}

impl Default for BuildSpec {
    /// Jekyll render job
    fn default() -> Self {
        let image = if cfg!(target_arch = "x86_64") {
            "registry.hub.docker.com/clarkezone/jekyllbuilder:0.0.1.8"
        } else {
            "registry.dev.clarkezone.dev/jekyllbuilder:arm"
        };
        Self {
            job_name: "jekyll-render-container".to_string(),
            image: image.to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), "--".to_string()],
            args: vec![
                "cd source;bundle install;bundle exec jekyll build -d /site JEKYLL_ENV=production"
                    .to_string(),
            ],
            auto_delete: false,
        }
    }
}

/// Stage of a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Idle,
    ResettingWorkingCopy,
    SwitchingBranch,
    Pulling,
    ResolvingMounts,
    Submitted,
}

/// Turns branch notifications into build submissions
pub struct RebuildPipeline<R, C> {
    repo: R,
    claims: C,
    submitter: JobSubmitter,
    namespace: String,
    build: BuildSpec,
    current_branch: Option<String>,
    state: RebuildState,
    last_run: Vec<RebuildState>,
}

impl<R: RepoAdapter, C: ClaimResolver> RebuildPipeline<R, C> {
    pub fn new(repo: R, claims: C, submitter: JobSubmitter, namespace: impl Into<String>) -> Self {
        Self {
            repo,
            claims,
            submitter,
            namespace: namespace.into(),
            build: BuildSpec::default(),
            current_branch: None,
            state: RebuildState::Idle,
            last_run: Vec::new(),
        }
    }

    pub fn with_build(mut self, build: BuildSpec) -> Self {
        self.build = build;
        self
    }

    pub fn state(&self) -> RebuildState {
        self.state
    }

    /// Branch the working copy is on, once known
    pub fn current_branch(&self) -> Option<&str> {
        self.current_branch.as_deref()
    }

    /// States entered by the most recent rebuild, in order
    pub fn last_run(&self) -> &[RebuildState] {
        &self.last_run
    }

    fn enter(&mut self, state: RebuildState) {
        debug!(from = ?self.state, to = ?state, "rebuild state");
        self.state = state;
        if state != RebuildState::Idle {
            self.last_run.push(state);
        }
    }

    /// Clone the repository and switch to `branch` if one is given
    pub async fn initial_clone(
        &mut self,
        url: &str,
        branch: Option<&str>,
    ) -> Result<(), PipelineError> {
        info!(url, "initial clone");
        self.repo.clone_repo(url).await?;
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            self.repo.checkout(branch).await?;
            self.current_branch = Some(branch.to_string());
        }
        Ok(())
    }

    /// Submit a build of the working copy as it is
    pub async fn initial_build(&mut self) -> Result<JobRequest, PipelineError> {
        let request = self.build_request().await?;
        self.submitter.submit(request.clone())?;
        info!(job = %request.name, "initial build submitted");
        Ok(request)
    }

    /// Rebuild for a push to `branch`.
    ///
    /// Nothing is submitted unless every stage succeeds. The pipeline is
    /// back in `Idle` when this returns, whatever the outcome.
    pub async fn handle_webhook(&mut self, branch: &str) -> Result<JobRequest, PipelineError> {
        if branch.is_empty() {
            return Err(PipelineError::EmptyBranch);
        }

        self.last_run.clear();
        let result = self.rebuild(branch).await;
        self.enter(RebuildState::Idle);

        match &result {
            Ok(request) => info!(branch, job = %request.name, "rebuild submitted"),
            Err(e) => tracing::error!(branch, error = %e, "rebuild aborted"),
        }
        result
    }

    async fn rebuild(&mut self, branch: &str) -> Result<JobRequest, PipelineError> {
        self.enter(RebuildState::ResettingWorkingCopy);
        self.repo.reset().await?;

        if self.current_branch.as_deref() != Some(branch) {
            self.enter(RebuildState::SwitchingBranch);
            self.repo.checkout(branch).await?;
            self.current_branch = Some(branch.to_string());
        }

        self.enter(RebuildState::Pulling);
        self.repo.pull(branch).await?;

        self.enter(RebuildState::ResolvingMounts);
        let request = self.build_request().await?;

        self.submitter.submit(request.clone())?;
        self.enter(RebuildState::Submitted);
        Ok(request)
    }

    async fn resolve_claim(&self, fragment: &str) -> Result<String, PipelineError> {
        self.claims
            .find_claim_by_name(fragment, &self.namespace)
            .await?
            .ok_or_else(|| PipelineError::ClaimNotFound {
                fragment: fragment.to_string(),
                namespace: self.namespace.clone(),
            })
    }

    async fn build_request(&self) -> Result<JobRequest, PipelineError> {
        let render = self.resolve_claim(RENDER_CLAIM).await?;
        let source = self.resolve_claim(SOURCE_CLAIM).await?;

        Ok(
            JobRequest::new(&self.build.job_name, &self.namespace, &self.build.image)
                .with_command(self.build.command.iter().cloned())
                .with_args(self.build.args.iter().cloned())
                .with_mounts(vec![
                    MountRef::new(render, RENDER_MOUNT, false),
                    MountRef::new(source, SOURCE_MOUNT, true),
                ])
                .with_auto_delete(self.build.auto_delete),
        )
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
