// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Monitor;
use pv_adapters::{FakeClaims, FakeLauncher, FakeRepoAdapter, RepoCall, RepoError, RepoOp};
use RebuildState::*;

const NAMESPACE: &str = "jekyllpreviewv2";

fn claims() -> FakeClaims {
    FakeClaims::new()
        .with_claim(NAMESPACE, "jekyll-render-pvc")
        .with_claim(NAMESPACE, "jekyll-source-pvc")
}

struct Harness {
    monitor: Monitor,
    launcher: FakeLauncher,
}

impl Harness {
    fn start() -> Self {
        let launcher = FakeLauncher::new();
        let mut monitor = Monitor::new();
        monitor.start(launcher.clone());
        Self { monitor, launcher }
    }

    fn pipeline(
        &self,
        repo: FakeRepoAdapter,
        claims: FakeClaims,
    ) -> RebuildPipeline<FakeRepoAdapter, FakeClaims> {
        RebuildPipeline::new(repo, claims, self.monitor.submitter(), NAMESPACE)
    }

    /// Names the monitor has launched, after it drained its inputs
    async fn launched(&self) -> Vec<String> {
        self.monitor.status().await.unwrap();
        self.launcher.created()
    }
}

#[tokio::test]
async fn webhook_without_clone_submits_nothing() {
    let harness = Harness::start();
    let mut pipeline = harness.pipeline(FakeRepoAdapter::new(), claims());

    let result = pipeline.handle_webhook("main").await;

    assert!(matches!(
        result,
        Err(PipelineError::Repo(RepoError::NotCloned(_)))
    ));
    assert_eq!(pipeline.state(), Idle);
    assert_eq!(pipeline.last_run(), &[ResettingWorkingCopy]);
    assert!(harness.launched().await.is_empty());
}

#[tokio::test]
async fn webhook_for_new_branch_runs_every_stage() {
    let harness = Harness::start();
    let repo = FakeRepoAdapter::cloned();
    let mut pipeline = harness.pipeline(repo.clone(), claims());

    let request = pipeline.handle_webhook("drafts").await.unwrap();

    assert_eq!(
        pipeline.last_run(),
        &[
            ResettingWorkingCopy,
            SwitchingBranch,
            Pulling,
            ResolvingMounts,
            Submitted
        ]
    );
    assert_eq!(pipeline.state(), Idle);
    assert_eq!(pipeline.current_branch(), Some("drafts"));
    assert_eq!(
        repo.calls(),
        vec![
            RepoCall::Reset,
            RepoCall::Checkout {
                branch: "drafts".to_string()
            },
            RepoCall::Pull {
                branch: "drafts".to_string()
            },
        ]
    );

    assert_eq!(request.name, "jekyll-render-container");
    assert_eq!(request.namespace, NAMESPACE);
    assert_eq!(
        request.mount_refs,
        vec![
            MountRef::new("jekyll-render-pvc", "/site", false),
            MountRef::new("jekyll-source-pvc", "/src", true),
        ]
    );
    assert_eq!(harness.launched().await, vec!["jekyll-render-container"]);
}

#[tokio::test]
async fn webhook_for_current_branch_skips_switch() {
    let harness = Harness::start();
    let repo = FakeRepoAdapter::cloned();
    let mut pipeline = harness.pipeline(repo.clone(), claims());

    pipeline.handle_webhook("main").await.unwrap();
    pipeline.handle_webhook("main").await.unwrap();

    assert_eq!(
        pipeline.last_run(),
        &[ResettingWorkingCopy, Pulling, ResolvingMounts, Submitted]
    );
    let checkouts = repo
        .calls()
        .iter()
        .filter(|c| c.op() == RepoOp::Checkout)
        .count();
    assert_eq!(checkouts, 1);
}

#[tokio::test]
async fn missing_claim_aborts_before_submission() {
    let harness = Harness::start();
    let claims = FakeClaims::new().with_claim(NAMESPACE, "jekyll-source-pvc");
    let mut pipeline = harness.pipeline(FakeRepoAdapter::cloned(), claims);

    let result = pipeline.handle_webhook("main").await;

    assert!(matches!(
        result,
        Err(PipelineError::ClaimNotFound { ref fragment, .. }) if fragment == "render"
    ));
    assert_eq!(pipeline.state(), Idle);
    assert_eq!(pipeline.last_run().last(), Some(&ResolvingMounts));
    assert!(harness.launched().await.is_empty());
}

#[tokio::test]
async fn failed_pull_keeps_the_new_branch() {
    let harness = Harness::start();
    let repo = FakeRepoAdapter::cloned().failing(RepoOp::Pull, "remote hung up");
    let mut pipeline = harness.pipeline(repo, claims());

    let result = pipeline.handle_webhook("drafts").await;

    assert!(matches!(result, Err(PipelineError::Repo(_))));
    assert_eq!(pipeline.current_branch(), Some("drafts"));
    assert!(harness.launched().await.is_empty());
}

#[tokio::test]
async fn empty_branch_is_rejected() {
    let harness = Harness::start();
    let repo = FakeRepoAdapter::cloned();
    let mut pipeline = harness.pipeline(repo.clone(), claims());

    let result = pipeline.handle_webhook("").await;

    assert!(matches!(result, Err(PipelineError::EmptyBranch)));
    assert!(repo.calls().is_empty());
}

#[tokio::test]
async fn initial_clone_switches_to_initial_branch() {
    let harness = Harness::start();
    let repo = FakeRepoAdapter::new();
    let mut pipeline = harness.pipeline(repo.clone(), claims());

    pipeline
        .initial_clone("https://example.com/site.git", Some("main"))
        .await
        .unwrap();

    assert!(repo.is_cloned());
    assert_eq!(pipeline.current_branch(), Some("main"));

    // The first webhook for the same branch does not switch again
    pipeline.handle_webhook("main").await.unwrap();
    assert!(!pipeline.last_run().contains(&SwitchingBranch));
}

#[tokio::test]
async fn initial_build_submits_without_touching_the_working_copy() {
    let harness = Harness::start();
    let repo = FakeRepoAdapter::new();
    let build = BuildSpec {
        job_name: "site-build".to_string(),
        image: "alpine".to_string(),
        command: vec!["true".to_string()],
        args: Vec::new(),
        auto_delete: true,
    };
    let mut pipeline = harness.pipeline(repo.clone(), claims()).with_build(build);

    let request = pipeline.initial_build().await.unwrap();

    assert!(repo.calls().is_empty());
    assert!(request.auto_delete);
    assert_eq!(request.command, Some(vec!["true".to_string()]));
    assert_eq!(harness.launched().await, vec!["site-build"]);
}

#[tokio::test]
async fn closed_monitor_is_reported() {
    let mut harness = Harness::start();
    let mut pipeline = harness.pipeline(FakeRepoAdapter::cloned(), claims());
    harness.monitor.stop().await;

    let result = pipeline.handle_webhook("main").await;

    assert!(matches!(result, Err(PipelineError::Submit(_))));
}

#[test]
fn default_build_renders_jekyll() {
    let build = BuildSpec::default();
    assert_eq!(build.job_name, "jekyll-render-container");
    assert_eq!(build.command, vec!["sh", "-c", "--"]);
    assert!(build.args[0].contains("jekyll build -d /site"));
    assert!(build.image.contains("jekyllbuilder"));
    assert!(!build.auto_delete);
}
