// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pv_core::{Completion, ResourceState};

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<ResourceEvent>>>,
}

impl Recorder {
    fn events(&self) -> Vec<ResourceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl JobNotifier for Recorder {
    fn notify(&self, event: ResourceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn request(name: &str) -> JobRequest {
    JobRequest::new(name, "testns", "alpine")
}

#[tokio::test]
async fn succeed_script_reports_create_then_success() {
    let launcher = FakeLauncher::new().with_default_script(LaunchScript::Succeed);
    let recorder = Recorder::default();

    let handle = launcher
        .create_job(&request("alpinetest"), Arc::new(recorder.clone()))
        .await
        .unwrap();

    assert_eq!(handle.name, "alpinetest");
    assert!(handle.uid.is_some());

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].state, ResourceState::Create);
    assert_eq!(events[0].job.status.active, 1);
    assert_eq!(events[1].completion(), Some(Completion::Succeeded));
    assert!(launcher.in_progress());
}

#[tokio::test]
async fn fail_script_reports_failure() {
    let launcher = FakeLauncher::new().with_script("broken", LaunchScript::Fail);
    let recorder = Recorder::default();

    launcher
        .create_job(&request("broken"), Arc::new(recorder.clone()))
        .await
        .unwrap();

    let events = recorder.events();
    assert_eq!(events.last().unwrap().completion(), Some(Completion::Failed));
}

#[tokio::test]
async fn reject_script_records_call_but_creates_nothing() {
    let launcher =
        FakeLauncher::new().with_script("denied", LaunchScript::Reject("quota".to_string()));
    let recorder = Recorder::default();

    let result = launcher
        .create_job(&request("denied"), Arc::new(recorder.clone()))
        .await;

    assert!(matches!(result, Err(LaunchError::Rejected(reason)) if reason == "quota"));
    assert_eq!(launcher.created(), vec!["denied"]);
    assert!(recorder.events().is_empty());
    assert!(!launcher.in_progress());
}

#[tokio::test]
async fn delete_reports_deletion_and_clears_progress() {
    let launcher = FakeLauncher::new();
    let recorder = Recorder::default();

    launcher
        .create_job(&request("alpinetest"), Arc::new(recorder.clone()))
        .await
        .unwrap();
    launcher.delete_job("alpinetest", "testns").await.unwrap();

    assert!(!launcher.in_progress());
    assert_eq!(launcher.deleted(), vec!["alpinetest"]);
    assert_eq!(
        recorder.events().last().map(|e| e.state),
        Some(ResourceState::Delete)
    );

    // Nothing is registered any more
    assert!(!launcher.emit("alpinetest", JobStatus::default(), ResourceState::Update));
}

#[tokio::test]
async fn failed_job_clears_progress_without_deleting() {
    let launcher = FakeLauncher::new();
    launcher
        .create_job(&request("broken"), Arc::new(Recorder::default()))
        .await
        .unwrap();

    launcher.failed_job("broken", "testns").await;

    assert!(!launcher.in_progress());
    assert_eq!(launcher.failed(), vec!["broken"]);
    assert!(launcher.deleted().is_empty());
}

#[tokio::test]
async fn emit_drives_held_job() {
    let launcher = FakeLauncher::new();
    let recorder = Recorder::default();
    launcher
        .create_job(&request("held"), Arc::new(recorder.clone()))
        .await
        .unwrap();
    assert_eq!(recorder.events().len(), 1);

    assert!(launcher.emit("held", JobStatus::succeeded(1), ResourceState::Update));

    let events = recorder.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].job.namespace, "testns");
    assert_eq!(events[1].completion(), Some(Completion::Succeeded));
}

#[tokio::test]
async fn tracks_max_outstanding() {
    let launcher = FakeLauncher::new();
    for name in ["one", "two"] {
        launcher
            .create_job(&request(name), Arc::new(Recorder::default()))
            .await
            .unwrap();
    }
    launcher.delete_job("one", "testns").await.unwrap();

    assert_eq!(launcher.max_outstanding(), 2);
    assert!(launcher.in_progress());
}

#[tokio::test]
async fn wait_for_calls_times_out() {
    let launcher = FakeLauncher::new();
    assert!(
        !launcher
            .wait_for_calls(1, Duration::from_millis(20))
            .await
    );
}
