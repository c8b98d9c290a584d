// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{Monitor, MonitorExit};
use pv_adapters::{FakeClusterSource, FakeLauncher};
use pv_core::{
    JobNotifier, JobSnapshot, JobStatus, NamespaceEvent, NamespaceNotifier, ResourceEvent,
    ResourceState,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[derive(Clone, Default)]
struct Recorder {
    jobs: Arc<Mutex<Vec<ResourceEvent>>>,
    namespaces: Arc<Mutex<Vec<NamespaceEvent>>>,
}

impl Recorder {
    fn jobs(&self) -> Vec<ResourceEvent> {
        self.jobs.lock().unwrap().clone()
    }

    fn namespaces(&self) -> Vec<NamespaceEvent> {
        self.namespaces.lock().unwrap().clone()
    }

    async fn wait_for(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.jobs.lock().unwrap().len() + self.namespaces.lock().unwrap().len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {} events",
                count
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl JobNotifier for Recorder {
    fn notify(&self, event: ResourceEvent) {
        self.jobs.lock().unwrap().push(event);
    }
}

impl NamespaceNotifier for Recorder {
    fn notify(&self, event: NamespaceEvent) {
        self.namespaces.lock().unwrap().push(event);
    }
}

fn job_event(name: &str, status: JobStatus, state: ResourceState) -> ClusterEvent {
    ClusterEvent::Job(ResourceEvent::new(
        JobSnapshot::new(name, "testns").with_status(status),
        state,
    ))
}

#[tokio::test]
async fn sync_failure_is_reported() {
    let source = FakeClusterSource::new().failing_sync("forbidden");
    let result = Watcher::watch(&source, NotifierRegistry::new(), WatchScope::new("testns")).await;
    assert!(matches!(result, Err(WatchError::SyncFailed(_))));
}

#[tokio::test]
async fn routes_job_events_by_name_and_unregisters_on_delete() {
    let source = FakeClusterSource::new();
    let registry = NotifierRegistry::new();
    let recorder = Recorder::default();
    registry.register("alpinetest", Arc::new(recorder.clone()));

    let handle = Watcher::watch(&source, registry.clone(), WatchScope::new("testns"))
        .await
        .unwrap();
    assert_eq!(source.scopes(), vec![WatchScope::new("testns")]);

    source
        .emit(job_event("alpinetest", JobStatus::active(1), ResourceState::Create))
        .await;
    source
        .emit(job_event("unrelated", JobStatus::active(1), ResourceState::Create))
        .await;
    source
        .emit(job_event("alpinetest", JobStatus::succeeded(1), ResourceState::Update))
        .await;
    source
        .emit(job_event("alpinetest", JobStatus::default(), ResourceState::Delete))
        .await;
    recorder.wait_for(3).await;

    let states: Vec<_> = recorder.jobs().iter().map(|e| e.state).collect();
    assert_eq!(
        states,
        vec![ResourceState::Create, ResourceState::Update, ResourceState::Delete]
    );
    assert!(!registry.is_registered("alpinetest"));
    assert!(!handle.is_lost());

    handle.close().await;
}

#[tokio::test]
async fn initial_events_are_routed_first() {
    let source = FakeClusterSource::new().with_initial(vec![job_event(
        "alpinetest",
        JobStatus::active(1),
        ResourceState::Create,
    )]);
    let registry = NotifierRegistry::new();
    let recorder = Recorder::default();
    registry.register("alpinetest", Arc::new(recorder.clone()));

    let handle = Watcher::watch(&source, registry, WatchScope::new("testns"))
        .await
        .unwrap();
    recorder.wait_for(1).await;

    assert_eq!(recorder.jobs()[0].state, ResourceState::Create);
    handle.close().await;
}

#[tokio::test]
async fn pod_events_reach_no_notifier() {
    let source = FakeClusterSource::new();
    let registry = NotifierRegistry::new();
    let recorder = Recorder::default();
    registry.register("alpinetest", Arc::new(recorder.clone()));

    let handle = Watcher::watch(&source, registry.clone(), WatchScope::new("testns"))
        .await
        .unwrap();
    source
        .emit(ClusterEvent::Pod {
            name: "alpinetest".to_string(),
            namespace: "testns".to_string(),
            state: ResourceState::Delete,
        })
        .await;
    source
        .emit(job_event("alpinetest", JobStatus::active(1), ResourceState::Update))
        .await;
    recorder.wait_for(1).await;

    assert_eq!(recorder.jobs().len(), 1);
    assert!(registry.is_registered("alpinetest"));
    handle.close().await;
}

#[tokio::test]
async fn namespace_events_go_to_namespace_notifiers() {
    let source = FakeClusterSource::new();
    let registry = NotifierRegistry::new();
    let recorder = Recorder::default();
    registry.register_namespace("previews", Arc::new(recorder.clone()));

    let scope = WatchScope::new("").with_namespaces(true);
    let handle = Watcher::watch(&source, registry, scope.clone()).await.unwrap();
    assert_eq!(source.scopes(), vec![scope]);

    for state in [ResourceState::Create, ResourceState::Delete] {
        source
            .emit(ClusterEvent::Namespace(NamespaceEvent {
                name: "previews".to_string(),
                state,
            }))
            .await;
    }
    recorder.wait_for(2).await;

    let states: Vec<_> = recorder.namespaces().iter().map(|e| e.state).collect();
    assert_eq!(states, vec![ResourceState::Create, ResourceState::Delete]);
    handle.close().await;
}

#[tokio::test]
async fn broken_stream_cancels_the_token() {
    let source = FakeClusterSource::new();
    let handle = Watcher::watch(&source, NotifierRegistry::new(), WatchScope::new("testns"))
        .await
        .unwrap();
    let token = handle.token();

    source.break_stream("connection reset").await;

    tokio::time::timeout(WAIT, token.cancelled())
        .await
        .expect("token cancelled");
    assert!(handle.is_lost());
}

#[tokio::test]
async fn closed_stream_cancels_the_token() {
    let source = FakeClusterSource::new();
    let handle = Watcher::watch(&source, NotifierRegistry::new(), WatchScope::new("testns"))
        .await
        .unwrap();

    source.close();

    tokio::time::timeout(WAIT, handle.token().cancelled())
        .await
        .expect("token cancelled");
}

#[tokio::test]
async fn close_stops_routing() {
    let source = FakeClusterSource::new();
    let handle = Watcher::watch(&source, NotifierRegistry::new(), WatchScope::new("testns"))
        .await
        .unwrap();
    let token = handle.token();

    tokio::time::timeout(WAIT, handle.close())
        .await
        .expect("close in time");

    assert!(token.is_cancelled());
    assert!(!source.emit(job_event("late", JobStatus::default(), ResourceState::Create)).await);
}

#[tokio::test]
async fn lost_watch_stops_a_watched_monitor() {
    let source = FakeClusterSource::new();
    let handle = Watcher::watch(&source, NotifierRegistry::new(), WatchScope::new("testns"))
        .await
        .unwrap();
    let mut monitor = Monitor::new();
    monitor.start_watched(FakeLauncher::new(), handle.token());

    source.break_stream("apiserver went away").await;

    let exit = tokio::time::timeout(WAIT, monitor.wait())
        .await
        .expect("monitor exits");
    assert_eq!(exit, MonitorExit::WatchLost);
}
