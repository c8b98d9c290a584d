// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake change stream for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClusterEvent, ClusterSource, ClusterStream, SourceError, WatchScope};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

type EventSender = mpsc::Sender<Result<ClusterEvent, SourceError>>;

#[derive(Default)]
struct FakeStream {
    fail_sync: Option<String>,
    initial: Vec<ClusterEvent>,
    sender: Option<EventSender>,
    scopes: Vec<WatchScope>,
}

/// Fake cluster source; the test pushes events into the open stream
#[derive(Clone, Default)]
pub struct FakeClusterSource {
    inner: Arc<Mutex<FakeStream>>,
}

impl FakeClusterSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events queued before `watch` returns
    pub fn with_initial(self, events: Vec<ClusterEvent>) -> Self {
        self.lock().initial = events;
        self
    }

    /// Make `watch` fail its initial listing
    pub fn failing_sync(self, reason: &str) -> Self {
        self.lock().fail_sync = Some(reason.to_string());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeStream> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sender(&self) -> Option<EventSender> {
        self.lock().sender.clone()
    }

    /// Scopes passed to `watch`
    pub fn scopes(&self) -> Vec<WatchScope> {
        self.lock().scopes.clone()
    }

    /// Push an event into the open stream. Returns false if none is open.
    pub async fn emit(&self, event: ClusterEvent) -> bool {
        match self.sender() {
            Some(tx) => tx.send(Ok(event)).await.is_ok(),
            None => false,
        }
    }

    /// End the open stream with an error
    pub async fn break_stream(&self, reason: &str) {
        let sender = self.lock().sender.take();
        if let Some(tx) = sender {
            let _ = tx.send(Err(SourceError::Stream(reason.to_string()))).await;
        }
    }

    /// Close the open stream without an error
    pub fn close(&self) {
        self.lock().sender = None;
    }
}

#[async_trait]
impl ClusterSource for FakeClusterSource {
    async fn watch(&self, scope: &WatchScope) -> Result<ClusterStream, SourceError> {
        let mut stream = self.lock();
        stream.scopes.push(scope.clone());
        if let Some(reason) = &stream.fail_sync {
            return Err(SourceError::Sync(reason.clone()));
        }

        let (tx, rx) = mpsc::channel(stream.initial.len() + 64);
        for event in stream.initial.drain(..) {
            // Capacity covers the initial events
            let _ = tx.try_send(Ok(event));
        }
        stream.sender = Some(tx);
        Ok(rx)
    }
}
