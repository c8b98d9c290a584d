// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue monitor.
//!
//! One coordinating task owns the FIFO queue and the failure latch. It takes
//! one input at a time (a submission, a routed job event, or a control
//! request), applies it, and then tries to launch the head of the queue.
//! Launches go through a [`JobLauncher`]; at most one launched job is
//! outstanding at a time, as reported by `in_progress()`.
//!
//! The first job that fails latches the monitor: the job is left in place for
//! inspection and nothing else is scheduled until the process restarts.

use crate::error::MonitorError;
use pv_adapters::JobLauncher;
use pv_core::{Completion, JobNotifier, JobRequest, ResourceEvent, ResourceState};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcomes buffered per subscriber before it starts lagging
const OUTCOME_CAPACITY: usize = 64;

/// How a launched (or attempted) job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    Succeeded,
    Failed,
    LaunchFailed(String),
}

/// Completion signal broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub name: String,
    pub namespace: String,
    pub kind: OutcomeKind,
}

/// Point-in-time view of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    pub queued: usize,
    pub failure_latched: bool,
    pub in_progress: bool,
}

/// Why the coordinating loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// `stop` was requested
    Stopped,
    /// The resource watcher lost its stream
    WatchLost,
    /// The monitor was never started
    NotStarted,
    /// The loop task panicked or was cancelled
    Aborted,
}

/// A job event stamped with the launch it belongs to
#[derive(Debug)]
struct RoutedEvent {
    name: String,
    namespace: String,
    launch_id: u64,
    event: ResourceEvent,
}

enum Control {
    Status(oneshot::Sender<MonitorStatus>),
}

/// Receivers held until the loop starts
struct Inbox {
    submissions: mpsc::UnboundedReceiver<JobRequest>,
    events: mpsc::UnboundedReceiver<RoutedEvent>,
    control: mpsc::UnboundedReceiver<Control>,
}

/// Cloneable handle for submitting requests from other tasks
#[derive(Clone)]
pub struct JobSubmitter {
    tx: mpsc::UnboundedSender<JobRequest>,
}

impl JobSubmitter {
    /// Hand a request to the monitor. Never waits on cluster I/O.
    pub fn submit(&self, request: JobRequest) -> Result<(), MonitorError> {
        self.tx.send(request).map_err(|_| MonitorError::Closed)
    }
}

/// Forwards every event for one launched job into the loop
struct JobForwarder {
    name: String,
    namespace: String,
    launch_id: u64,
    tx: mpsc::UnboundedSender<RoutedEvent>,
}

impl JobNotifier for JobForwarder {
    fn notify(&self, event: ResourceEvent) {
        let routed = RoutedEvent {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            launch_id: self.launch_id,
            event,
        };
        if self.tx.send(routed).is_err() {
            debug!(job = %self.name, "monitor gone, dropping event");
        }
    }
}

/// Schedules build jobs one at a time
pub struct Monitor {
    submitter: JobSubmitter,
    event_tx: mpsc::UnboundedSender<RoutedEvent>,
    control_tx: mpsc::UnboundedSender<Control>,
    inbox: Option<Inbox>,
    outcomes: broadcast::Sender<JobOutcome>,
    stop: CancellationToken,
    task: Option<JoinHandle<MonitorExit>>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    pub fn new() -> Self {
        let (submit_tx, submissions) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (control_tx, control) = mpsc::unbounded_channel();
        let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);

        Self {
            submitter: JobSubmitter { tx: submit_tx },
            event_tx,
            control_tx,
            inbox: Some(Inbox {
                submissions,
                events,
                control,
            }),
            outcomes,
            stop: CancellationToken::new(),
            task: None,
        }
    }

    /// Handle for other tasks to submit through
    pub fn submitter(&self) -> JobSubmitter {
        self.submitter.clone()
    }

    /// Queue a request. Requests submitted before `start` run once it is called.
    pub fn submit(&self, request: JobRequest) -> Result<(), MonitorError> {
        self.submitter.submit(request)
    }

    /// Receive job outcomes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<JobOutcome> {
        self.outcomes.subscribe()
    }

    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    /// Start the coordinating loop. Must be called within a tokio runtime.
    pub fn start<L: JobLauncher>(&mut self, launcher: L) {
        self.start_watched(launcher, CancellationToken::new());
    }

    /// Start the coordinating loop, exiting if `watch` is cancelled
    pub fn start_watched<L: JobLauncher>(&mut self, launcher: L, watch: CancellationToken) {
        let Some(inbox) = self.inbox.take() else {
            warn!("monitor already started, ignoring start");
            return;
        };

        let state = MonitorLoop {
            launcher,
            queue: VecDeque::new(),
            failure_latched: false,
            tracked: HashMap::new(),
            launch_seq: 0,
            event_tx: self.event_tx.clone(),
            outcomes: self.outcomes.clone(),
        };
        let stop = self.stop.clone();
        self.task = Some(tokio::spawn(state.run(inbox, stop, watch)));
        info!("job monitor started");
    }

    /// Ask the loop for its current state
    pub async fn status(&self) -> Result<MonitorStatus, MonitorError> {
        if self.task.is_none() {
            return Err(MonitorError::NotRunning);
        }
        let (tx, rx) = oneshot::channel();
        self.control_tx
            .send(Control::Status(tx))
            .map_err(|_| MonitorError::NotRunning)?;
        rx.await.map_err(|_| MonitorError::NotRunning)
    }

    /// Stop the loop and wait for it to exit. Queued requests are discarded.
    pub async fn stop(&mut self) -> MonitorExit {
        self.stop.cancel();
        match self.task.take() {
            Some(task) => task.await.unwrap_or(MonitorExit::Aborted),
            None => MonitorExit::NotStarted,
        }
    }

    /// Wait for the loop to exit on its own (e.g. after losing the watch)
    pub async fn wait(&mut self) -> MonitorExit {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(MonitorExit::Aborted),
            None => MonitorExit::NotStarted,
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

struct Tracked {
    namespace: String,
    launch_id: u64,
    settled: bool,
}

/// State owned by the coordinating task
struct MonitorLoop<L> {
    launcher: L,
    queue: VecDeque<JobRequest>,
    failure_latched: bool,
    tracked: HashMap<String, Tracked>,
    launch_seq: u64,
    event_tx: mpsc::UnboundedSender<RoutedEvent>,
    outcomes: broadcast::Sender<JobOutcome>,
}

impl<L: JobLauncher> MonitorLoop<L> {
    async fn run(
        mut self,
        mut inbox: Inbox,
        stop: CancellationToken,
        watch: CancellationToken,
    ) -> MonitorExit {
        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => {
                    info!(discarded = self.queue.len(), "job monitor stopped");
                    return MonitorExit::Stopped;
                }

                _ = watch.cancelled() => {
                    error!("resource watch lost, job monitor exiting");
                    return MonitorExit::WatchLost;
                }

                Some(request) = inbox.submissions.recv() => {
                    self.enqueue(request);
                }

                Some(routed) = inbox.events.recv() => {
                    self.handle_event(routed).await;
                }

                Some(control) = inbox.control.recv() => {
                    self.answer(control);
                }
            }

            self.schedule_if_possible().await;
        }
    }

    fn enqueue(&mut self, request: JobRequest) {
        if !request.has_name() {
            warn!(image = %request.image, "ignoring job request without a name");
            return;
        }
        debug!(job = %request.name, queued = self.queue.len() + 1, "job queued");
        self.queue.push_back(request);
    }

    fn answer(&self, control: Control) {
        match control {
            Control::Status(reply) => {
                let _ = reply.send(MonitorStatus {
                    queued: self.queue.len(),
                    failure_latched: self.failure_latched,
                    in_progress: self.launcher.in_progress(),
                });
            }
        }
    }

    fn emit(&self, name: &str, namespace: &str, kind: OutcomeKind) {
        // No subscribers is fine
        let _ = self.outcomes.send(JobOutcome {
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
        });
    }

    async fn handle_event(&mut self, routed: RoutedEvent) {
        let RoutedEvent {
            name,
            namespace,
            launch_id,
            event,
        } = routed;

        let Some(tracked) = self.tracked.get_mut(&name) else {
            debug!(job = %name, state = %event.state, "event for untracked job");
            return;
        };
        if tracked.launch_id != launch_id {
            debug!(job = %name, state = %event.state, "event for a superseded launch");
            return;
        }

        if event.state == ResourceState::Delete {
            debug!(job = %name, "job deleted");
            self.tracked.remove(&name);
            return;
        }

        let Some(completion) = event.completion() else {
            debug!(
                job = %name,
                state = %event.state,
                active = event.job.status.active,
                "job state"
            );
            return;
        };
        if tracked.settled {
            debug!(job = %name, "repeat completion ignored");
            return;
        }
        tracked.settled = true;
        let namespace = if tracked.namespace.is_empty() {
            namespace
        } else {
            tracked.namespace.clone()
        };

        match completion {
            Completion::Failed => {
                error!(
                    job = %name,
                    namespace = %namespace,
                    failed = event.job.status.failed,
                    "job failed, halting scheduling"
                );
                self.failure_latched = true;
                self.launcher.failed_job(&name, &namespace).await;
                self.emit(&name, &namespace, OutcomeKind::Failed);
            }
            Completion::Succeeded => {
                info!(job = %name, namespace = %namespace, "job succeeded");
                if let Err(e) = self.launcher.delete_job(&name, &namespace).await {
                    error!(job = %name, error = %e, "failed to delete finished job");
                }
                self.emit(&name, &namespace, OutcomeKind::Succeeded);
            }
        }
    }

    /// Launch queued jobs while the launcher is idle and nothing has failed.
    ///
    /// A launch that errors drops its request and the pass moves on to the
    /// next one; a launch that succeeds ends the pass.
    async fn schedule_if_possible(&mut self) {
        loop {
            if self.queue.is_empty() {
                return;
            }
            if self.launcher.in_progress() {
                debug!(queued = self.queue.len(), "job in flight, waiting");
                return;
            }
            if self.failure_latched {
                debug!(queued = self.queue.len(), "scheduling halted by earlier failure");
                return;
            }
            let Some(request) = self.queue.pop_front() else {
                return;
            };

            if self.launch(request).await {
                return;
            }
            // Rejected: try the next request now rather than waiting for
            // another submission or completion to trigger a pass
        }
    }

    /// Returns true if the launcher accepted the job
    async fn launch(&mut self, request: JobRequest) -> bool {
        self.launch_seq += 1;
        let launch_id = self.launch_seq;

        // Track before creating: the launcher may report events immediately
        self.tracked.insert(
            request.name.clone(),
            Tracked {
                namespace: request.namespace.clone(),
                launch_id,
                settled: false,
            },
        );
        let notifier = Arc::new(JobForwarder {
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            launch_id,
            tx: self.event_tx.clone(),
        });

        match self.launcher.create_job(&request, notifier).await {
            Ok(handle) => {
                info!(
                    job = %handle.name,
                    namespace = %handle.namespace,
                    remaining = self.queue.len(),
                    "job launched"
                );
                if let Some(tracked) = self.tracked.get_mut(&request.name) {
                    if tracked.launch_id == launch_id && !handle.namespace.is_empty() {
                        tracked.namespace = handle.namespace;
                    }
                }
                true
            }
            Err(e) => {
                error!(job = %request.name, error = %e, "job launch failed, dropping request");
                if self
                    .tracked
                    .get(&request.name)
                    .is_some_and(|t| t.launch_id == launch_id)
                {
                    self.tracked.remove(&request.name);
                }
                self.emit(
                    &request.name,
                    &request.namespace,
                    OutcomeKind::LaunchFailed(e.to_string()),
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
