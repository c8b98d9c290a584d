// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name-keyed notifier registry for routing resource events

use crate::event::{NamespaceEvent, ResourceEvent, ResourceState};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Receives state changes for one job
pub trait JobNotifier: Send + Sync {
    fn notify(&self, event: ResourceEvent);

    /// Whether `event` belongs to the job instance this notifier follows.
    /// A job name can be reused; events for an earlier instance are dropped.
    fn tracks(&self, _event: &ResourceEvent) -> bool {
        true
    }
}

/// Receives state changes for one namespace
pub trait NamespaceNotifier: Send + Sync {
    fn notify(&self, event: NamespaceEvent);
}

type JobTable = HashMap<String, Arc<dyn JobNotifier>>;
type NamespaceTable = HashMap<String, Arc<dyn NamespaceNotifier>>;

/// Routes resource events to the notifier registered under the resource name.
///
/// Shared between the launcher, which registers a notifier when it creates a
/// job, and the watcher, which looks notifiers up for every event and drops
/// job registrations once the job is deleted. At most one notifier is live
/// per name; registering a live name replaces the previous notifier.
#[derive(Clone, Default)]
pub struct NotifierRegistry {
    jobs: Arc<RwLock<JobTable>>,
    namespaces: Arc<RwLock<NamespaceTable>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job notifier. Returns true if a live registration was replaced.
    pub fn register(&self, name: &str, notifier: Arc<dyn JobNotifier>) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let replaced = jobs.insert(name.to_string(), notifier).is_some();
        if replaced {
            tracing::warn!(job = name, "replaced live notifier registration");
        }
        replaced
    }

    /// Remove a job notifier without delivering anything to it
    pub fn unregister(&self, name: &str) -> bool {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        jobs.remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Number of live job registrations
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a job event to its notifier, if one is registered.
    ///
    /// Events the notifier does not track are dropped and leave the
    /// registration alone. A tracked `Delete` removes the registration. The
    /// notifier is invoked outside the lock so it may register or unregister
    /// names itself. Returns true if a notifier received the event.
    pub fn dispatch(&self, event: ResourceEvent) -> bool {
        let notifier = {
            let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
            let tracked = jobs.get(event.name()).map(|n| n.tracks(&event));
            match tracked {
                None => None,
                Some(false) => {
                    tracing::debug!(
                        job = event.name(),
                        uid = ?event.job.uid,
                        "dropping event for an earlier job instance"
                    );
                    return false;
                }
                Some(true) if event.state == ResourceState::Delete => jobs.remove(event.name()),
                Some(true) => jobs.get(event.name()).cloned(),
            }
        };

        match notifier {
            Some(notifier) => {
                notifier.notify(event);
                true
            }
            None => false,
        }
    }

    pub fn register_namespace(&self, name: &str, notifier: Arc<dyn NamespaceNotifier>) {
        let mut namespaces = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
        namespaces.insert(name.to_string(), notifier);
    }

    /// Deliver a namespace event. Namespace registrations outlive deletes so
    /// a caller can observe a namespace being removed and recreated.
    pub fn dispatch_namespace(&self, event: NamespaceEvent) -> bool {
        let notifier = self
            .namespaces
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event.name)
            .cloned();

        match notifier {
            Some(notifier) => {
                notifier.notify(event);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
