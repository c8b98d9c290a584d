// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! previewd scheduling engine

mod error;
mod monitor;
mod pipeline;
mod watcher;

pub use error::{MonitorError, PipelineError, WatchError};
pub use monitor::{JobOutcome, JobSubmitter, Monitor, MonitorExit, MonitorStatus, OutcomeKind};
pub use pipeline::{BuildSpec, RebuildPipeline, RebuildState};
pub use watcher::{Watcher, WatcherHandle};
