// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! previewd: rebuilds a static site on a cluster job for every branch push

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod webhook;

pub use config::{Cli, Command, ConfigError, LogOutput, ServerArgs, ServerSettings};
pub use lifecycle::{run, shutdown_on_signal, KubeServices, LifecycleError, Services};
pub use webhook::{router, serve, BranchHandler};
