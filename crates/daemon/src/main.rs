// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preview daemon (previewd)
//!
//! Clones the site repository, submits build jobs to the cluster and
//! rebuilds on every branch push delivered by webhook.

use anyhow::Context;
use clap::CommandFactory;
use tracing::{error, info};

use pv_daemon::config::{Cli, Command};
use pv_daemon::lifecycle::{self, DaemonServices};
use pv_daemon::logging::setup_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Cli::command().get_matches();
    let (cli, config_file) =
        Cli::from_matches_with_file(&matches).context("loading configuration")?;
    let _log_guard = setup_logging(&cli.loglevel, cli.logoutput, cli.logfile.as_deref())?;
    if let Some(path) = &config_file {
        info!(path = %path.display(), "using config file");
    }

    match cli.command {
        Command::Version => {
            println!("previewd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::RunWebhookServer(args) => {
            let settings = args.validate().context("invalid configuration")?;
            info!(
                repo = %settings.target_repo,
                dir = %settings.local_dir.display(),
                namespace = %settings.namespace,
                clone = settings.initial_clone,
                build = settings.initial_build,
                listen = settings.webhook_listen,
                "starting previewd"
            );

            let shutdown =
                lifecycle::shutdown_on_signal().context("installing signal handlers")?;
            let services = DaemonServices::for_settings(&settings);
            if let Err(e) = lifecycle::run(&settings, services, shutdown).await {
                error!(error = %e, "previewd stopped with an error");
                return Err(e.into());
            }
            info!("previewd stopped");
            Ok(())
        }
    }
}
