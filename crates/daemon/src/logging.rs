// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup

use crate::config::LogOutput;
use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Console output goes to stderr in
/// the chosen format; with `logfile`, a plain copy is appended to that file.
/// The returned guard must be held until exit so the file writer flushes.
pub fn setup_logging(
    level: &str,
    output: LogOutput,
    logfile: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{}'", level))?,
    };

    let tty = matches!(output, LogOutput::Tty)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_ansi(true));
    let plain = matches!(output, LogOutput::Plain)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_ansi(false));
    let json = matches!(output, LogOutput::Json)
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    let (file, guard) = match logfile {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let name = path
                .file_name()
                .with_context(|| format!("log file '{}' has no file name", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory '{}'", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tty)
        .with(plain)
        .with(json)
        .with(file)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
