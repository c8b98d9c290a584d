// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup specs that need no cluster

use crate::prelude::*;
use tempfile::TempDir;

/// Upstream repository with one commit on `main` and one on `preview`
fn upstream() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "--quiet", "--initial-branch=main"]);
    std::fs::write(dir.path().join("index.md"), "# home\n").unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "--quiet", "-m", "home"]);
    git(dir.path(), &["branch", "preview"]);
    dir
}

#[test]
fn clone_only_checks_out_initial_branch() {
    if !git_available() {
        return;
    }
    let upstream = upstream();
    let local = TempDir::new().unwrap();

    previewd()
        .args(["runwebhookserver", "-c", "-b=false", "-w=false"])
        .args(["--initialbranch", "preview"])
        .arg("-t")
        .arg(upstream.path())
        .arg("-d")
        .arg(local.path())
        .passes();

    let source = local.path().join("source");
    assert!(source.join("index.md").exists());
    let head = std::process::Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(&source)
        .output()
        .unwrap();
    let head = String::from_utf8_lossy(&head.stdout);
    assert!(head.trim() == "preview" || head.trim() == "HEAD");
}

#[test]
fn nothing_requested_exits_cleanly() {
    let local = TempDir::new().unwrap();

    previewd()
        .args(["runwebhookserver", "-t", "repo", "-b=false", "-w=false"])
        .arg("-d")
        .arg(local.path())
        .passes();

    assert!(!local.path().join("source").exists());
}

#[test]
fn clone_failure_exits_with_error() {
    if !git_available() {
        return;
    }
    let local = TempDir::new().unwrap();
    let missing = local.path().join("no-such-repo");

    previewd()
        .args(["runwebhookserver", "-c", "-b=false", "-w=false"])
        .arg("-t")
        .arg(&missing)
        .arg("-d")
        .arg(local.path())
        .fails();
}

#[test]
fn log_file_receives_output() {
    let local = TempDir::new().unwrap();
    let logfile = local.path().join("logs").join("previewd.log");

    previewd()
        .args(["runwebhookserver", "-t", "repo", "-b=false", "-w=false", "-l", "info"])
        .arg("-d")
        .arg(local.path())
        .arg("--logfile")
        .arg(&logfile)
        .passes();

    let contents = std::fs::read_to_string(&logfile).unwrap();
    assert!(contents.contains("starting previewd"));
}
