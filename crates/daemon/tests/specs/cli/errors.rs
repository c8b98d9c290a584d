// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration error specs

use crate::prelude::*;

#[test]
fn missing_subcommand_fails() {
    previewd().fails().stderr_has("Usage");
}

#[test]
fn unknown_subcommand_fails() {
    previewd().arg("serve").fails().stderr_has("unrecognized subcommand");
}

#[test]
fn empty_target_repo_is_rejected() {
    previewd()
        .args(["runwebhookserver", "-d", "/tmp/previewd"])
        .fails()
        .stderr_has("target repo is empty");
}

#[test]
fn empty_local_dir_is_rejected() {
    previewd()
        .args(["runwebhookserver", "-t", "https://example.com/site.git"])
        .fails()
        .stderr_has("local dir is empty");
}

#[test]
fn zero_port_is_rejected() {
    previewd()
        .args(["runwebhookserver", "-t", "repo", "-d", "/tmp/pv", "--port", "0"])
        .fails()
        .stderr_has("bad port");
}

#[test]
fn environment_supplies_flags() {
    previewd()
        .args(["runwebhookserver", "-d", "/tmp/pv"])
        .env("PREVIEWD_TARGETREPO", "repo")
        .env("PREVIEWD_PORT", "0")
        .fails()
        .stderr_has("bad port");
}

#[test]
fn bad_log_level_is_rejected() {
    previewd()
        .args(["version", "--loglevel", "previewd=loud"])
        .fails()
        .stderr_has("invalid log level");
}

#[test]
fn missing_config_file_is_rejected() {
    previewd()
        .args(["--config", "/nonexistent/previewd.toml", "version"])
        .fails()
        .stderr_has("reading config file");
}

#[test]
fn config_file_supplies_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("previewd.toml");
    std::fs::write(&path, "targetrepo = \"repo\"\nport = 0\n").unwrap();

    previewd()
        .args(["runwebhookserver", "-d", "/tmp/pv", "--config"])
        .arg(&path)
        .fails()
        .stderr_has("bad port");
}
