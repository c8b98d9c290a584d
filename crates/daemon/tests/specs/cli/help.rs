// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help and version specs

use crate::prelude::*;

#[test]
fn version_prints_package_version() {
    previewd()
        .arg("version")
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn version_flag_matches_subcommand() {
    previewd()
        .arg("--version")
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn help_lists_subcommands() {
    previewd()
        .arg("--help")
        .passes()
        .stdout_has("runwebhookserver")
        .stdout_has("version");
}

#[test]
fn server_help_lists_flags() {
    previewd()
        .args(["runwebhookserver", "--help"])
        .passes()
        .stdout_has("--targetrepo")
        .stdout_has("--localdir")
        .stdout_has("--kubeconfigpath")
        .stdout_has("--initialbranch")
        .stdout_has("--config")
        .stdout_has("PREVIEWD_PORT");
}
