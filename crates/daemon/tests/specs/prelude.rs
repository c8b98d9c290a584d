// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for binary specs

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const ENV_VARS: &[&str] = &[
    "RUST_LOG",
    "PREVIEWD_LOGLEVEL",
    "PREVIEWD_LOGOUTPUT",
    "PREVIEWD_LOGFILE",
    "PREVIEWD_CONFIG",
    "PREVIEWD_TARGETREPO",
    "PREVIEWD_LOCALDIR",
    "PREVIEWD_KUBECONFIGPATH",
    "PREVIEWD_NAMESPACE",
    "PREVIEWD_INITIALBRANCH",
    "PREVIEWD_INITIALCLONE",
    "PREVIEWD_INITIALBUILD",
    "PREVIEWD_WEBHOOKLISTEN",
    "PREVIEWD_PORT",
];

/// The binary with a clean environment
pub fn previewd() -> Command {
    let mut cmd = Command::cargo_bin("previewd").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.timeout(std::time::Duration::from_secs(30));
    cmd
}

pub trait Expect {
    fn passes(&mut self) -> Assert;
    fn fails(&mut self) -> Assert;
}

impl Expect for Command {
    fn passes(&mut self) -> Assert {
        self.assert().success()
    }

    fn fails(&mut self) -> Assert {
        self.assert().failure()
    }
}

pub trait OutputHas {
    fn stdout_has(self, text: &str) -> Self;
    fn stderr_has(self, text: &str) -> Self;
}

impl OutputHas for Assert {
    fn stdout_has(self, text: &str) -> Self {
        self.stdout(predicate::str::contains(text))
    }

    fn stderr_has(self, text: &str) -> Self {
        self.stderr(predicate::str::contains(text))
    }
}

pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure
pub fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "previewd")
        .env("GIT_AUTHOR_EMAIL", "previewd@example.com")
        .env("GIT_COMMITTER_NAME", "previewd")
        .env("GIT_COMMITTER_EMAIL", "previewd@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}
