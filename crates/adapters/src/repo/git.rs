// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git working copy adapter

use super::{RepoAdapter, RepoError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Git-based working copy adapter rooted at `dir`
#[derive(Clone, Debug)]
pub struct GitAdapter {
    dir: PathBuf,
}

impl GitAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn git(&self, cwd: &Path, args: &[&str]) -> Result<String, RepoError> {
        let output = Command::new("git")
            .current_dir(cwd)
            .args(args)
            .output()
            .await
            .map_err(|e| RepoError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepoError::CommandFailed(format!(
                "git {}: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn require_clone(&self) -> Result<(), RepoError> {
        if self.is_cloned() {
            Ok(())
        } else {
            Err(RepoError::NotCloned(self.dir.display().to_string()))
        }
    }
}

#[async_trait]
impl RepoAdapter for GitAdapter {
    async fn clone_repo(&self, url: &str) -> Result<(), RepoError> {
        if self.dir.exists() {
            tokio::fs::remove_dir_all(&self.dir)
                .await
                .map_err(|e| RepoError::CommandFailed(e.to_string()))?;
        }
        let parent = match self.dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| RepoError::CommandFailed(e.to_string()))?;

        let target = self.dir.to_string_lossy();
        self.git(&parent, &["clone", url, &target]).await?;
        Ok(())
    }

    fn is_cloned(&self) -> bool {
        self.dir.join(".git").exists()
    }

    async fn reset(&self) -> Result<(), RepoError> {
        self.require_clone()?;
        self.git(&self.dir, &["reset", "--hard", "HEAD"]).await?;
        Ok(())
    }

    async fn checkout(&self, branch: &str) -> Result<(), RepoError> {
        self.require_clone()?;
        self.git(&self.dir, &["fetch", "--force", "origin"]).await?;
        let remote = format!("origin/{}", branch);
        self.git(&self.dir, &["checkout", "--force", "-B", branch, &remote])
            .await?;
        Ok(())
    }

    async fn pull(&self, branch: &str) -> Result<(), RepoError> {
        self.require_clone()?;
        self.git(&self.dir, &["pull", "--force", "origin", branch])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
