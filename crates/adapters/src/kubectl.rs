// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin `kubectl` command runner shared by the cluster adapters

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

/// Namespace used when a request leaves it empty
pub const DEFAULT_NAMESPACE: &str = "default";

/// Errors from invoking kubectl
#[derive(Debug, Error)]
pub enum KubectlError {
    #[error("kubectl i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("kubectl {args} failed: {stderr}")]
    Failed { args: String, stderr: String },
    #[error("unexpected kubectl output: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Map an empty namespace to the cluster default
pub fn effective_namespace(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}

/// Invokes kubectl, optionally against an explicit kubeconfig.
///
/// Without a kubeconfig kubectl falls back to its own discovery, which
/// covers the in-cluster service account.
#[derive(Clone, Debug)]
pub struct Kubectl {
    program: String,
    kubeconfig: Option<PathBuf>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Kubectl {
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self {
            program: "kubectl".to_string(),
            kubeconfig,
        }
    }

    /// Use a different executable (e.g. a wrapper script)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn kubeconfig(&self) -> Option<&PathBuf> {
        self.kubeconfig.as_ref()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(path) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(path);
        }
        cmd.args(args);
        cmd.kill_on_drop(true);
        cmd
    }

    /// Run to completion and return stdout
    pub async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>, KubectlError> {
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            // Closing stdin lets `kubectl ... -f -` see end of input
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(KubectlError::Failed {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Run to completion and decode stdout as JSON
    pub async fn run_json<T: DeserializeOwned>(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<T, KubectlError> {
        let stdout = self.run(args, stdin).await?;
        Ok(serde_json::from_slice(&stdout)?)
    }

    /// Start a long-running command with stdout piped (used for watches)
    pub fn spawn(&self, args: &[&str]) -> Result<Child, KubectlError> {
        let mut cmd = self.command(args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        Ok(cmd.spawn()?)
    }
}

/// Metadata common to every object kubectl returns
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: Option<String>,
}

/// A `kubectl get -o json` list
#[derive(Debug, Deserialize)]
pub struct ObjectList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Decodes a stream of concatenated JSON documents, as printed by
/// `kubectl get --watch -o json`.
pub struct JsonStream<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> JsonStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next complete document, or None once the reader is exhausted
    pub async fn next<T: DeserializeOwned>(&mut self) -> Option<Result<T, KubectlError>> {
        let mut chunk = [0u8; 8192];
        loop {
            let parsed = {
                let mut docs = serde_json::Deserializer::from_slice(&self.buf).into_iter::<T>();
                match docs.next() {
                    Some(result) => Some((result, docs.byte_offset())),
                    None => None,
                }
            };

            match parsed {
                Some((Ok(doc), consumed)) => {
                    self.buf.drain(..consumed);
                    return Some(Ok(doc));
                }
                Some((Err(e), _)) if !e.is_eof() => return Some(Err(e.into())),
                // Incomplete document or only whitespace buffered: read more
                _ => {}
            }

            match self.reader.read(&mut chunk).await {
                Ok(0) => return None,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
#[path = "kubectl_tests.rs"]
mod tests;
