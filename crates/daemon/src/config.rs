// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line and environment configuration

use clap::builder::BoolishValueParser;
use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, Args, FromArgMatches, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_BRANCH: &str = "main";

/// Subdirectory of the local dir holding the working copy
pub const SOURCE_DIR: &str = "source";

/// Config file looked up in the home directory when `--config` is not given
pub const CONFIG_FILE: &str = ".previewd.toml";

#[derive(Parser, Debug)]
#[command(
    name = "previewd",
    version,
    about = "Rebuild preview sites on cluster jobs when a branch is pushed"
)]
pub struct Cli {
    /// Log verbosity: error, warn, info, debug or trace (RUST_LOG overrides)
    #[arg(
        short = 'l',
        long = "loglevel",
        global = true,
        env = "PREVIEWD_LOGLEVEL",
        default_value = "warn"
    )]
    pub loglevel: String,

    /// Console log format
    #[arg(
        long = "logoutput",
        global = true,
        env = "PREVIEWD_LOGOUTPUT",
        value_enum,
        default_value_t = LogOutput::Tty
    )]
    pub logoutput: LogOutput,

    /// Also write logs to this file
    #[arg(long = "logfile", global = true, env = "PREVIEWD_LOGFILE")]
    pub logfile: Option<PathBuf>,

    /// Config file (default is $HOME/.previewd.toml)
    #[arg(long = "config", global = true, env = "PREVIEWD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone, build and listen for push webhooks
    #[command(name = "runwebhookserver")]
    RunWebhookServer(ServerArgs),
    /// Print the version
    Version,
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Human readable, colored
    Tty,
    /// Human readable, no color
    Plain,
    /// One JSON object per line
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// URL of the site repository to clone
    #[arg(short = 't', long = "targetrepo", env = "PREVIEWD_TARGETREPO", default_value = "")]
    pub targetrepo: String,

    /// Local directory the working copy lives under
    #[arg(short = 'd', long = "localdir", env = "PREVIEWD_LOCALDIR", default_value = "")]
    pub localdir: String,

    /// Kubeconfig to use; defaults to ~/.kube/config, then in-cluster credentials
    #[arg(short = 'k', long = "kubeconfigpath", env = "PREVIEWD_KUBECONFIGPATH")]
    pub kubeconfigpath: Option<PathBuf>,

    /// Namespace build jobs run in
    #[arg(short = 'n', long = "namespace", env = "PREVIEWD_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Branch to switch to after the initial clone
    #[arg(long = "initialbranch", env = "PREVIEWD_INITIALBRANCH", default_value = DEFAULT_BRANCH)]
    pub initialbranch: String,

    /// Clone the repository at startup
    #[arg(
        short = 'c',
        long = "initialclone",
        env = "PREVIEWD_INITIALCLONE",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub initialclone: bool,

    /// Build the site at startup
    #[arg(
        short = 'b',
        long = "initialbuild",
        env = "PREVIEWD_INITIALBUILD",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub initialbuild: bool,

    /// Listen for webhooks
    #[arg(
        short = 'w',
        long = "webhooklisten",
        env = "PREVIEWD_WEBHOOKLISTEN",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub webhooklisten: bool,

    /// Webhook listener port
    #[arg(long = "port", env = "PREVIEWD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bad port")]
    BadPort,
    #[error("target repo is empty")]
    TargetRepoEmpty,
    #[error("local dir is empty")]
    LocalDirEmpty,
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("reading config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Args(#[from] clap::Error),
}

/// Settings read from the config file.
///
/// Keys are the long flag names. A value here applies only when the option
/// was given neither on the command line nor through its environment
/// variable.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub loglevel: Option<String>,
    pub logoutput: Option<LogOutput>,
    pub logfile: Option<PathBuf>,
    pub targetrepo: Option<String>,
    pub localdir: Option<String>,
    pub kubeconfigpath: Option<PathBuf>,
    pub namespace: Option<String>,
    pub initialbranch: Option<String>,
    pub initialclone: Option<bool>,
    pub initialbuild: Option<bool>,
    pub webhooklisten: Option<bool>,
    pub port: Option<u16>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply(self, cli: &mut Cli, matches: &ArgMatches) {
        fill(matches, "loglevel", &mut cli.loglevel, self.loglevel);
        fill(matches, "logoutput", &mut cli.logoutput, self.logoutput);
        fill(matches, "logfile", &mut cli.logfile, self.logfile.map(Some));

        let Command::RunWebhookServer(args) = &mut cli.command else {
            return;
        };
        let Some(matches) = matches.subcommand_matches("runwebhookserver") else {
            return;
        };
        fill(matches, "targetrepo", &mut args.targetrepo, self.targetrepo);
        fill(matches, "localdir", &mut args.localdir, self.localdir);
        fill(
            matches,
            "kubeconfigpath",
            &mut args.kubeconfigpath,
            self.kubeconfigpath.map(Some),
        );
        fill(matches, "namespace", &mut args.namespace, self.namespace);
        fill(matches, "initialbranch", &mut args.initialbranch, self.initialbranch);
        fill(matches, "initialclone", &mut args.initialclone, self.initialclone);
        fill(matches, "initialbuild", &mut args.initialbuild, self.initialbuild);
        fill(matches, "webhooklisten", &mut args.webhooklisten, self.webhooklisten);
        fill(matches, "port", &mut args.port, self.port);
    }
}

/// Overwrite `target` with `value` unless the option was set explicitly
fn fill<T>(matches: &ArgMatches, id: &str, target: &mut T, value: Option<T>) {
    let explicit = matches!(
        matches.value_source(id),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    );
    if let Some(value) = value.filter(|_| !explicit) {
        *target = value;
    }
}

impl Cli {
    /// Build the command line from parsed `matches`, layering the config
    /// file under it.
    ///
    /// Precedence is flags, then environment, then file, then built-in
    /// defaults. An explicit `--config` must exist; the home directory file
    /// is optional. Returns the file that was read, if any.
    pub fn from_matches_with_file(
        matches: &ArgMatches,
    ) -> Result<(Self, Option<PathBuf>), ConfigFileError> {
        let mut cli = Self::from_arg_matches(matches)?;
        let path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => default_config_file(),
        };
        if let Some(path) = &path {
            FileConfig::read(path)?.apply(&mut cli, matches);
        }
        Ok((cli, path))
    }
}

/// `~/.previewd.toml` if it exists
fn default_config_file() -> Option<PathBuf> {
    let path = dirs::home_dir()?.join(CONFIG_FILE);
    path.exists().then_some(path)
}

/// Validated server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub target_repo: String,
    pub local_dir: PathBuf,
    pub kubeconfig: Option<PathBuf>,
    pub namespace: String,
    pub initial_branch: String,
    pub initial_clone: bool,
    pub initial_build: bool,
    pub webhook_listen: bool,
    pub port: u16,
}

impl ServerSettings {
    /// Directory the working copy is cloned into
    pub fn source_dir(&self) -> PathBuf {
        self.local_dir.join(SOURCE_DIR)
    }

    /// A cluster connection is only needed to build or to listen
    pub fn needs_cluster(&self) -> bool {
        self.initial_build || self.webhook_listen
    }
}

impl ServerArgs {
    pub fn validate(self) -> Result<ServerSettings, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::BadPort);
        }
        if self.targetrepo.is_empty() {
            return Err(ConfigError::TargetRepoEmpty);
        }
        if self.localdir.is_empty() {
            return Err(ConfigError::LocalDirEmpty);
        }

        let kubeconfig = self.kubeconfigpath.or_else(default_kubeconfig);
        Ok(ServerSettings {
            target_repo: self.targetrepo,
            local_dir: PathBuf::from(self.localdir),
            kubeconfig,
            namespace: self.namespace,
            initial_branch: self.initialbranch,
            initial_clone: self.initialclone,
            initial_build: self.initialbuild,
            webhook_listen: self.webhooklisten,
            port: self.port,
        })
    }
}

/// `~/.kube/config` if it exists
fn default_kubeconfig() -> Option<PathBuf> {
    let path = dirs::home_dir()?.join(".kube").join("config");
    path.exists().then_some(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
