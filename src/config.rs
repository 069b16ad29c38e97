// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional settings file that pseudorev reads at
//! startup. Every field has a default, so a missing file, or a file that only
//! sets a few fields, is fine.
//!
//! # General Layout
//!
//! ```toml
//! upstream = "origin/master"
//! backend = "git"
//! git = "git"
//!
//! [deploy]
//! tool = "~/src/go_appengine/appcfg.py"
//! directory = "appengine/seeall"
//! ```

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Top-level settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Upstream reference that merge-base is computed against.
    pub upstream: String,

    /// Version-control backend to query checkout with.
    pub backend: Backend,

    /// Git binary used by the subprocess backend.
    pub git: PathBuf,

    /// Deploy tool settings.
    pub deploy: DeploySettings,
}

impl Settings {
    /// Load settings from file.
    ///
    /// Missing file yields default settings. Paths are shell expanded.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file is not valid settings.
    /// - Return [`ConfigError::ShellExpansion`] if path expansion fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(data) => {
                debug!("load settings from {:?}", path.display());
                data.parse()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no settings at {:?}, use defaults", path.display());
                Self::default().expand()
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Deployable directory for checkout at `root`.
    ///
    /// Relative directories are resolved against checkout root.
    pub fn deploy_dir(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(&self.deploy.directory)
    }

    // INVARIANT: Perform shell expansion on every path field.
    fn expand(mut self) -> Result<Self> {
        self.git = expand_path(&self.git)?;
        self.deploy.tool = expand_path(&self.deploy.tool)?;
        self.deploy.directory = expand_path(&self.deploy.directory)?;
        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upstream: "origin/master".into(),
            backend: Backend::default(),
            git: PathBuf::from("git"),
            deploy: DeploySettings::default(),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;
        settings.expand()
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Deploy tool settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploySettings {
    /// Deploy tool executable.
    pub tool: PathBuf,

    /// Directory handed to deploy tool.
    pub directory: PathBuf,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("~/src/go_appengine/appcfg.py"),
            directory: PathBuf::from("appengine/seeall"),
        }
    }
}

/// Version-control backend selection.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Shell out to Git binary.
    #[default]
    Git,

    /// Query in-process through libgit2.
    Libgit2,
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read settings from {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
