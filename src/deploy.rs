// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deploy tool invocation.
//!
//! Deployment itself is somebody else's job. Pseudorev only hands a directory
//! and a version label to an external tool in two steps: upload the new
//! version, then make it the default one. Each step reports back a plain
//! process exit status.

use crate::version::Version;

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use tracing::{debug, info, instrument};

/// Two-step deploy collaborator.
pub trait Deployment {
    /// Upload `version` of `dir`. Returns exit status of deploy tool.
    fn update(&self, dir: &Path, version: &Version) -> Result<i32>;

    /// Make `version` the default. Returns exit status of deploy tool.
    fn set_default_version(&self, dir: &Path, version: &Version) -> Result<i32>;
}

impl<D> Deployment for &D
where
    D: Deployment + ?Sized,
{
    fn update(&self, dir: &Path, version: &Version) -> Result<i32> {
        (**self).update(dir, version)
    }

    fn set_default_version(&self, dir: &Path, version: &Version) -> Result<i32> {
        (**self).set_default_version(dir, version)
    }
}

/// Deploy through an appcfg-style command line tool.
///
/// Runs `<tool> <action> <dir> -V <version>` with the caller's stdio, so any
/// prompts from the tool reach the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCfgDeployer {
    tool: PathBuf,
}

impl AppCfgDeployer {
    /// Construct new deployer for tool at `tool`.
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Path to deploy tool.
    pub fn tool(&self) -> &Path {
        self.tool.as_path()
    }

    fn expand_bin_args(&self, action: &str, dir: &Path, version: &Version) -> Vec<OsString> {
        vec![
            action.into(),
            dir.as_os_str().to_os_string(),
            "-V".into(),
            version.as_str().into(),
        ]
    }

    #[instrument(skip(self, dir, version), level = "debug")]
    fn run(&self, action: &str, dir: &Path, version: &Version) -> Result<i32> {
        info!("{action} {:?} as version {version}", dir.display());
        let status = syscall_interactive(&self.tool, self.expand_bin_args(action, dir, version))?;
        debug!("{action} finished with {status}");

        Ok(exit_code(status))
    }
}

impl Deployment for AppCfgDeployer {
    fn update(&self, dir: &Path, version: &Version) -> Result<i32> {
        self.run("update", dir, version)
    }

    fn set_default_version(&self, dir: &Path, version: &Version) -> Result<i32> {
        self.run("set_default_version", dir, version)
    }
}

fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<ExitStatus> {
    Command::new(cmd.as_ref())
        .args(args)
        .spawn()
        .and_then(|mut child| child.wait())
        .map_err(|err| DeployError::Syscall {
            source: err,
            tool: PathBuf::from(cmd.as_ref()),
        })
}

/// Map exit status to process exit code.
///
/// A tool killed by a signal has no code of its own and reports as `128 + signal`
/// like a shell would.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Deploy tool error types.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Deploy tool could not be run at all.
    #[error("failed to run deploy tool {:?}", tool.display())]
    Syscall {
        #[source]
        source: std::io::Error,
        tool: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DeployError> = std::result::Result<T, E>;
