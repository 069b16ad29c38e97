// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version-control query interface.
//!
//! Everything pseudorev knows about a checkout comes from a handful of
//! read-only queries: where the checkout root is, what HEAD points at, the
//! merge-base against an upstream reference, how long the log is from a given
//! commit, and whether anything differs from a given commit. These queries are
//! modeled by the [`VersionControl`] trait so that callers do not care whether
//! the answers come from the Git binary or from libgit2.
//!
//! # Backends
//!
//! - [`GitCli`] shells out to the Git binary. This is the default backend.
//! - [`Git2Vcs`] answers the same queries in-process through libgit2.
//!
//! Both backends are strictly read-only. Nothing here touches the index, the
//! working tree, or any reference.

use git2::{DiffFormat, DiffOptions, Repository, SubmoduleIgnore, SubmoduleStatus};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use tracing::debug;

/// Read-only queries against a checkout.
pub trait VersionControl {
    /// Resolve the top-level directory of the checkout containing `cwd`.
    fn checkout_root(&self, cwd: &Path) -> Result<PathBuf>;

    /// Resolve revision to full commit identifier.
    fn rev_parse(&self, root: &Path, rev: &str) -> Result<String>;

    /// Find nearest common ancestor of two revisions.
    fn merge_base(&self, root: &Path, left: &str, right: &str) -> Result<String>;

    /// Count commits reachable from `commit`, itself included.
    fn log_length(&self, root: &Path, commit: &str) -> Result<u64>;

    /// Textual diff against `commit`. Empty output means no difference.
    fn diff(&self, root: &Path, commit: &str, scope: DiffScope) -> Result<String>;
}

impl<V> VersionControl for &V
where
    V: VersionControl + ?Sized,
{
    fn checkout_root(&self, cwd: &Path) -> Result<PathBuf> {
        (**self).checkout_root(cwd)
    }

    fn rev_parse(&self, root: &Path, rev: &str) -> Result<String> {
        (**self).rev_parse(root, rev)
    }

    fn merge_base(&self, root: &Path, left: &str, right: &str) -> Result<String> {
        (**self).merge_base(root, left, right)
    }

    fn log_length(&self, root: &Path, commit: &str) -> Result<u64> {
        (**self).log_length(root, commit)
    }

    fn diff(&self, root: &Path, commit: &str, scope: DiffScope) -> Result<String> {
        (**self).diff(root, commit, scope)
    }
}

/// What a diff compares against the target commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffScope {
    /// Working tree, default submodule handling.
    Plain,

    /// Working tree, submodule changes always reported.
    WithSubmodules,

    /// Index, submodule changes never reported.
    Staged,
}

impl DiffScope {
    /// Flags given to git-diff(1) for this scope.
    pub fn git_flags(self) -> &'static [&'static str] {
        match self {
            Self::Plain => &[],
            Self::WithSubmodules => &["--ignore-submodules=none"],
            Self::Staged => &["--ignore-submodules", "--cached"],
        }
    }
}

/// Query checkout through the Git binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCli {
    binary: PathBuf,
}

impl GitCli {
    /// Construct new Git binary backend.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn gitcall(
        &self,
        cwd: &Path,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<String> {
        syscall_non_interactive(&self.binary, cwd, args)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl VersionControl for GitCli {
    fn checkout_root(&self, cwd: &Path) -> Result<PathBuf> {
        let output = self.gitcall(cwd, ["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(output.trim_end()))
    }

    fn rev_parse(&self, root: &Path, rev: &str) -> Result<String> {
        let output = self.gitcall(root, ["rev-parse", rev])?;
        Ok(output.trim_end().to_string())
    }

    fn merge_base(&self, root: &Path, left: &str, right: &str) -> Result<String> {
        let output = self.gitcall(root, ["merge-base", left, right])?;
        Ok(output.trim_end().to_string())
    }

    fn log_length(&self, root: &Path, commit: &str) -> Result<u64> {
        let output = self.gitcall(root, ["log", "--format=%h", commit])?;
        Ok(output.lines().filter(|line| !line.is_empty()).count() as u64)
    }

    fn diff(&self, root: &Path, commit: &str, scope: DiffScope) -> Result<String> {
        let mut args = vec!["diff"];
        args.extend_from_slice(scope.git_flags());
        args.push(commit);
        self.gitcall(root, args)
    }
}

/// Query checkout in-process through libgit2.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Git2Vcs;

impl Git2Vcs {
    /// Construct new libgit2 backend.
    pub fn new() -> Self {
        Self
    }

    fn open(&self, root: &Path, command: &str) -> Result<Repository> {
        debug!("libgit2 {command} in {:?}", root.display());
        Repository::open(root).query(command, root)
    }
}

impl VersionControl for Git2Vcs {
    fn checkout_root(&self, cwd: &Path) -> Result<PathBuf> {
        let command = "rev-parse --show-toplevel";
        debug!("libgit2 {command} in {:?}", cwd.display());
        let repo = Repository::discover(cwd).query(command, cwd)?;
        let workdir = repo.workdir().ok_or_else(|| VcsQueryError::NoWorkTree {
            cwd: cwd.to_path_buf(),
        })?;

        // INVARIANT: Strip trailing separator that libgit2 leaves on workdir.
        Ok(workdir.components().collect())
    }

    fn rev_parse(&self, root: &Path, rev: &str) -> Result<String> {
        let command = format!("rev-parse {rev}");
        let repo = self.open(root, &command)?;
        let commit = repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit())
            .query(&command, root)?;

        Ok(commit.id().to_string())
    }

    fn merge_base(&self, root: &Path, left: &str, right: &str) -> Result<String> {
        let command = format!("merge-base {left} {right}");
        let repo = self.open(root, &command)?;
        let left = repo
            .revparse_single(left)
            .and_then(|object| object.peel_to_commit())
            .query(&command, root)?;
        let right = repo
            .revparse_single(right)
            .and_then(|object| object.peel_to_commit())
            .query(&command, root)?;
        let base = repo.merge_base(left.id(), right.id()).query(&command, root)?;

        Ok(base.to_string())
    }

    fn log_length(&self, root: &Path, commit: &str) -> Result<u64> {
        let command = format!("log --format=%h {commit}");
        let repo = self.open(root, &command)?;
        let start = repo
            .revparse_single(commit)
            .and_then(|object| object.peel_to_commit())
            .query(&command, root)?;

        let mut walk = repo.revwalk().query(&command, root)?;
        walk.push(start.id()).query(&command, root)?;
        walk.try_fold(0u64, |count, oid| oid.map(|_| count + 1))
            .query(&command, root)
    }

    fn diff(&self, root: &Path, commit: &str, scope: DiffScope) -> Result<String> {
        let mut command = String::from("diff");
        for flag in scope.git_flags() {
            command.push(' ');
            command.push_str(flag);
        }
        command.push(' ');
        command.push_str(commit);

        let repo = self.open(root, &command)?;
        let tree = repo
            .revparse_single(commit)
            .and_then(|object| object.peel_to_tree())
            .query(&command, root)?;

        let mut opts = DiffOptions::new();
        let diff = match scope {
            DiffScope::Plain => repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts)),
            DiffScope::WithSubmodules => {
                opts.ignore_submodules(false);
                repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))
            }
            DiffScope::Staged => {
                opts.ignore_submodules(true);
                repo.diff_tree_to_index(Some(&tree), None, Some(&mut opts))
            }
        }
        .query(&command, root)?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin());
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .query(&command, root)?;

        // INVARIANT: Submodule ignore rules from config never hide changes here.
        if scope == DiffScope::WithSubmodules && patch.is_empty() {
            for submodule in repo.submodules().query(&command, root)? {
                let Some(name) = submodule.name() else {
                    continue;
                };
                let status = repo
                    .submodule_status(name, SubmoduleIgnore::None)
                    .query(&command, root)?;
                if status.intersects(SUBMODULE_CHANGES) {
                    patch.push_str(&format!("Submodule {name} modified ({status:?})\n"));
                }
            }
        }

        Ok(patch)
    }
}

/// Submodule states that count as a difference from the checked out commit.
const SUBMODULE_CHANGES: SubmoduleStatus = SubmoduleStatus::INDEX_ADDED
    .union(SubmoduleStatus::INDEX_DELETED)
    .union(SubmoduleStatus::INDEX_MODIFIED)
    .union(SubmoduleStatus::WD_ADDED)
    .union(SubmoduleStatus::WD_DELETED)
    .union(SubmoduleStatus::WD_MODIFIED)
    .union(SubmoduleStatus::WD_INDEX_MODIFIED)
    .union(SubmoduleStatus::WD_WD_MODIFIED)
    .union(SubmoduleStatus::WD_UNTRACKED);

/// Attach query context to libgit2 failures.
trait QueryContext<T> {
    fn query(self, command: &str, cwd: &Path) -> Result<T>;
}

impl<T> QueryContext<T> for std::result::Result<T, git2::Error> {
    fn query(self, command: &str, cwd: &Path) -> Result<T> {
        self.map_err(|err| VcsQueryError::Libgit2 {
            source: err,
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
        })
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    cwd: &Path,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();
    let command = render_command(cmd.as_ref(), &args);
    debug!("run {command} in {:?}", cwd.display());

    let output = Command::new(cmd.as_ref())
        .args(&args)
        .current_dir(cwd)
        .output()
        .map_err(|err| VcsQueryError::Spawn {
            source: err,
            command: command.clone(),
            cwd: cwd.to_path_buf(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(output.stderr.as_slice());
        return Err(VcsQueryError::Failed {
            command,
            cwd: cwd.to_path_buf(),
            status: output.status,
            stderr: stderr.trim_end().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(output.stdout.as_slice()).into_owned())
}

fn render_command(cmd: &OsStr, args: &[OsString]) -> String {
    let mut rendered = cmd.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }

    rendered
}

/// Version-control query failures.
#[derive(Debug, thiserror::Error)]
pub enum VcsQueryError {
    /// Query process could not be started.
    #[error("failed to run {command:?} in {:?}", cwd.display())]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
        cwd: PathBuf,
    },

    /// Query process exited unsuccessfully.
    #[error("command {command:?} failed in {:?} with {status}: {stderr}", cwd.display())]
    Failed {
        command: String,
        cwd: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    /// libgit2 could not answer query.
    #[error("libgit2 query {command:?} failed in {:?}", cwd.display())]
    Libgit2 {
        #[source]
        source: git2::Error,
        command: String,
        cwd: PathBuf,
    },

    /// Repository has no working tree to inspect.
    #[error("repository at {:?} is bare", cwd.display())]
    NoWorkTree { cwd: PathBuf },
}

impl VcsQueryError {
    /// Command that failed, as it would be typed at a shell.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Spawn { command, .. }
            | Self::Failed { command, .. }
            | Self::Libgit2 { command, .. } => Some(command),
            Self::NoWorkTree { .. } => None,
        }
    }

    /// Directory the failed query ran in.
    pub fn cwd(&self) -> &Path {
        match self {
            Self::Spawn { cwd, .. }
            | Self::Failed { cwd, .. }
            | Self::Libgit2 { cwd, .. }
            | Self::NoWorkTree { cwd } => cwd,
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = VcsQueryError> = std::result::Result<T, E>;
