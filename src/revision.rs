// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Revision inspection.
//!
//! A checkout is identified by its __merge-base__ with an upstream reference,
//! i.e., the nearest commit that both HEAD and upstream share. The number of
//! commits reachable from that merge-base is the __ordinal__, a coarse build
//! number that only ever grows as more work lands upstream. It is monotonic
//! along the upstream lineage, but two unrelated branches can share the same
//! ordinal.
//!
//! A checkout is __pristine__ when HEAD sits exactly on the merge-base and
//! nothing differs from it, staged or not. Anything else is __tainted__.

use crate::vcs::{DiffScope, Result, VersionControl};

use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Version-relevant state of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Commits reachable from merge-base, merge-base included.
    pub ordinal: u64,

    /// Full identifier of merge-base commit.
    pub merge_base: String,

    /// HEAD is merge-base with no local changes.
    pub pristine: bool,
}

/// Inspect revision state of a checkout.
#[derive(Debug)]
pub struct RevisionInspector<V>
where
    V: VersionControl,
{
    vcs: V,
    root: PathBuf,
}

impl<V> RevisionInspector<V>
where
    V: VersionControl,
{
    /// Construct new inspector for checkout at `root`.
    pub fn new(vcs: V, root: impl Into<PathBuf>) -> Self {
        Self {
            vcs,
            root: root.into(),
        }
    }

    /// Root of inspected checkout.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Compute full revision state against upstream reference.
    ///
    /// # Errors
    ///
    /// - Return [`VcsQueryError`](crate::vcs::VcsQueryError) if any query
    ///   fails.
    #[instrument(skip(self), level = "debug")]
    pub fn inspect(&self, upstream: &str) -> Result<Revision> {
        let merge_base = self.resolve_merge_base(upstream)?;
        let ordinal = self.count_ordinal(&merge_base)?;
        let pristine = self.is_pristine(&merge_base)?;
        debug!("merge-base {merge_base} at ordinal {ordinal}, pristine: {pristine}");

        Ok(Revision {
            ordinal,
            merge_base,
            pristine,
        })
    }

    /// Find merge-base between HEAD and upstream reference.
    ///
    /// # Errors
    ///
    /// - Return [`VcsQueryError`](crate::vcs::VcsQueryError) if upstream
    ///   does not exist, shares no history with HEAD, or root is not a
    ///   checkout.
    pub fn resolve_merge_base(&self, upstream: &str) -> Result<String> {
        self.vcs.merge_base(&self.root, "HEAD", upstream)
    }

    /// Count commits reachable from `commit`.
    ///
    /// # Errors
    ///
    /// - Return [`VcsQueryError`](crate::vcs::VcsQueryError) if log cannot
    ///   be walked.
    pub fn count_ordinal(&self, commit: &str) -> Result<u64> {
        self.vcs.log_length(&self.root, commit)
    }

    /// Check that HEAD is `commit` and nothing differs from it.
    ///
    /// Submodule changes taint the working tree but not the index. No diff is
    /// computed when HEAD has moved away from `commit`, and the index is not
    /// diffed once the working tree already differs.
    ///
    /// # Errors
    ///
    /// - Return [`VcsQueryError`](crate::vcs::VcsQueryError) if HEAD cannot
    ///   be resolved or a diff fails.
    pub fn is_pristine(&self, commit: &str) -> Result<bool> {
        let head = self.vcs.rev_parse(&self.root, "HEAD")?;
        if head != commit {
            debug!("HEAD {head} diverges from {commit}");
            return Ok(false);
        }

        if !self
            .vcs
            .diff(&self.root, commit, DiffScope::WithSubmodules)?
            .is_empty()
        {
            debug!("working tree differs from {commit}");
            return Ok(false);
        }

        let staged = self.vcs.diff(&self.root, commit, DiffScope::Staged)?;
        if !staged.is_empty() {
            debug!("index differs from {commit}");
        }

        Ok(staged.is_empty())
    }
}
