// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Monotonic pseudo-versions from Git history.
//!
//! Pseudorev names a build after the point where the local checkout meets
//! upstream. The name `<ordinal>-<short-id>` is made of the number of commits
//! reachable from the merge-base with upstream, and the first seven characters
//! of that merge-base. Any local divergence, be it commits on top of upstream
//! or uncommitted changes, marks the build as __tainted__ by whoever made it,
//! e.g., `42-abcdef0-tainted-alice`. An optional tag goes last.
//!
//! The resulting version is handed to an external deploy tool, first to upload
//! it, then to make it the default version.
//!
//! # See Also
//!
//! 1. [`revision`]
//! 2. [`version`]
//! 3. [`release`]

pub mod config;
pub mod deploy;
pub mod path;
pub mod release;
pub mod revision;
pub mod user;
pub mod vcs;
pub mod version;

pub use crate::{
    config::{Backend, Settings},
    deploy::{AppCfgDeployer, Deployment},
    release::{Invocation, Release, ReleaseError},
    revision::{Revision, RevisionInspector},
    user::{SystemUser, UserLookup},
    vcs::{DiffScope, Git2Vcs, GitCli, VcsQueryError, VersionControl},
    version::{format_version, Version},
};
