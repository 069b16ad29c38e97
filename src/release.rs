// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Release pipeline.
//!
//! A release is a straight line: resolve the checkout root, inspect its
//! revision, format the pseudo-version, print it, then run both deploy steps.
//! The first failure stops everything. There is no retry and no rollback.

use crate::{
    config::Settings,
    deploy::Deployment,
    revision::RevisionInspector,
    user::UserLookup,
    vcs::VersionControl,
    version::Version,
};

use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, error, instrument};

/// What the caller asked for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Tag appended to version.
    pub tag: Option<String>,

    /// Positional arguments. Must be empty.
    pub args: Vec<String>,
}

impl Invocation {
    /// Reject positional arguments.
    ///
    /// # Errors
    ///
    /// - Return [`ArgumentError`] if any positional argument was given.
    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.args.is_empty() {
            return Ok(());
        }

        Err(ArgumentError {
            args: self.args.clone(),
        })
    }
}

/// Compute version of a checkout and deploy it.
#[derive(Debug)]
pub struct Release<V, U, D>
where
    V: VersionControl,
    U: UserLookup,
    D: Deployment,
{
    vcs: V,
    user: U,
    deployer: D,
    settings: Settings,
}

impl<V, U, D> Release<V, U, D>
where
    V: VersionControl,
    U: UserLookup,
    D: Deployment,
{
    /// Construct new release pipeline.
    pub fn new(vcs: V, user: U, deployer: D, settings: Settings) -> Self {
        Self {
            vcs,
            user,
            deployer,
            settings,
        }
    }

    /// Compute pseudo-version of checkout containing `cwd`.
    ///
    /// User name is only looked up when the checkout is tainted.
    ///
    /// # Errors
    ///
    /// - Return [`ReleaseError::Vcs`] if any version-control query fails.
    /// - Return [`ReleaseError::User`] if tainted and user is unknown.
    #[instrument(skip(self, cwd), level = "debug")]
    pub fn version(&self, cwd: &Path, tag: Option<&str>) -> Result<(PathBuf, Version)> {
        let root = self.vcs.checkout_root(cwd)?;
        debug!("checkout root is {:?}", root.display());

        let inspector = RevisionInspector::new(&self.vcs, root.as_path());
        let revision = inspector.inspect(&self.settings.upstream)?;
        let username = if revision.pristine {
            String::new()
        } else {
            self.user.current_user()?
        };

        Ok((root, Version::from_revision(&revision, &username, tag)))
    }

    /// Run both deploy steps for checkout at `root`.
    ///
    /// Returns the exit status of the first failing step, or of
    /// "set default version" when "update" succeeds.
    ///
    /// # Errors
    ///
    /// - Return [`ReleaseError::Deploy`] if deploy tool cannot be run.
    pub fn deploy(&self, root: &Path, version: &Version) -> Result<i32> {
        let dir = self.settings.deploy_dir(root);

        let status = self.deployer.update(&dir, version)?;
        if status != 0 {
            error!("update of {version} failed with status {status}");
            return Ok(status);
        }

        Ok(self.deployer.set_default_version(&dir, version)?)
    }

    /// Run whole pipeline, writing version to `out`.
    ///
    /// Positional arguments are rejected before any query runs.
    ///
    /// # Errors
    ///
    /// - Return [`ReleaseError::Argument`] if positional arguments are given.
    /// - Return any error of [`Release::version`] or [`Release::deploy`].
    pub fn run(&self, cwd: &Path, invocation: &Invocation, out: &mut impl Write) -> Result<i32> {
        invocation.validate()?;

        let (root, version) = self.version(cwd, invocation.tag.as_deref())?;
        writeln!(out, "{version}").map_err(ReleaseError::Output)?;
        out.flush().map_err(ReleaseError::Output)?;

        self.deploy(&root, &version)
    }
}

/// Unexpected positional arguments.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown arguments, {args:?}")]
pub struct ArgumentError {
    pub args: Vec<String>,
}

/// Release pipeline error types.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    /// Caller gave positional arguments.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// Version-control query fails.
    #[error(transparent)]
    Vcs(#[from] crate::vcs::VcsQueryError),

    /// Current user cannot be determined.
    #[error(transparent)]
    User(#[from] crate::user::UserError),

    /// Deploy tool cannot be run.
    #[error(transparent)]
    Deploy(#[from] crate::deploy::DeployError),

    /// Version cannot be written out.
    #[error("failed to write version")]
    Output(#[source] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ReleaseError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deploy::Result as DeployResult,
        revision::tests::FakeVcs,
        user::{Result as UserResult, UserError},
    };
    use pretty_assertions::assert_eq;
    use std::{
        cell::{Cell, RefCell},
        io,
        sync::{Arc, Mutex},
    };

    const BASE: &str = "deadbeefcafe0123456789abcdef0123456789ab";

    #[derive(Debug, Default)]
    struct FakeUser {
        lookups: Cell<usize>,
    }

    impl UserLookup for FakeUser {
        fn current_user(&self) -> UserResult<String> {
            self.lookups.set(self.lookups.get() + 1);
            Ok("alice".into())
        }
    }

    struct NoUser;

    impl UserLookup for NoUser {
        fn current_user(&self) -> UserResult<String> {
            Err(UserError::Unknown)
        }
    }

    #[derive(Debug, Default)]
    struct FakeDeployer {
        update_status: i32,
        default_status: i32,
        calls: RefCell<Vec<String>>,
    }

    impl Deployment for FakeDeployer {
        fn update(&self, dir: &Path, version: &Version) -> DeployResult<i32> {
            self.calls
                .borrow_mut()
                .push(format!("update {} {version}", dir.display()));
            Ok(self.update_status)
        }

        fn set_default_version(&self, dir: &Path, version: &Version) -> DeployResult<i32> {
            self.calls
                .borrow_mut()
                .push(format!("set_default_version {} {version}", dir.display()));
            Ok(self.default_status)
        }
    }

    fn run(
        vcs: &FakeVcs,
        user: &FakeUser,
        deployer: &FakeDeployer,
        invocation: &Invocation,
    ) -> (Result<i32>, String) {
        let release = Release::new(vcs, user, deployer, Settings::default());
        let mut out = Vec::new();
        let result = release.run(Path::new("/checkout/sub"), invocation, &mut out);
        (result, String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn successful_release() -> anyhow::Result<()> {
        let vcs = FakeVcs::pristine(BASE, 42);
        let user = FakeUser::default();
        let deployer = FakeDeployer::default();

        let (result, out) = run(&vcs, &user, &deployer, &Invocation::default());
        assert_eq!(result?, 0);
        assert_eq!(out, "42-deadbee\n");
        assert_eq!(user.lookups.get(), 0);
        assert_eq!(
            deployer.calls.borrow().as_slice(),
            [
                "update /checkout/appengine/seeall 42-deadbee".to_string(),
                "set_default_version /checkout/appengine/seeall 42-deadbee".to_string(),
            ]
        );

        Ok(())
    }

    #[test]
    fn tainted_release_names_user_and_tag() -> anyhow::Result<()> {
        let vcs = FakeVcs {
            work_tree_diff: "diff --git a/main.go b/main.go\n".into(),
            ..FakeVcs::pristine(BASE, 7)
        };
        let user = FakeUser::default();
        let deployer = FakeDeployer::default();
        let invocation = Invocation {
            tag: Some("rc2".into()),
            args: Vec::new(),
        };

        let (result, out) = run(&vcs, &user, &deployer, &invocation);
        assert_eq!(result?, 0);
        assert_eq!(out, "7-deadbee-tainted-alice-rc2\n");
        assert_eq!(user.lookups.get(), 1);

        Ok(())
    }

    #[test]
    fn failed_update_skips_set_default_version() -> anyhow::Result<()> {
        let vcs = FakeVcs::pristine(BASE, 42);
        let user = FakeUser::default();
        let deployer = FakeDeployer {
            update_status: 3,
            ..Default::default()
        };

        let (result, _) = run(&vcs, &user, &deployer, &Invocation::default());
        assert_eq!(result?, 3);
        assert_eq!(deployer.calls.borrow().len(), 1);
        assert!(deployer.calls.borrow()[0].starts_with("update "));

        Ok(())
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| io::Error::other("poisoned log buffer"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_update_is_logged_at_error_level() -> anyhow::Result<()> {
        let vcs = FakeVcs::pristine(BASE, 42);
        let user = FakeUser::default();
        let deployer = FakeDeployer {
            update_status: 3,
            ..Default::default()
        };

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::ERROR)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        let (result, _) = tracing::subscriber::with_default(subscriber, || {
            run(&vcs, &user, &deployer, &Invocation::default())
        });
        assert_eq!(result?, 3);

        let captured = logs
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned log buffer"))?
            .clone();
        let logs = String::from_utf8(captured)?;
        assert!(logs.contains("update of 42-deadbee failed with status 3"), "{logs}");

        Ok(())
    }

    #[test]
    fn failed_set_default_version_is_reported() -> anyhow::Result<()> {
        let vcs = FakeVcs::pristine(BASE, 42);
        let user = FakeUser::default();
        let deployer = FakeDeployer {
            default_status: 5,
            ..Default::default()
        };

        let (result, _) = run(&vcs, &user, &deployer, &Invocation::default());
        assert_eq!(result?, 5);
        assert_eq!(deployer.calls.borrow().len(), 2);

        Ok(())
    }

    #[test]
    fn positional_arguments_run_no_queries() {
        let vcs = FakeVcs::pristine(BASE, 42);
        let user = FakeUser::default();
        let deployer = FakeDeployer::default();
        let invocation = Invocation {
            tag: None,
            args: vec!["production".into()],
        };

        let (result, out) = run(&vcs, &user, &deployer, &invocation);
        match result {
            Err(ReleaseError::Argument(err)) => {
                assert_eq!(err.to_string(), r#"Unknown arguments, ["production"]"#);
            }
            other => panic!("expected argument error, got {other:?}"),
        }
        assert!(out.is_empty());
        assert!(vcs.calls().is_empty());
        assert!(deployer.calls.borrow().is_empty());
    }

    #[test]
    fn query_failure_stops_pipeline() {
        let vcs = FakeVcs {
            merge_base: None,
            ..FakeVcs::pristine(BASE, 42)
        };
        let user = FakeUser::default();
        let deployer = FakeDeployer::default();

        let (result, out) = run(&vcs, &user, &deployer, &Invocation::default());
        assert!(matches!(result, Err(ReleaseError::Vcs(_))));
        assert!(out.is_empty());
        assert!(deployer.calls.borrow().is_empty());
    }

    #[test]
    fn unknown_user_fails_tainted_release() {
        let vcs = FakeVcs {
            staged_diff: "diff --git a/app.yaml b/app.yaml\n".into(),
            ..FakeVcs::pristine(BASE, 42)
        };
        let release = Release::new(&vcs, NoUser, FakeDeployer::default(), Settings::default());

        let result = release.version(Path::new("/checkout"), None);
        assert!(matches!(result, Err(ReleaseError::User(UserError::Unknown))));
    }
}
