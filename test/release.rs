// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{RepoFixture, UPSTREAM};

use anyhow::Result;
use pretty_assertions::assert_eq;
use pseudorev::{
    user::Result as UserResult, AppCfgDeployer, GitCli, Invocation, Release, Settings,
    UserLookup,
};

struct Named(&'static str);

impl UserLookup for Named {
    fn current_user(&self) -> UserResult<String> {
        Ok(self.0.to_string())
    }
}

fn settings() -> Settings {
    Settings {
        upstream: UPSTREAM.into(),
        ..Settings::default()
    }
}

#[cfg(unix)]
#[test]
fn release_prints_version_and_deploys() -> Result<()> {
    let (fixture, head) = RepoFixture::with_history(4)?;
    let release = Release::new(GitCli::default(), Named("alice"), AppCfgDeployer::new("true"), settings());
    let invocation = Invocation {
        tag: Some("rc1".into()),
        args: Vec::new(),
    };

    let mut out = Vec::new();
    let status = release.run(fixture.path(), &invocation, &mut out)?;
    assert_eq!(status, 0);
    assert_eq!(
        String::from_utf8(out)?,
        format!("4-{}-rc1\n", &head.to_string()[..7])
    );

    Ok(())
}

#[cfg(unix)]
#[test]
fn failed_update_status_is_returned() -> Result<()> {
    let (fixture, head) = RepoFixture::with_history(1)?;
    fixture.write("file0.txt", "dirty\n")?;
    let release = Release::new(GitCli::default(), Named("bob"), AppCfgDeployer::new("false"), settings());

    let mut out = Vec::new();
    let status = release.run(fixture.path(), &Invocation::default(), &mut out)?;
    assert_eq!(status, 1);
    assert_eq!(
        String::from_utf8(out)?,
        format!("1-{}-tainted-bob\n", &head.to_string()[..7])
    );

    Ok(())
}
