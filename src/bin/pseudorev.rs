// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use pseudorev::{
    path::default_config_path, release::ArgumentError, AppCfgDeployer, Backend, Git2Vcs, GitCli,
    Invocation, Release, ReleaseError, Settings, SystemUser, VersionControl,
};

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser};
use std::{env, io, path::Path, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "pseudorev [options]",
    version
)]
struct Cli {
    /// Show debug output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Tag to attach to version.
    #[arg(short, long, value_name = "tag")]
    pub tag: Option<String>,

    #[arg(hide = true, value_name = "args")]
    pub args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr);
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    match run(cli) {
        Ok(code) => exit(code),
        Err(error) => {
            if let Some(ReleaseError::Argument(err)) = error.downcast_ref::<ReleaseError>() {
                usage_error(err).exit();
            }

            error!("{error:?}");
            exit(1);
        }
    }
}

fn usage_error(err: &ArgumentError) -> clap::Error {
    Cli::command().error(ErrorKind::UnknownArgument, err)
}

fn run(cli: Cli) -> Result<i32> {
    let invocation = Invocation {
        tag: cli.tag,
        args: cli.args,
    };
    invocation.validate().map_err(ReleaseError::from)?;

    let settings = Settings::load(default_config_path()?)?;
    let cwd = env::current_dir()?;
    let deployer = AppCfgDeployer::new(&settings.deploy.tool);

    match settings.backend {
        Backend::Git => {
            let vcs = GitCli::new(&settings.git);
            run_release(vcs, deployer, settings, &cwd, &invocation)
        }
        Backend::Libgit2 => run_release(Git2Vcs::new(), deployer, settings, &cwd, &invocation),
    }
}

fn run_release(
    vcs: impl VersionControl,
    deployer: AppCfgDeployer,
    settings: Settings,
    cwd: &Path,
    invocation: &Invocation,
) -> Result<i32> {
    let release = Release::new(vcs, SystemUser, deployer, settings);
    Ok(release.run(cwd, invocation, &mut io::stdout().lock())?)
}
