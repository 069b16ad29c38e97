// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Current user lookup.
//!
//! Tainted versions carry the name of whoever built them. The name comes from
//! the usual login environment variables first, and the password database
//! second.

use std::env;
use tracing::debug;

/// Environment variables consulted for user name, in order.
pub const USER_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Determine name of invoking user.
pub trait UserLookup {
    /// Name of current user.
    fn current_user(&self) -> Result<String>;
}

impl<U> UserLookup for &U
where
    U: UserLookup + ?Sized,
{
    fn current_user(&self) -> Result<String> {
        (**self).current_user()
    }
}

/// User of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemUser;

impl UserLookup for SystemUser {
    fn current_user(&self) -> Result<String> {
        for var in USER_VARS {
            if let Some(name) = env::var(var).ok().filter(|name| !name.is_empty()) {
                debug!("user {name:?} from ${var}");
                return Ok(name);
            }
        }

        password_entry()
    }
}

#[cfg(unix)]
fn password_entry() -> Result<String> {
    use nix::unistd::{getuid, User};

    let uid = getuid();
    match User::from_uid(uid) {
        Ok(Some(user)) => {
            debug!("user {:?} from password database", user.name);
            Ok(user.name)
        }
        Ok(None) => Err(UserError::Unknown),
        Err(err) => Err(UserError::Lookup(err)),
    }
}

#[cfg(not(unix))]
fn password_entry() -> Result<String> {
    Err(UserError::Unknown)
}

/// User lookup error types.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Nothing names the current user.
    #[error("cannot determine name of current user")]
    Unknown,

    /// Password database lookup fails.
    #[cfg(unix)]
    #[error("failed to look up current user in password database")]
    Lookup(#[source] nix::Error),
}

/// Friendly result alias :3
pub type Result<T, E = UserError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("LOGNAME", "alice"), ("USER", "bob")])]
    fn logname_wins() -> anyhow::Result<()> {
        assert_eq!(SystemUser.current_user()?, "alice");
        Ok(())
    }

    #[sealed_test(env = [("LOGNAME", ""), ("USER", "bob")])]
    fn empty_vars_are_skipped() -> anyhow::Result<()> {
        assert_eq!(SystemUser.current_user()?, "bob");
        Ok(())
    }

    #[sealed_test(env = [("LOGNAME", ""), ("USER", ""), ("LNAME", ""), ("USERNAME", "carol")])]
    fn username_is_last_resort_variable() -> anyhow::Result<()> {
        assert_eq!(SystemUser.current_user()?, "carol");
        Ok(())
    }
}
