// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pseudo-version formatting.
//!
//! A pseudo-version has the layout
//! `<ordinal>-<short-id>[-tainted-<user>][-<tag>]`, e.g., `42-abcdef0`,
//! `42-abcdef0-tainted-alice-rc1`. Tag and user name are used verbatim.

use crate::revision::Revision;

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Number of characters kept from the merge-base identifier.
pub const SHORT_ID_LEN: usize = 7;

/// Formatted pseudo-version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Build version for inspected revision.
    pub fn from_revision(revision: &Revision, username: &str, tag: Option<&str>) -> Self {
        format_version(
            revision.ordinal,
            &revision.merge_base,
            revision.pristine,
            username,
            tag,
        )
    }

    /// Treat version as string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Version {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Assemble pseudo-version.
///
/// Merge-base identifier is cut to [`SHORT_ID_LEN`] characters, shorter
/// identifiers are kept whole. The taint suffix always comes before the tag.
/// Empty tags are treated as no tag at all.
pub fn format_version(
    ordinal: u64,
    merge_base: &str,
    pristine: bool,
    username: &str,
    tag: Option<&str>,
) -> Version {
    let short_id = merge_base
        .char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(merge_base, |(end, _)| &merge_base[..end]);

    let mut version = format!("{ordinal}-{short_id}");
    if !pristine {
        version.push_str("-tainted-");
        version.push_str(username);
    }

    if let Some(tag) = tag.filter(|tag| !tag.is_empty()) {
        version.push('-');
        version.push_str(tag);
    }

    Version(version)
}
