//! Segment-wise path globbing shared by `path` conditions and the
//! token-embedded `acl.paths` gate.
//!
//! Globs are compiled with literal separators: `*` stays inside one segment
//! and a `**` segment spans zero or more whole segments, so `/**/allowed`
//! matches `/allowed` and `/app/page3/allowed` but not `/app/allowedish`.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

/// Compile a single path pattern.
pub fn path_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Compile a set of path patterns; a path matches if any pattern matches.
pub fn path_glob_set<'a, I>(patterns: I) -> Result<GlobSet, globset::Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(path_glob(pattern)?);
    }
    builder.build()
}
