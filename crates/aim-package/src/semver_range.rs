//! npm version ranges evaluated with the `semver` crate.
//!
//! `semver::VersionReq` follows Cargo's rules, which differ from npm's in a
//! few places that matter here:
//!
//! - npm unions alternatives with `||`; Cargo has no union
//! - npm separates comparators with spaces; Cargo uses commas
//! - a bare `1.2.3` means exactly `=1.2.3` to npm but `^1.2.3` to Cargo
//! - npm has hyphen ranges (`1.0.0 - 2.0.0`) and `latest`
//!
//! [`NpmRange::parse`] rewrites npm syntax into Cargo requirements, one per
//! `||` alternative.

use std::fmt;

use semver::{Version, VersionReq};

use crate::error::PackageError;

/// A parsed npm version range.
///
/// # Examples
///
/// ```
/// use aim_package::NpmRange;
/// use semver::Version;
///
/// let range = NpmRange::parse("^1.2.0 || >= 3.0.0 < 4")?;
/// assert!(range.satisfies(&Version::new(1, 9, 0)));
/// assert!(range.satisfies(&Version::new(3, 5, 1)));
/// assert!(!range.satisfies(&Version::new(2, 0, 0)));
///
/// // A bare version is exact, as npm reads it.
/// let exact = NpmRange::parse("1.2.3")?;
/// assert!(!exact.satisfies(&Version::new(1, 2, 4)));
/// # Ok::<(), aim_package::PackageError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    source: String,
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Parses an npm range.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::InvalidRange`] if any alternative cannot be
    /// expressed as a Cargo requirement.
    pub fn parse(range: &str) -> Result<Self, PackageError> {
        let alternatives = range
            .split("||")
            .map(|alternative| parse_alternative(alternative.trim(), range))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: range.to_owned(),
            alternatives,
        })
    }

    /// The range as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `version` falls in the range.
    ///
    /// Prereleases are accepted when their release would be, e.g.
    /// `2.1.0-beta.1` satisfies `^2.0.0`. This approximates npm's
    /// `includePrerelease` for the common case of a prerelease on a matching
    /// release line.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        if self.alternatives.iter().any(|req| req.matches(version)) {
            return true;
        }
        if version.pre.is_empty() {
            return false;
        }
        let release = Version::new(version.major, version.minor, version.patch);
        self.alternatives.iter().any(|req| req.matches(&release))
    }
}

impl fmt::Display for NpmRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses one `||` alternative.
fn parse_alternative(alternative: &str, whole: &str) -> Result<VersionReq, PackageError> {
    if matches!(alternative, "" | "*" | "x" | "X" | "latest") {
        return Ok(VersionReq::STAR);
    }

    let converted = if let Some((low, high)) = alternative.split_once(" - ") {
        format!(
            ">={}, <={}",
            strip_wildcards(low.trim()),
            strip_wildcards(high.trim())
        )
    } else {
        comparators(alternative).join(", ")
    };

    VersionReq::parse(&converted).map_err(|e| PackageError::invalid_range(whole, e))
}

/// Splits space-separated comparators, attaching detached operators
/// (`>= 1.0.0`) to their version and normalizing each one.
fn comparators(alternative: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending_op = String::new();

    for token in alternative.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{pending_op}{token}");
        pending_op.clear();
        out.push(normalize_comparator(&token));
    }

    out
}

/// Rewrites a single npm comparator into Cargo syntax.
fn normalize_comparator(token: &str) -> String {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = strip_wildcards(version.trim_start_matches(['v', 'V']));

    let op = match op {
        // npm's bare version is exact; `=1.2` in Cargo also covers npm's
        // partial `1.2` meaning `1.2.x`.
        "" => "=",
        "~>" => "~",
        other => other,
    };

    if version.is_empty() {
        // `>=*`, `^x` and friends.
        return "*".to_owned();
    }
    format!("{op}{version}")
}

/// Drops trailing `x`/`X`/`*` components: `1.2.x` becomes `1.2`.
fn strip_wildcards(version: &str) -> &str {
    let mut version = version;
    loop {
        let trimmed = version
            .strip_suffix(".x")
            .or_else(|| version.strip_suffix(".X"))
            .or_else(|| version.strip_suffix(".*"));
        match trimmed {
            Some(rest) => version = rest,
            None => break,
        }
    }
    if matches!(version, "x" | "X" | "*") {
        ""
    } else {
        version
    }
}
