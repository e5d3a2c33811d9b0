//! Scheme-qualified version comparison.
//!
//! A [`Version`] is just upstream text plus a port-version counter; it only
//! becomes ordered once paired with a [`VersionScheme`] in a
//! [`SchemedVersion`]. Comparing across schemes is a programming error in
//! the planner and is reported as [`Error::VersionSchemeMismatch`], never
//! silently guessed at.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode};
use crate::Result;

/// The version comparison discipline a port declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionScheme {
    /// Strict `MAJOR.MINOR.PATCH[-pre][+build]` semver comparison.
    Semver,
    /// Dot-separated numeric fields compared pairwise, with an arbitrary
    /// string tail broken out and compared lexicographically once the
    /// numeric fields are exhausted or diverge on a non-numeric field.
    Relaxed,
    /// A `YYYY-MM-DD` date prefix compared as a calendar date, plus an
    /// arbitrary tail compared lexicographically as a tiebreaker.
    Date,
    /// Opaque text; only equality is meaningful.
    String,
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Semver => "semver",
            Self::Relaxed => "relaxed",
            Self::Date => "date",
            Self::String => "string",
        };
        write!(f, "{s}")
    }
}

/// Upstream version text plus the port-version counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    text: String,
    port_version: u64,
}

impl Version {
    /// Build a version from upstream text and a port-version counter.
    #[must_use]
    pub fn new(text: impl Into<String>, port_version: u64) -> Self {
        Self {
            text: text.into(),
            port_version,
        }
    }

    /// The upstream version text, e.g. `1.2.3`.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The port-version counter (bumped when the recipe changes without an
    /// upstream version bump).
    #[must_use]
    pub fn port_version(&self) -> u64 {
        self.port_version
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port_version == 0 {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{}#{}", self.text, self.port_version)
        }
    }
}

/// A [`Version`] paired with the [`VersionScheme`] it must be compared under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemedVersion {
    scheme: VersionScheme,
    version: Version,
}

impl SchemedVersion {
    /// Pair a version with its scheme.
    #[must_use]
    pub fn new(scheme: VersionScheme, version: Version) -> Self {
        Self { scheme, version }
    }

    /// The scheme this version must be compared under.
    #[must_use]
    pub fn scheme(&self) -> VersionScheme {
        self.scheme
    }

    /// The underlying version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Compare two schemed versions, erroring if the schemes differ.
    ///
    /// Within the `string` scheme, two unequal texts are also reported as a
    /// scheme mismatch: ordering is genuinely undefined there, and the
    /// planner must never silently pick one.
    pub fn try_cmp(&self, other: &Self, port_name: &str) -> Result<Ordering> {
        if self.scheme != other.scheme {
            return Err(Error::VersionSchemeMismatch {
                code: ErrorCode::VersionSchemeMismatch,
                name: port_name.to_string(),
                scheme_a: self.scheme.to_string(),
                scheme_b: other.scheme.to_string(),
            });
        }
        compare_text(self.scheme, &self.version.text, &other.version.text)
            .map(|ord| ord.then_with(|| self.version.port_version.cmp(&other.version.port_version)))
            .ok_or_else(|| Error::VersionSchemeMismatch {
                code: ErrorCode::VersionSchemeMismatch,
                name: port_name.to_string(),
                scheme_a: format!("{} {}", self.scheme, self.version.text),
                scheme_b: format!("{} {}", other.scheme, other.version.text),
            })
    }
}

impl fmt::Display for SchemedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

/// Compare two version texts under `scheme`. Returns `None` only for the
/// `string` scheme when the texts are unequal (ordering undefined).
fn compare_text(scheme: VersionScheme, a: &str, b: &str) -> Option<Ordering> {
    match scheme {
        VersionScheme::Semver => compare_semver(a, b),
        VersionScheme::Relaxed => Some(compare_relaxed(a, b)),
        VersionScheme::Date => Some(compare_date(a, b)),
        VersionScheme::String => {
            if a == b {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
    }
}

fn compare_semver(a: &str, b: &str) -> Option<Ordering> {
    let pa = semver::Version::parse(a);
    let pb = semver::Version::parse(b);
    match (pa, pb) {
        (Ok(pa), Ok(pb)) => Some(pa.cmp(&pb)),
        // Fall back to relaxed comparison for malformed-but-equal-ish texts
        // rather than declaring every unparsable semver string incomparable.
        _ if a == b => Some(Ordering::Equal),
        _ => Some(compare_relaxed(a, b)),
    }
}

/// Dot-separated numeric fields compared pairwise; first non-numeric field
/// (or length mismatch) falls back to a lexicographic tail comparison.
fn compare_relaxed(a: &str, b: &str) -> Ordering {
    let mut ai = a.split('.');
    let mut bi = b.split('.');
    loop {
        match (ai.next(), bi.next()) {
            (Some(x), Some(y)) => match (x.parse::<u64>(), y.parse::<u64>()) {
                (Ok(nx), Ok(ny)) => match nx.cmp(&ny) {
                    Ordering::Equal => continue,
                    other => return other,
                },
                _ => return x.cmp(y),
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// `YYYY-MM-DD` prefix compared as a calendar date; remaining tail compared
/// lexicographically as a tiebreaker.
fn compare_date(a: &str, b: &str) -> Ordering {
    let (date_a, tail_a) = split_date_prefix(a);
    let (date_b, tail_b) = split_date_prefix(b);
    match (date_a, date_b) {
        (Some(da), Some(db)) => da.cmp(&db).then_with(|| tail_a.cmp(tail_b)),
        _ => a.cmp(b),
    }
}

fn split_date_prefix(s: &str) -> (Option<chrono::NaiveDate>, &str) {
    if s.len() < 10 {
        return (None, s);
    }
    let (prefix, tail) = s.split_at(10);
    let date = chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok();
    (date, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(scheme: VersionScheme, text: &str) -> SchemedVersion {
        SchemedVersion::new(scheme, Version::new(text, 0))
    }

    #[test]
    fn semver_orders_by_semantic_version() {
        let a = sv(VersionScheme::Semver, "1.2.0");
        let b = sv(VersionScheme::Semver, "1.10.0");
        assert_eq!(a.try_cmp(&b, "p").unwrap(), Ordering::Less);
    }

    #[test]
    fn relaxed_orders_numeric_fields_not_lexicographically() {
        let a = sv(VersionScheme::Relaxed, "1.9");
        let b = sv(VersionScheme::Relaxed, "1.10");
        assert_eq!(a.try_cmp(&b, "p").unwrap(), Ordering::Less);
    }

    #[test]
    fn date_orders_as_calendar_dates() {
        let a = sv(VersionScheme::Date, "2023-01-01.1");
        let b = sv(VersionScheme::Date, "2023-12-31.0");
        assert_eq!(a.try_cmp(&b, "p").unwrap(), Ordering::Less);
    }

    #[test]
    fn port_version_breaks_ties_within_a_scheme() {
        let a = SchemedVersion::new(VersionScheme::Relaxed, Version::new("1.0", 1));
        let b = SchemedVersion::new(VersionScheme::Relaxed, Version::new("1.0", 2));
        assert_eq!(a.try_cmp(&b, "p").unwrap(), Ordering::Less);
    }

    #[test]
    fn cross_scheme_comparison_errors() {
        let a = sv(VersionScheme::Semver, "1.0.0");
        let b = sv(VersionScheme::Relaxed, "1.0.0");
        assert!(a.try_cmp(&b, "p").is_err());
    }

    #[test]
    fn string_scheme_is_equality_only() {
        let a = sv(VersionScheme::String, "release-42");
        let b = sv(VersionScheme::String, "release-42");
        assert_eq!(a.try_cmp(&b, "p").unwrap(), Ordering::Equal);
        let c = sv(VersionScheme::String, "release-43");
        assert!(a.try_cmp(&c, "p").is_err());
    }
}
