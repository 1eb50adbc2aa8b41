//! Package version newtype.
//!
//! The packaging layer declares a semantic version string for each release.
//! That string is injected into the launcher, so it is validated up front:
//! a `MAJOR.MINOR.PATCH` numeric core with optional `-prerelease` and
//! `+build` suffixes. A leading `v` is rejected because the wrapped script
//! adds its own when printing `name v<version>`.

use super::error::{ArtefactError, Result};
use std::cmp::Ordering;
use std::fmt;

/// A validated semantic version string.
///
/// Ordering compares the numeric core first, so `1.0.10` sorts after
/// `1.0.9`. With equal cores a pre-release sorts below its release, and
/// anything else falls back to the full string.
///
/// # Examples
///
/// ```
/// use tfc_installer::artefact::version::PackageVersion;
///
/// let version = PackageVersion::try_from("2.0.6").expect("valid version");
/// assert_eq!(version.core(), (2, 0, 6));
/// assert!(PackageVersion::try_from("v2.0.6").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    raw: String,
    core: (u64, u64, u64),
}

impl PackageVersion {
    /// Return the version as written in the formula.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Return the numeric `(major, minor, patch)` core.
    #[must_use]
    pub fn core(&self) -> (u64, u64, u64) {
        self.core
    }

    /// Whether the version carries a `-prerelease` suffix.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.raw
            .split_once('+')
            .map_or(self.raw.as_str(), |(head, _)| head)
            .contains('-')
    }
}

impl TryFrom<&str> for PackageVersion {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        let core = parse_version(value)?;
        Ok(Self {
            raw: value.to_owned(),
            core,
        })
    }
}

impl TryFrom<String> for PackageVersion {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        let core = parse_version(&value)?;
        Ok(Self { raw: value, core })
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core
            .cmp(&other.core)
            .then_with(|| other.is_prerelease().cmp(&self.is_prerelease()))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid(value: &str, reason: impl Into<String>) -> ArtefactError {
    ArtefactError::InvalidVersion {
        value: value.to_owned(),
        reason: reason.into(),
    }
}

fn parse_version(value: &str) -> Result<(u64, u64, u64)> {
    if value.is_empty() {
        return Err(invalid(value, "version must not be empty"));
    }

    let (without_build, build) = match value.split_once('+') {
        Some((head, tail)) => (head, Some(tail)),
        None => (value, None),
    };
    let (core, prerelease) = match without_build.split_once('-') {
        Some((head, tail)) => (head, Some(tail)),
        None => (without_build, None),
    };

    for (label, suffix) in [("pre-release", prerelease), ("build", build)] {
        if let Some(text) = suffix {
            validate_suffix(value, label, text)?;
        }
    }

    let parts: Vec<&str> = core.split('.').collect();
    let [major, minor, patch] = parts.as_slice() else {
        return Err(invalid(
            value,
            format!("expected MAJOR.MINOR.PATCH, got {} component(s)", parts.len()),
        ));
    };

    Ok((
        parse_component(value, major)?,
        parse_component(value, minor)?,
        parse_component(value, patch)?,
    ))
}

fn parse_component(value: &str, component: &str) -> Result<u64> {
    if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(
            value,
            format!("component \"{component}\" is not a number"),
        ));
    }
    component
        .parse::<u64>()
        .map_err(|e| invalid(value, format!("component \"{component}\": {e}")))
}

fn validate_suffix(value: &str, label: &str, suffix: &str) -> Result<()> {
    let well_formed = !suffix.is_empty()
        && suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(invalid(value, format!("malformed {label} suffix \"{suffix}\"")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0.0", (1, 0, 0))]
    #[case("1.0.4", (1, 0, 4))]
    #[case("2.0.6-rc.1", (2, 0, 6))]
    #[case("2.0.6+build.7", (2, 0, 6))]
    #[case("10.20.30-beta-2+sha.abc", (10, 20, 30))]
    fn accepts_semantic_versions(#[case] input: &str, #[case] core: (u64, u64, u64)) {
        let version = PackageVersion::try_from(input).expect("valid version");
        assert_eq!(version.core(), core);
        assert_eq!(version.as_str(), input);
    }

    #[rstest]
    #[case::empty("")]
    #[case::leading_v("v1.0.4")]
    #[case::two_components("1.0")]
    #[case::four_components("1.0.0.0")]
    #[case::empty_prerelease("1.0.0-")]
    #[case::spaces("1.0.0 beta")]
    fn rejects_malformed_versions(#[case] input: &str) {
        let err = PackageVersion::try_from(input).expect_err("invalid version");
        assert!(matches!(err, ArtefactError::InvalidVersion { .. }));
    }

    #[test]
    fn orders_numerically() {
        let older = PackageVersion::try_from("1.0.9").expect("valid");
        let newer = PackageVersion::try_from("1.0.10").expect("valid");
        assert!(older < newer);
    }

    #[rstest]
    #[case::release_after_candidate("2.0.6-rc.1", "2.0.6")]
    #[case::release_with_build("2.0.6-rc.1", "2.0.6+build.7")]
    #[case::candidates_by_name("2.0.6-rc.1", "2.0.6-rc.2")]
    #[case::next_core("2.0.6", "2.0.7-alpha")]
    fn orders_prereleases_below_releases(#[case] older: &str, #[case] newer: &str) {
        let older = PackageVersion::try_from(older).expect("valid");
        let newer = PackageVersion::try_from(newer).expect("valid");
        assert!(older < newer, "{older} should sort before {newer}");
    }

    #[test]
    fn newest_of_a_sorted_list_is_the_release() {
        let mut versions: Vec<PackageVersion> = ["2.0.6", "2.0.6-rc.1", "2.0.5"]
            .into_iter()
            .map(|v| PackageVersion::try_from(v).expect("valid"))
            .collect();
        versions.sort();
        assert_eq!(versions.pop().map(|v| v.to_string()).as_deref(), Some("2.0.6"));
    }
}
