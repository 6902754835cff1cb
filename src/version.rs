//! Packaging version rules for RPM and Debian changelogs.
//!
//! Both targets start from the same `git describe --tags` output, parsed
//! once into a [`DescribedRef`], and then apply their own rule table:
//!
//! | described          | RPM                        | Debian               |
//! |--------------------|----------------------------|----------------------|
//! | `v3.0.0`           | `3.0.0-1`                  | `3.0.0-2redhat1`     |
//! | `v3.0.0rc3`        | `3.0.0-0.1.rc3`            | `3.0.0~rc3-2redhat1` |
//! | `v3.0.0-5-gabc123` | `3.0.0-5.gabc123`          | not supported        |
//! | `v3.0.0rc3-5-gabc` | `3.0.0-0.1.rc3.5.gabc`     | not supported        |
use regex::Regex;
use std::fmt;

use crate::error::{FindBzsError, Result};

/// Release for an exact RPM tag without a milestone.
const RPM_FINAL_RELEASE: &str = "1";
/// Release prefix for RPM pre-releases (Fedora packaging guidelines).
const RPM_PRERELEASE_PREFIX: &str = "0.1";
/// Release for Debian builds of an exact tag.
const DEB_RELEASE: &str = "2redhat1";

/// Pre-release milestone markers, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Beta,
    Rc,
}

impl Milestone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Milestone::Beta => "beta",
            Milestone::Rc => "rc",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "beta" => Some(Milestone::Beta),
            "rc" => Some(Milestone::Rc),
            _ => None,
        }
    }
}

/// A milestone plus its number, e.g. `rc3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreRelease {
    pub milestone: Milestone,
    pub number: String,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.milestone.as_str(), self.number)
    }
}

/// Structured form of `git describe --tags` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedRef {
    /// Version with the `v` prefix and milestone removed, e.g. `3.0.0`.
    pub base_version: String,
    pub pre_release: Option<PreRelease>,
    /// Commits since the nearest tag; `None` for an exact tag.
    pub commits_since_tag: Option<u64>,
    /// Abbreviated hash without the `g` marker.
    pub short_hash: Option<String>,
}

impl DescribedRef {
    /// Parse `TAG` or `TAG-COMMITS-gSHA`.
    pub fn parse(described: &str) -> Result<Self> {
        let described = described.trim();

        let distance = Regex::new(
            r"^(?P<tag>.+)-(?P<commits>\d+)-g(?P<hash>[0-9a-fA-F]+)$",
        )?;

        let (tag, commits_since_tag, short_hash) =
            match distance.captures(described) {
                Some(caps) => {
                    let commits = caps["commits"].parse::<u64>().map_err(|e| {
                        FindBzsError::InvalidVersion(format!("{described}: {e}"))
                    })?;
                    (
                        caps.name("tag").map_or("", |m| m.as_str()),
                        Some(commits),
                        Some(caps["hash"].to_string()),
                    )
                }
                None => (described, None, None),
            };

        let version = tag.strip_prefix('v').unwrap_or(tag);

        if version.is_empty() {
            return Err(FindBzsError::InvalidVersion(format!(
                "no version in describe output \"{described}\""
            )));
        }

        let milestone = Regex::new(
            r"^(?P<base>.*?)[.\-_~]?(?P<label>beta|rc)(?P<number>\d*)$",
        )?;

        let (base_version, pre_release) = match milestone.captures(version) {
            Some(caps) if !caps["base"].is_empty() => {
                let pre = Milestone::from_label(&caps["label"]).map(
                    |milestone| PreRelease {
                        milestone,
                        number: caps["number"].to_string(),
                    },
                );
                (caps["base"].to_string(), pre)
            }
            _ => (version.to_string(), None),
        };

        Ok(Self {
            base_version,
            pre_release,
            commits_since_tag,
            short_hash,
        })
    }

    /// True when the reference is exactly a tag.
    pub fn is_exact_tag(&self) -> bool {
        self.commits_since_tag.is_none()
    }

    fn distance_suffix(&self) -> Option<String> {
        match (self.commits_since_tag, &self.short_hash) {
            (Some(commits), Some(hash)) => Some(format!("{commits}.g{hash}")),
            (Some(commits), None) => Some(commits.to_string()),
            _ => None,
        }
    }
}

/// Version and release pair for one packaging target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub version: String,
    pub release: String,
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}

/// Downstream packaging formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Rpm,
    Deb,
}

impl Target {
    /// Apply this target's rules to a described reference.
    pub fn format(&self, described: &DescribedRef) -> Result<PackageVersion> {
        match self {
            Target::Rpm => Ok(rpm(described)),
            Target::Deb => deb(described),
        }
    }
}

fn rpm(described: &DescribedRef) -> PackageVersion {
    let pre = described
        .pre_release
        .as_ref()
        .map(|pre| format!("{RPM_PRERELEASE_PREFIX}.{pre}"));

    let release = match (pre, described.distance_suffix()) {
        (Some(pre), Some(distance)) => format!("{pre}.{distance}"),
        (Some(pre), None) => pre,
        (None, Some(distance)) => distance,
        (None, None) => RPM_FINAL_RELEASE.to_string(),
    };

    PackageVersion {
        version: described.base_version.clone(),
        release,
    }
}

fn deb(described: &DescribedRef) -> Result<PackageVersion> {
    if !described.is_exact_tag() {
        return Err(FindBzsError::not_supported(format!(
            "Debian versions for untagged builds ({} commits past {})",
            described.commits_since_tag.unwrap_or_default(),
            described.base_version
        )));
    }

    let version = match &described.pre_release {
        Some(pre) => format!("{}~{pre}", described.base_version),
        None => described.base_version.clone(),
    };

    Ok(PackageVersion {
        version,
        release: DEB_RELEASE.to_string(),
    })
}

/// RPM `version-release` for `git describe` output.
pub fn rpm_version(described: &str) -> Result<String> {
    let parsed = DescribedRef::parse(described)?;
    Ok(Target::Rpm.format(&parsed)?.to_string())
}

/// Debian `version-release` for `git describe` output.
pub fn deb_version(described: &str) -> Result<String> {
    let parsed = DescribedRef::parse(described)?;
    Ok(Target::Deb.format(&parsed)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_tag() {
        let parsed = DescribedRef::parse("v3.0.0").unwrap();
        assert_eq!(
            parsed,
            DescribedRef {
                base_version: "3.0.0".into(),
                pre_release: None,
                commits_since_tag: None,
                short_hash: None,
            }
        );
        assert!(parsed.is_exact_tag());
    }

    #[test]
    fn parses_release_candidate_with_distance() {
        let parsed = DescribedRef::parse("v3.0.0rc2-14-g1a2b3c4\n").unwrap();
        assert_eq!(parsed.base_version, "3.0.0");
        assert_eq!(
            parsed.pre_release,
            Some(PreRelease {
                milestone: Milestone::Rc,
                number: "2".into()
            })
        );
        assert_eq!(parsed.commits_since_tag, Some(14));
        assert_eq!(parsed.short_hash.as_deref(), Some("1a2b3c4"));
    }

    #[test]
    fn parses_hyphenated_tag_names() {
        let parsed = DescribedRef::parse("stable-4.0-3-gdeadbee").unwrap();
        assert_eq!(parsed.base_version, "stable-4.0");
        assert_eq!(parsed.commits_since_tag, Some(3));
    }

    #[test]
    fn rejects_empty_describe_output() {
        assert!(matches!(
            DescribedRef::parse("v"),
            Err(FindBzsError::InvalidVersion(_))
        ));
    }

    #[test]
    fn rpm_exact_tags() {
        for (tag, expected) in [
            ("v1.2.3", "1.2.3-1"),
            ("v4.0.11", "4.0.11-1"),
            ("3.0.0", "3.0.0-1"),
        ] {
            assert_eq!(rpm_version(tag).unwrap(), expected, "{tag}");
        }
    }

    #[test]
    fn rpm_milestone_tags() {
        assert_eq!(rpm_version("v3.0.0rc3").unwrap(), "3.0.0-0.1.rc3");
        assert_eq!(rpm_version("v1.2.3rc10").unwrap(), "1.2.3-0.1.rc10");
        assert_eq!(rpm_version("v2.0.0beta1").unwrap(), "2.0.0-0.1.beta1");
    }

    #[test]
    fn rpm_commits_since_tag() {
        assert_eq!(rpm_version("v3.0.0-5-gabc1234").unwrap(), "3.0.0-5.gabc1234");
        assert_eq!(
            rpm_version("v3.0.0rc1-5-gabc1234").unwrap(),
            "3.0.0-0.1.rc1.5.gabc1234"
        );
    }

    #[test]
    fn deb_exact_tags() {
        assert_eq!(deb_version("v1.2.3").unwrap(), "1.2.3-2redhat1");
        assert_eq!(deb_version("v1.2.3rc1").unwrap(), "1.2.3~rc1-2redhat1");
        assert_eq!(deb_version("v2.0.0beta2").unwrap(), "2.0.0~beta2-2redhat1");
    }

    #[test]
    fn deb_commits_since_tag_is_not_supported() {
        for described in ["v1.2.3-1-gabcdef0", "v1.2.3rc1-20-g0000000"] {
            assert!(
                matches!(
                    deb_version(described),
                    Err(FindBzsError::NotSupported(_))
                ),
                "{described}"
            );
        }
    }
}
