//! Renders the changelog stanza, packaging commands and browse links for a
//! release.
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Deserialize;
use std::{collections::BTreeSet, fmt};
use textwrap::{Options, WordSplitter};

use crate::version::{DescribedRef, PackageVersion};

/// Separator printed between report sections.
pub const BANNER: &str = "================";
/// Column at which the changelog body wraps.
pub const CHANGELOG_WIDTH: usize = 70;
/// Date format of RPM `%changelog` entries.
pub const CHANGELOG_DATE_FORMAT: &str = "%a %b %d %Y";

/// How bug browse links are rendered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStyle {
    /// One `buglist.cgi` URL listing every bug.
    #[default]
    Single,
    /// One `show_bug.cgi` URL per bug.
    PerBug,
}

/// Who is cutting the release and how downstream packages are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packager {
    pub author: String,
    pub email: String,
    /// Downstream package name, e.g. `ceph-ansible`.
    pub package: String,
    /// RPM dist tag appended to the release, e.g. `el7cp`.
    pub dist_tag: String,
}

/// Everything the report needs, resolved ahead of time.
pub struct ReleaseContext<'a> {
    /// The "new" reference as given on the command line.
    pub new: &'a str,
    pub described: &'a DescribedRef,
    pub rpm: &'a PackageVersion,
    pub deb: &'a PackageVersion,
    /// Full hash of `new`, only when `new` is not a tag.
    pub full_hash: Option<&'a str>,
    pub bugs: &'a BTreeSet<u64>,
    pub date: NaiveDate,
    pub packager: &'a Packager,
    /// Bugzilla base URL, e.g. `https://bugzilla.redhat.com`.
    pub tracker_url: &'a str,
    pub link_style: LinkStyle,
}

/// `rhbz#A rhbz#B` for every bug in `bugs`.
pub fn rhbz_list(bugs: &BTreeSet<u64>) -> String {
    bugs.iter()
        .map(|bug| format!("rhbz#{bug}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bug_flag(bugs: &BTreeSet<u64>) -> String {
    if bugs.is_empty() {
        String::new()
    } else {
        format!(" -B \"{}\"", rhbz_list(bugs))
    }
}

/// RPM `%changelog` entry for the release.
pub fn rpm_changelog(ctx: &ReleaseContext) -> String {
    let mut changes = format!("Update to {}", ctx.new);

    if let Some(hash) = ctx.full_hash {
        changes = format!("{changes} ({hash})");
    }

    if !ctx.bugs.is_empty() {
        changes = format!("{changes} ({})", rhbz_list(ctx.bugs));
    }

    let options = Options::new(CHANGELOG_WIDTH)
        .initial_indent("- ")
        .subsequent_indent("  ")
        .word_splitter(WordSplitter::NoHyphenation);

    format!(
        "* {} {} <{}> - {}\n{}",
        ctx.date.format(CHANGELOG_DATE_FORMAT),
        ctx.packager.author,
        ctx.packager.email,
        ctx.rpm,
        textwrap::fill(&changes, options)
    )
}

/// `rdopkg` invocation for RHEL dist-git.
pub fn rdopkg_command(new: &str, bugs: &BTreeSet<u64>) -> String {
    let version = new.strip_prefix('v').unwrap_or(new);
    format!("rdopkg new-version {version}{}", bug_flag(bugs))
}

/// `rhcephpkg` invocation for Ubuntu dist-git.
pub fn rhcephpkg_command(bugs: &BTreeSet<u64>) -> String {
    format!("rhcephpkg new-version{}", bug_flag(bugs))
}

/// `bugzilla modify` invocation recording the fixed-in builds.
pub fn bugzilla_command(
    packager: &Packager,
    rpm: &PackageVersion,
    deb: &PackageVersion,
    bugs: &BTreeSet<u64>,
) -> String {
    let ids = bugs
        .iter()
        .map(|bug| bug.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let command = format!(
        "bugzilla modify -s MODIFIED -F \"RHEL: {pkg}-{rpm}.{dist} Ubuntu: {pkg}_{deb}\" {ids}",
        pkg = packager.package,
        dist = packager.dist_tag,
    );

    command.trim_end().to_string()
}

/// Browse links for `bugs` on the tracker at `tracker_url`.
pub fn query_links(
    tracker_url: &str,
    bugs: &BTreeSet<u64>,
    style: LinkStyle,
) -> Vec<String> {
    let base = tracker_url.trim_end_matches('/');

    match style {
        LinkStyle::Single => {
            let ids = bugs
                .iter()
                .map(|bug| bug.to_string())
                .collect::<Vec<_>>()
                .join(",");
            vec![format!("{base}/buglist.cgi?bug_id={ids}")]
        }
        LinkStyle::PerBug => bugs
            .iter()
            .map(|bug| format!("{base}/show_bug.cgi?id={bug}"))
            .collect(),
    }
}

/// Rendered output sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub changelog: String,
    /// Omitted for milestone releases, which are not built for RHEL.
    pub rhel_command: Option<String>,
    pub ubuntu_command: String,
    pub links: Vec<String>,
    pub bugzilla_command: String,
}

impl Report {
    pub fn render(ctx: &ReleaseContext) -> Self {
        let rhel_command = ctx
            .described
            .pre_release
            .is_none()
            .then(|| rdopkg_command(ctx.new, ctx.bugs));

        Self {
            changelog: rpm_changelog(ctx),
            rhel_command,
            ubuntu_command: rhcephpkg_command(ctx.bugs),
            links: query_links(ctx.tracker_url, ctx.bugs, ctx.link_style),
            bugzilla_command: bugzilla_command(
                ctx.packager,
                ctx.rpm,
                ctx.deb,
                ctx.bugs,
            ),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{BANNER}")?;
        writeln!(f, "{}", self.changelog)?;

        if let Some(command) = &self.rhel_command {
            writeln!(f, "{BANNER}")?;
            writeln!(f, "Command for RHEL dist-git:")?;
            writeln!(f, "{command}")?;
        }

        writeln!(f, "{BANNER}")?;
        writeln!(f, "Command for Ubuntu dist-git:")?;
        writeln!(f, "{}", self.ubuntu_command)?;

        writeln!(f, "{BANNER}")?;
        writeln!(f, "Query for browsing:")?;
        for link in &self.links {
            writeln!(f, "{link}")?;
        }

        writeln!(f, "{BANNER}")?;
        writeln!(f, "When RHEL and Ubuntu dist-git are committed:")?;
        writeln!(f, "{}", self.bugzilla_command)
    }
}
