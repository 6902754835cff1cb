//! Git repository operations for correlating a release range with its
//! commits.
//!
//! This module provides a narrow interface over the local clone of the
//! upstream project. It is the only place that talks to git, and everything
//! it returns is plain data so the mapping and formatting code can be tested
//! against canned fixtures instead of a real repository.
//!
//! - Remote URL lookup and forge project detection
//! - Commit range enumeration (direct and cherry-picked hashes)
//! - Tag description and reference resolution
//! - Remote ref containment for ref-walk pull request mapping
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let repo = GitRepo::open(Path::new("."))?;
//! let project = find_project(&repo, &["origin".into()], "github.com")?;
//! println!("{} from {}", project.slug, project.remote);
//! let shas = commits_between(&repo, "v4.0.10", "v4.0.11")?;
//! ```
use git2::{DescribeFormatOptions, DescribeOptions, ErrorCode, Oid};
use git_url_parse::{GitUrl, Scheme};
use log::*;
use std::{collections::BTreeSet, path::Path};

use crate::error::{FindBzsError, Result};

pub mod parse;

pub use parse::{cherry_picks, merge_pr_number, pr_ref_number};

/// Forge project found on a configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Remote the project was read from.
    pub remote: String,
    /// `owner/repo` slug.
    pub slug: String,
}

/// A single commit visited while walking a reference range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Full commit hash.
    pub id: String,
    /// Full commit message including trailers.
    pub message: String,
}

impl LogEntry {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }
}

/// Name and email of the person preparing the release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

/// Operations the release pipeline needs from the local clone.
#[cfg_attr(test, mockall::automock)]
pub trait Repo {
    /// Configured URL of the named remote, or `None` if no such remote.
    fn remote_url(&self, name: &str) -> Result<Option<String>>;

    /// Commits reachable from `new` but not from `old`.
    fn log(&self, old: &str, new: &str) -> Result<Vec<LogEntry>>;

    /// Merge commits reachable from `new` but not from `old`.
    fn merge_log(&self, old: &str, new: &str) -> Result<Vec<LogEntry>>;

    /// Describe a reference against the nearest tag, like
    /// `git describe --tags`.
    fn describe(&self, reference: &str) -> Result<String>;

    /// Resolve a reference to a full commit hash.
    fn rev_parse(&self, reference: &str) -> Result<String>;

    /// Whether `reference` names a tag.
    fn is_tag(&self, reference: &str) -> Result<bool>;

    /// Whether the commit object exists locally.
    fn has_commit(&self, sha: &str) -> bool;

    /// Fetch a single commit from the named remote.
    fn fetch(&self, remote: &str, sha: &str) -> Result<()>;

    /// Remote ref names (e.g. `origin/pr/42`) whose history contains `sha`.
    fn refs_containing(&self, sha: &str) -> Result<Vec<String>>;

    /// `user.name` / `user.email` from the git configuration.
    fn identity(&self) -> Result<Identity>;
}

/// [`Repo`] implementation backed by a local clone opened with `git2`.
pub struct GitRepo {
    repo: git2::Repository,
}

impl GitRepo {
    /// Open the repository containing `path`, searching parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = git2::Repository::discover(path)?;
        debug!(
            "opened git repository at {}",
            repo.workdir().unwrap_or(repo.path()).display()
        );
        Ok(Self { repo })
    }

    fn resolve(&self, reference: &str) -> Result<Oid> {
        let object = self.repo.revparse_single(reference)?;
        Ok(object.peel_to_commit()?.id())
    }

    fn walk(
        &self,
        old: &str,
        new: &str,
        merges_only: bool,
    ) -> Result<Vec<LogEntry>> {
        let mut walk = self.repo.revwalk()?;
        walk.push(self.resolve(new)?)?;
        walk.hide(self.resolve(old)?)?;

        let mut entries = vec![];

        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;

            if merges_only && commit.parent_count() < 2 {
                continue;
            }

            entries.push(LogEntry {
                id: commit.id().to_string(),
                message: commit.message().unwrap_or_default().to_string(),
            });
        }

        Ok(entries)
    }
}

impl Repo for GitRepo {
    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn log(&self, old: &str, new: &str) -> Result<Vec<LogEntry>> {
        self.walk(old, new, false)
    }

    fn merge_log(&self, old: &str, new: &str) -> Result<Vec<LogEntry>> {
        self.walk(old, new, true)
    }

    fn describe(&self, reference: &str) -> Result<String> {
        let object = self.repo.revparse_single(reference)?;

        let mut opts = DescribeOptions::new();
        opts.describe_tags();

        let mut format = DescribeFormatOptions::new();
        format.abbreviated_size(7);

        let described = object.describe(&opts)?.format(Some(&format))?;
        Ok(described)
    }

    fn rev_parse(&self, reference: &str) -> Result<String> {
        Ok(self.resolve(reference)?.to_string())
    }

    fn is_tag(&self, reference: &str) -> Result<bool> {
        let name = format!("refs/tags/{reference}");
        match self.repo.find_reference(&name) {
            Ok(_) => Ok(true),
            Err(err)
                if matches!(
                    err.code(),
                    ErrorCode::NotFound | ErrorCode::InvalidSpec
                ) =>
            {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn has_commit(&self, sha: &str) -> bool {
        Oid::from_str(sha)
            .ok()
            .and_then(|oid| self.repo.find_commit(oid).ok())
            .is_some()
    }

    fn fetch(&self, remote: &str, sha: &str) -> Result<()> {
        info!("fetching {sha} from {remote}");
        let mut remote = self.repo.find_remote(remote)?;
        remote.fetch(&[sha], None, None)?;
        Ok(())
    }

    fn refs_containing(&self, sha: &str) -> Result<Vec<String>> {
        let oid = Oid::from_str(sha)?;
        let mut names = vec![];

        for reference in self.repo.references()? {
            let reference = reference?;

            let Some(name) = reference.name() else {
                continue;
            };

            let Some(short) = name
                .strip_prefix("refs/remotes/")
                .or_else(|| name.strip_prefix("refs/"))
                .filter(|_| !reference.is_branch() && !reference.is_tag())
            else {
                continue;
            };

            let Ok(target) = reference.peel_to_commit() else {
                continue;
            };

            if target.id() == oid
                || self.repo.graph_descendant_of(target.id(), oid)?
            {
                names.push(short.to_string());
            }
        }

        Ok(names)
    }

    fn identity(&self) -> Result<Identity> {
        let config = self.repo.config()?.snapshot()?;
        Ok(Identity {
            name: config.get_string("user.name")?,
            email: config.get_string("user.email")?,
        })
    }
}

/// Determine the forge project (e.g. `ceph/ceph-ansible`) from the first of
/// `remotes` whose URL points at `host`.
pub fn find_project(
    repo: &dyn Repo,
    remotes: &[String],
    host: &str,
) -> Result<Project> {
    let mut tried = vec![];

    for name in remotes {
        let Some(url) = repo.remote_url(name)? else {
            debug!("remote {name} is not configured");
            continue;
        };

        match parse_project(&url, host) {
            Ok(slug) => {
                debug!("using remote {name} for project {slug}");
                return Ok(Project {
                    remote: name.clone(),
                    slug,
                });
            }
            Err(err) => {
                debug!("skipping remote {name}: {err}");
                tried.push(url);
            }
        }
    }

    Err(FindBzsError::configuration(format!(
        "could not find a {host} project in remotes [{}]: tried [{}]",
        remotes.join(", "),
        tried.join(", ")
    )))
}

/// Parse a remote URL into an `owner/repo` project slug on `host`.
pub fn parse_project(url: &str, host: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let parsed = GitUrl::parse(trimmed)?;

    if !matches!(
        parsed.scheme,
        Scheme::Ssh | Scheme::GitSsh | Scheme::Git | Scheme::Https | Scheme::Http
    ) {
        return Err(FindBzsError::InvalidRemoteUrl(url.to_string()));
    }

    if parsed.host.as_deref() != Some(host) {
        return Err(FindBzsError::InvalidRemoteUrl(url.to_string()));
    }

    let owner = parsed
        .owner
        .ok_or_else(|| FindBzsError::InvalidRemoteUrl(url.to_string()))?;

    let name = parsed.name.trim_end_matches(".git");

    if owner.is_empty() || name.is_empty() {
        return Err(FindBzsError::InvalidRemoteUrl(url.to_string()));
    }

    Ok(format!("{owner}/{name}"))
}

/// Set of commit hashes introduced between `old` and `new`, including any
/// hash named in a `cherry picked from commit` trailer along the way.
pub fn commits_between(
    repo: &dyn Repo,
    old: &str,
    new: &str,
) -> Result<BTreeSet<String>> {
    let mut shas = BTreeSet::new();

    for entry in repo.log(old, new)? {
        shas.extend(cherry_picks(&entry.message)?);
        shas.insert(entry.id);
    }

    debug!("found {} commits between {old} and {new}", shas.len());

    Ok(shas)
}
