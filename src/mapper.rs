//! Maps the commits of a release range to the pull requests that merged
//! them.
//!
//! Three strategies are available:
//!
//! - [`Strategy::Search`]: ask the forge search API which merged pull
//!   request contains each commit. Responses are cached on disk and the
//!   search quota is threaded through every call.
//! - [`Strategy::MergeLog`]: read `Merge pull request #N` summaries of the
//!   merge commits in the range.
//! - [`Strategy::RefWalk`]: find the pull request refs fetched from the
//!   remote that contain each commit.
//!
//! A commit that maps to no pull request is logged and skipped: cherry-picks
//! from abandoned branches commonly name such hashes. A commit that maps to
//! more than one pull request aborts the run.
use clap::ValueEnum;
use log::*;
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::{
    cache::ResponseCache,
    error::{FindBzsError, Result},
    forge::{
        traits::PullRequestSearch,
        types::{RateLimit, SearchResponse},
    },
    repo::{Repo, commits_between, merge_pr_number, pr_ref_number},
};

/// How commits are mapped to pull requests.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Forge search API, one query per commit.
    #[default]
    Search,
    /// Merge commit summaries in the range.
    MergeLog,
    /// Remote pull request refs containing each commit.
    RefWalk,
}

/// Collaborators shared by every strategy.
pub struct Mapper<'a> {
    pub repo: &'a dyn Repo,
    pub search: &'a dyn PullRequestSearch,
    pub cache: &'a ResponseCache,
    /// Forge project slug, e.g. `ceph/ceph-ansible`.
    pub project: &'a str,
    /// Remote fetched from by the ref-walk strategy.
    pub remote: &'a str,
}

impl Mapper<'_> {
    /// All pull request numbers for commits between `old` and `new`.
    pub async fn find_all_prs(
        &self,
        strategy: Strategy,
        old: &str,
        new: &str,
    ) -> Result<BTreeSet<u64>> {
        let prs = match strategy {
            Strategy::Search => self.search_prs(old, new).await?,
            Strategy::MergeLog => self.merge_log_prs(old, new)?,
            Strategy::RefWalk => self.ref_walk_prs(old, new)?,
        };

        info!("found {} pull requests between {old} and {new}", prs.len());

        Ok(prs)
    }

    async fn search_prs(&self, old: &str, new: &str) -> Result<BTreeSet<u64>> {
        let mut prs = BTreeSet::new();
        let mut quota = RateLimit::default();

        for sha in commits_between(self.repo, old, new)? {
            let (pr, next) = self.pr_for_sha(&sha, quota).await?;
            quota = next;
            prs.extend(pr);
        }

        Ok(prs)
    }

    /// Pull request that merged `sha`, consulting the cache before the
    /// forge.
    pub async fn pr_for_sha(
        &self,
        sha: &str,
        quota: RateLimit,
    ) -> Result<(Option<u64>, RateLimit)> {
        let (body, quota) = match self.cache.get(sha).await? {
            Some(body) => (body, quota),
            None => {
                debug!("querying forge for {sha}");
                let (body, quota) =
                    self.search.search_merged(self.project, sha, quota).await?;
                self.cache.put(sha, &body).await?;
                (body, quota)
            }
        };

        let response: SearchResponse = serde_json::from_str(&body)?;

        match response.total_count {
            0 => {
                warn!("could not find merged PR for {sha}");
                Ok((None, quota))
            }
            1 => {
                let item = response.items.first().ok_or_else(|| {
                    FindBzsError::MalformedResponse(format!(
                        "search items for {sha}"
                    ))
                })?;
                Ok((Some(item.number), quota))
            }
            count => Err(FindBzsError::ambiguous(self.project, sha, count)),
        }
    }

    fn merge_log_prs(&self, old: &str, new: &str) -> Result<BTreeSet<u64>> {
        let mut prs = BTreeSet::new();

        for entry in self.repo.merge_log(old, new)? {
            let summary = entry.summary();
            match merge_pr_number(summary)? {
                Some(pr) => {
                    debug!("{} merged pull request #{pr}", entry.id);
                    prs.insert(pr);
                }
                None => {
                    return Err(FindBzsError::UnrecognizedMerge {
                        sha: entry.id.clone(),
                        summary: summary.to_string(),
                    });
                }
            }
        }

        Ok(prs)
    }

    fn ref_walk_prs(&self, old: &str, new: &str) -> Result<BTreeSet<u64>> {
        let mut prs = BTreeSet::new();

        for sha in commits_between(self.repo, old, new)? {
            prs.extend(self.pr_for_ref(&sha)?);
        }

        Ok(prs)
    }

    /// Pull request whose remote ref contains `sha`, fetching the commit
    /// first when it is not available locally.
    pub fn pr_for_ref(&self, sha: &str) -> Result<Option<u64>> {
        if !self.repo.has_commit(sha) {
            if let Err(err) = self.repo.fetch(self.remote, sha) {
                if !err.is_missing_object() {
                    return Err(err);
                }
                debug!("{} does not have {sha}: {err}", self.remote);
            }

            if !self.repo.has_commit(sha) {
                warn!("could not find commit {sha}");
                return Ok(None);
            }
        }

        let mut numbers = BTreeSet::new();

        for name in self.repo.refs_containing(sha)? {
            if let Some(pr) = pr_ref_number(&name)? {
                debug!("{name} contains {sha}");
                numbers.insert(pr);
            }
        }

        match numbers.len() {
            0 => {
                warn!("could not find pull request ref containing {sha}");
                Ok(None)
            }
            1 => Ok(numbers.into_iter().next()),
            count => Err(FindBzsError::ambiguous(
                self.project,
                sha,
                count as u64,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        forge::traits::MockPullRequestSearch,
        repo::{LogEntry, MockRepo},
    };
    use tempfile::TempDir;

    const PROJECT: &str = "org/repo";

    fn search_body(numbers: &[u64]) -> String {
        let items = numbers
            .iter()
            .map(|n| format!(r#"{{"number":{n}}}"#))
            .collect::<Vec<_>>()
            .join(",");
        format!(r#"{{"total_count":{},"items":[{items}]}}"#, numbers.len())
    }

    fn entry(id: &str, message: &str) -> LogEntry {
        LogEntry {
            id: id.into(),
            message: message.into(),
        }
    }

    fn mapper<'a>(
        repo: &'a MockRepo,
        search: &'a MockPullRequestSearch,
        cache: &'a ResponseCache,
    ) -> Mapper<'a> {
        Mapper {
            repo,
            search,
            cache,
            project: PROJECT,
            remote: "origin",
        }
    }

    #[tokio::test]
    async fn search_maps_single_result() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let repo = MockRepo::new();
        let mut search = MockPullRequestSearch::new();
        search
            .expect_search_merged()
            .times(1)
            .returning(|_, _, _| Ok((search_body(&[42]), RateLimit::new(5))));

        let (pr, quota) = mapper(&repo, &search, &cache)
            .pr_for_sha("abc123", RateLimit::default())
            .await
            .unwrap();

        assert_eq!(pr, Some(42));
        assert_eq!(quota, RateLimit::new(5));
    }

    #[tokio::test]
    async fn search_zero_results_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_log().returning(|_, _| {
            Ok(vec![
                entry("aaa", "fix\n\n(cherry picked from commit orphan)"),
            ])
        });
        let mut search = MockPullRequestSearch::new();
        search.expect_search_merged().returning(|_, sha, quota| {
            if sha == "orphan" {
                Ok((search_body(&[]), quota))
            } else {
                Ok((search_body(&[7]), quota))
            }
        });

        let prs = mapper(&repo, &search, &cache)
            .find_all_prs(Strategy::Search, "v1", "v2")
            .await
            .unwrap();

        assert_eq!(prs.into_iter().collect::<Vec<_>>(), vec![7]);
    }

    #[tokio::test]
    async fn search_multiple_results_is_ambiguous() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let repo = MockRepo::new();
        let mut search = MockPullRequestSearch::new();
        search
            .expect_search_merged()
            .returning(|_, _, quota| Ok((search_body(&[1, 2]), quota)));

        let result = mapper(&repo, &search, &cache)
            .pr_for_sha("abc123", RateLimit::default())
            .await;

        assert!(matches!(
            result,
            Err(FindBzsError::AmbiguousMapping { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn search_uses_cache_before_network() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        cache.put("abc123", &search_body(&[99])).await.unwrap();

        let repo = MockRepo::new();
        let mut search = MockPullRequestSearch::new();
        search.expect_search_merged().times(0);

        let (pr, quota) = mapper(&repo, &search, &cache)
            .pr_for_sha("abc123", RateLimit::new(3))
            .await
            .unwrap();

        assert_eq!(pr, Some(99));
        assert_eq!(quota, RateLimit::new(3));
    }

    #[tokio::test]
    async fn search_caches_raw_response() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let repo = MockRepo::new();
        let mut search = MockPullRequestSearch::new();
        search
            .expect_search_merged()
            .times(1)
            .returning(|_, _, quota| Ok((search_body(&[8]), quota)));

        let mapper = mapper(&repo, &search, &cache);
        mapper.pr_for_sha("abc", RateLimit::new(1)).await.unwrap();
        let (pr, _) = mapper.pr_for_sha("abc", RateLimit::new(1)).await.unwrap();

        assert_eq!(pr, Some(8));
        assert_eq!(
            cache.get("abc").await.unwrap(),
            Some(search_body(&[8]))
        );
    }

    #[tokio::test]
    async fn search_threads_quota_between_calls() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_log()
            .returning(|_, _| Ok(vec![entry("aaa", "a"), entry("bbb", "b")]));
        let mut search = MockPullRequestSearch::new();
        search
            .expect_search_merged()
            .with(
                mockall::predicate::always(),
                mockall::predicate::eq("aaa"),
                mockall::predicate::eq(RateLimit::default()),
            )
            .returning(|_, _, _| Ok((search_body(&[1]), RateLimit::new(29))));
        search
            .expect_search_merged()
            .with(
                mockall::predicate::always(),
                mockall::predicate::eq("bbb"),
                mockall::predicate::eq(RateLimit::new(29)),
            )
            .returning(|_, _, _| Ok((search_body(&[2]), RateLimit::new(28))));

        let prs = mapper(&repo, &search, &cache)
            .find_all_prs(Strategy::Search, "v1", "v2")
            .await
            .unwrap();

        assert_eq!(prs.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn merge_log_parses_summaries() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_merge_log().returning(|_, _| {
            Ok(vec![
                entry("abc123", "Merge pull request #42 from foo/bar\n\nbody"),
                entry("def456", "Merge pull request #43 from foo/baz"),
            ])
        });
        let search = MockPullRequestSearch::new();

        let prs = mapper(&repo, &search, &cache)
            .find_all_prs(Strategy::MergeLog, "v1", "v2")
            .await
            .unwrap();

        assert_eq!(prs.into_iter().collect::<Vec<_>>(), vec![42, 43]);
    }

    #[tokio::test]
    async fn merge_log_unrecognized_summary_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_merge_log().returning(|_, _| {
            Ok(vec![entry("abc123", "Merge branch 'main' into stable")])
        });
        let search = MockPullRequestSearch::new();

        let result = mapper(&repo, &search, &cache)
            .find_all_prs(Strategy::MergeLog, "v1", "v2")
            .await;

        assert!(matches!(
            result,
            Err(FindBzsError::UnrecognizedMerge { .. })
        ));
    }

    #[test]
    fn ref_walk_single_pull_request_ref() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_has_commit().returning(|_| true);
        repo.expect_refs_containing().returning(|_| {
            Ok(vec![
                "origin/main".into(),
                "origin/pr/42".into(),
                "upstream/pr/42".into(),
            ])
        });
        let search = MockPullRequestSearch::new();

        let pr = mapper(&repo, &search, &cache).pr_for_ref("abc").unwrap();

        assert_eq!(pr, Some(42));
    }

    #[test]
    fn ref_walk_fetches_missing_commit_and_skips_when_still_missing() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_has_commit().times(2).returning(|_| false);
        repo.expect_fetch()
            .with(mockall::predicate::eq("origin"), mockall::predicate::eq("abc"))
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_refs_containing().times(0);
        let search = MockPullRequestSearch::new();

        let pr = mapper(&repo, &search, &cache).pr_for_ref("abc").unwrap();

        assert_eq!(pr, None);
    }

    #[test]
    fn ref_walk_multiple_pull_request_refs_is_ambiguous() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_has_commit().returning(|_| true);
        repo.expect_refs_containing()
            .returning(|_| Ok(vec!["origin/pr/1".into(), "origin/pr/2".into()]));
        let search = MockPullRequestSearch::new();

        let result = mapper(&repo, &search, &cache).pr_for_ref("abc");

        assert!(matches!(
            result,
            Err(FindBzsError::AmbiguousMapping { count: 2, .. })
        ));
    }

    #[test]
    fn ref_walk_without_pull_request_refs_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_has_commit().returning(|_| true);
        repo.expect_fetch().times(0);
        repo.expect_refs_containing().returning(|_| {
            Ok(vec!["origin/main".into(), "origin/stable-4.0".into()])
        });
        let search = MockPullRequestSearch::new();

        let pr = mapper(&repo, &search, &cache).pr_for_ref("abc").unwrap();

        assert_eq!(pr, None);
    }

    #[test]
    fn ref_walk_fetch_network_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_has_commit().times(1).returning(|_| false);
        repo.expect_fetch().returning(|_, _| {
            Err(git2::Error::new(
                git2::ErrorCode::GenericError,
                git2::ErrorClass::Net,
                "failed to connect to 127.0.0.1: Connection refused",
            )
            .into())
        });
        repo.expect_refs_containing().times(0);
        let search = MockPullRequestSearch::new();

        let result = mapper(&repo, &search, &cache).pr_for_ref("abc");

        assert!(matches!(result, Err(FindBzsError::GitError(_))));
    }

    #[test]
    fn ref_walk_commit_unknown_to_remote_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path());
        let mut repo = MockRepo::new();
        repo.expect_has_commit().times(2).returning(|_| false);
        repo.expect_fetch().returning(|_, _| {
            Err(git2::Error::new(
                git2::ErrorCode::GenericError,
                git2::ErrorClass::Net,
                "remote error: upload-pack: not our ref 0123456789abcdef",
            )
            .into())
        });
        let search = MockPullRequestSearch::new();

        let pr = mapper(&repo, &search, &cache).pr_for_ref("abc").unwrap();

        assert_eq!(pr, None);
    }
}
