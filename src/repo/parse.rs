//! Parsers for the shapes git writes into commit messages and ref names.
use regex::Regex;

use crate::error::Result;

/// Hashes named in `cherry picked from commit <sha>` trailers.
pub fn cherry_picks(message: &str) -> Result<Vec<String>> {
    let regex = Regex::new(r"cherry picked from commit (\w+)")?;
    Ok(regex
        .captures_iter(message)
        .map(|caps| caps[1].to_string())
        .collect())
}

/// Pull request number from a `Merge pull request #N from ...` summary.
pub fn merge_pr_number(summary: &str) -> Result<Option<u64>> {
    let regex = Regex::new(r"^Merge pull request #(\d+)\b")?;
    Ok(regex
        .captures(summary.trim())
        .and_then(|caps| caps[1].parse().ok()))
}

/// Pull request number from a ref name such as `origin/pr/42` or
/// `pull/42/head`.
pub fn pr_ref_number(name: &str) -> Result<Option<u64>> {
    let regex = Regex::new(r"(?:^|/)(?:pr|pull)/(\d+)(?:/head|/merge)?$")?;
    Ok(regex
        .captures(name.trim())
        .and_then(|caps| caps[1].parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG_MESSAGE: &str = "\
ceph-defaults: fix rgw socket name

The socket name changed upstream.

Signed-off-by: Some One <someone@example.com>
(cherry picked from commit 5f1a0e2c27e7b6f1b8a9d3c4e5f60718293a4b5c)
";

    #[test]
    fn finds_cherry_pick_trailer() {
        assert_eq!(
            cherry_picks(LOG_MESSAGE).unwrap(),
            vec!["5f1a0e2c27e7b6f1b8a9d3c4e5f60718293a4b5c"]
        );
    }

    #[test]
    fn finds_multiple_cherry_pick_trailers() {
        let message = "backport\n\n(cherry picked from commit aaa)\n\
                       (cherry picked from commit bbb)";
        assert_eq!(cherry_picks(message).unwrap(), vec!["aaa", "bbb"]);
    }

    #[test]
    fn no_cherry_pick_trailer() {
        assert!(cherry_picks("plain commit").unwrap().is_empty());
    }

    #[test]
    fn parses_merge_summary() {
        assert_eq!(
            merge_pr_number("Merge pull request #42 from foo/bar").unwrap(),
            Some(42)
        );
        assert_eq!(
            merge_pr_number("Merge pull request #1234 from ceph/wip-fix")
                .unwrap(),
            Some(1234)
        );
    }

    #[test]
    fn rejects_other_merge_summaries() {
        assert_eq!(
            merge_pr_number("Merge branch 'stable-4.0' into main").unwrap(),
            None
        );
        assert_eq!(merge_pr_number("Revert \"Merge pull request #4\"").unwrap(), None);
    }

    #[test]
    fn parses_pull_request_ref_names() {
        assert_eq!(pr_ref_number("origin/pr/42").unwrap(), Some(42));
        assert_eq!(pr_ref_number("pull/42/head").unwrap(), Some(42));
        assert_eq!(pr_ref_number("upstream/pull/7/merge").unwrap(), Some(7));
        assert_eq!(pr_ref_number("origin/main").unwrap(), None);
        assert_eq!(pr_ref_number("origin/wip-pr/12x").unwrap(), None);
    }
}
