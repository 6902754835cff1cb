//! Issue tracker lookup of bugs cross-referenced to forge pull requests.
use log::*;
use std::collections::BTreeSet;

use crate::error::Result;

/// Bugzilla REST client implementation.
pub mod bugzilla;

/// Common traits for issue tracker abstraction.
pub mod traits;

/// Query and response types.
pub mod types;

pub use traits::IssueTracker;
pub use types::{BugFilter, BugQuery};

/// External tracker ID for a pull request, e.g.
/// `ceph/ceph-ansible/pull/1234`.
pub fn external_tracker_key(project: &str, pr: u64) -> String {
    format!("{project}/pull/{pr}")
}

/// Bug IDs whose external tracker references pull request `pr`.
pub async fn bugs_for_pull_request(
    tracker: &dyn IssueTracker,
    filter: &BugFilter,
    project: &str,
    pr: u64,
) -> Result<BTreeSet<u64>> {
    let key = external_tracker_key(project, pr);
    let query = BugQuery::external_tracker(filter, &key);
    let bugs = tracker.search(&query).await?;

    debug!("{key}: {} bugs", bugs.len());

    Ok(bugs.into_iter().map(|bug| bug.id).collect())
}

/// Union of bug IDs across every pull request in `prs`.
pub async fn bugs_for_pull_requests(
    tracker: &dyn IssueTracker,
    filter: &BugFilter,
    project: &str,
    prs: &BTreeSet<u64>,
) -> Result<BTreeSet<u64>> {
    info!("searching bugzilla for {} pull requests", prs.len());

    let mut all = BTreeSet::new();

    for pr in prs {
        all.extend(bugs_for_pull_request(tracker, filter, project, *pr).await?);
    }

    Ok(all)
}
