//! Traits related to remote git forges
use async_trait::async_trait;

use crate::{error::Result, forge::types::RateLimit};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestSearch {
    /// Search for merged pull requests in `project` containing `sha`.
    ///
    /// Returns the raw JSON response body together with the quota state
    /// observed after the call.
    async fn search_merged(
        &self,
        project: &str,
        sha: &str,
        quota: RateLimit,
    ) -> Result<(String, RateLimit)>;
}
