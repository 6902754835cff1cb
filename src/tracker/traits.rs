//! Traits related to issue trackers
use async_trait::async_trait;

use crate::{
    error::Result,
    tracker::types::{Bug, BugQuery},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueTracker {
    /// Host name used in log and error messages.
    fn name(&self) -> String;
    /// Whether the configured credentials are accepted.
    async fn logged_in(&self) -> Result<bool>;
    /// Run a `Bug.search` style query.
    async fn search(&self, query: &BugQuery) -> Result<Vec<Bug>>;
}
