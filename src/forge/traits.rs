//! Traits related to the remote source-control platform
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    forge::types::{PullRequestInfo, PullRequestPage},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Forge: Send + Sync {
    /// List entry names in a repository directory.
    async fn list_directory(&self, path: &str) -> Result<Vec<String>>;

    /// Fetch the full text of a repository file.
    async fn get_file_content(&self, path: &str) -> Result<String>;

    /// Resolve a tag name to the commit id it points at.
    async fn get_tag_ref(&self, tag: &str) -> Result<String>;

    /// Fetch the committer timestamp of a commit.
    async fn get_commit_date(&self, sha: &str) -> Result<DateTime<Utc>>;

    /// Fetch one page of closed pull requests on `branch`, ordered by
    /// update time descending. Pages are numbered from 1.
    async fn list_closed_pull_requests(
        &self,
        branch: &str,
        page: u32,
    ) -> Result<PullRequestPage>;

    /// Fetch a single pull request by number.
    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo>;
}
