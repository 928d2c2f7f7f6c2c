//! Shared data types for pull requests returned from the forge.
use chrono::{DateTime, Utc};

/// A pull request as collected for changelog generation.
#[derive(Debug, Clone)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub labels: Vec<String>,
    /// None for closed-but-unmerged pull requests.
    pub merged_at: Option<DateTime<Utc>>,
    /// Last update time, used to verify the server-side descending
    /// ordering the collector's early termination relies on.
    pub updated_at: DateTime<Utc>,
}

/// One page of closed pull requests.
#[derive(Debug, Clone)]
pub struct PullRequestPage {
    pub items: Vec<PullRequestInfo>,
    pub next_page: Option<u32>,
}
