//! Pull request collection over a release window.
//!
//! Candidate records come from up to three paths: label-restricted fetch
//! (narrow mode), unrestricted fetch (broad mode), and cherry-pick
//! resolution on release branches. The paths overlap, so collection ends
//! with author filtering, number deduplication, and a chronological sort.
use chrono::{DateTime, Utc};
use log::*;
use regex::Regex;
use std::collections::HashSet;

use crate::{
    error::{RelogError, Result},
    forge::{traits::Forge, types::PullRequestInfo},
    version::Version,
};

/// Label selecting records for the changelog in narrow mode.
pub const DEFAULT_RELEASE_NOTE_LABEL: &str = "action/release-note";
/// Label marking records that reintroduce changes from another branch.
pub const DEFAULT_CHERRY_PICK_LABEL: &str = "kind/cherry-pick";
/// Automation identities whose records never reach the changelog.
pub const DEFAULT_IGNORED_AUTHORS: [&str; 4] =
    ["renovate[bot]", "dependabot", "dependabot[bot]", "antrea-bot"];

/// Labels and author block list used during collection, injected at
/// construction.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub release_note_label: String,
    pub cherry_pick_label: String,
    pub ignored_authors: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            release_note_label: DEFAULT_RELEASE_NOTE_LABEL.to_string(),
            cherry_pick_label: DEFAULT_CHERRY_PICK_LABEL.to_string(),
            ignored_authors: DEFAULT_IGNORED_AUTHORS
                .iter()
                .map(|author| author.to_string())
                .collect(),
        }
    }
}

/// Collects the pull requests merged during a release window.
pub struct Collector<'a> {
    forge: &'a dyn Forge,
    config: CollectorConfig,
}

impl<'a> Collector<'a> {
    pub fn new(forge: &'a dyn Forge, config: CollectorConfig) -> Self {
        Self { forge, config }
    }

    /// Resolve the exclusive lower bound of the release window: the
    /// committer timestamp of the commit tagged for the previous release.
    pub async fn resolve_window_start(
        &self,
        previous: &Version,
    ) -> Result<DateTime<Utc>> {
        let tag = format!("v{}", previous);
        let sha = self.forge.get_tag_ref(&tag).await?;
        let date = self.forge.get_commit_date(&sha).await?;

        debug!("window starts at {} (tag {})", date.to_rfc3339(), tag);

        Ok(date)
    }

    /// Walk closed pull requests on `branch` newest-update-first and
    /// return the merged ones inside the window.
    ///
    /// The first record merged before `since` terminates the walk: the
    /// server orders by update time descending, so older records cannot
    /// reappear later. That ordering is asserted, not trusted.
    async fn collect_window(
        &self,
        branch: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequestInfo>> {
        let mut records = vec![];
        let mut page: u32 = 1;
        let mut last_updated: Option<DateTime<Utc>> = None;

        loop {
            let result = self
                .forge
                .list_closed_pull_requests(branch, page)
                .await?;

            for record in result.items {
                if let Some(previous) = last_updated
                    && record.updated_at > previous
                {
                    return Err(RelogError::forge(format!(
                        "pull request listing for {} is not ordered by update time descending (#{} updated {} after a record updated {})",
                        branch,
                        record.number,
                        record.updated_at.to_rfc3339(),
                        previous.to_rfc3339(),
                    )));
                }
                last_updated = Some(record.updated_at);

                let Some(merged_at) = record.merged_at else {
                    continue;
                };

                if merged_at < since {
                    // We've gone past our start time
                    return Ok(records);
                }

                records.push(record);
            }

            let Some(next) = result.next_page else {
                break;
            };
            page = next;
        }

        Ok(records)
    }

    /// Narrow mode: only records carrying `label`.
    pub async fn fetch_labeled(
        &self,
        branch: &str,
        since: DateTime<Utc>,
        label: &str,
    ) -> Result<Vec<PullRequestInfo>> {
        let records = self.collect_window(branch, since).await?;

        Ok(records
            .into_iter()
            .filter(|record| record.labels.iter().any(|l| l == label))
            .collect())
    }

    /// Broad mode: every merged record in the window, except cherry-pick
    /// records which are resolved separately with their own timestamps.
    pub async fn fetch_all(
        &self,
        branch: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequestInfo>> {
        let records = self.collect_window(branch, since).await?;

        Ok(records
            .into_iter()
            .filter(|record| {
                !record
                    .labels
                    .iter()
                    .any(|l| l == &self.config.cherry_pick_label)
            })
            .collect())
    }

    /// Resolve cherry-pick records back to their originating records.
    ///
    /// The re-emitted record carries the original's title, body, author
    /// and labels, but the cherry-pick's merge timestamp, so a long-past
    /// fix backported into the window lands inside the window.
    pub async fn resolve_cherry_picks(
        &self,
        branch: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequestInfo>> {
        let reference_re = Regex::new(r"#(\d+)")?;
        let mut resolved = vec![];

        for record in self.collect_window(branch, since).await? {
            if !record
                .labels
                .iter()
                .any(|l| l == &self.config.cherry_pick_label)
            {
                continue;
            }

            for caps in reference_re.captures_iter(&record.body) {
                let Ok(number) = caps[1].parse::<u64>() else {
                    continue;
                };

                debug!(
                    "resolving cherry-pick #{} back to original #{}",
                    record.number, number
                );

                let original = self.forge.get_pull_request(number).await?;

                resolved.push(PullRequestInfo {
                    merged_at: record.merged_at,
                    ..original
                });
            }
        }

        Ok(resolved)
    }

    /// Drop records authored by blocked automation identities.
    pub fn filter_automation_authors(
        &self,
        records: Vec<PullRequestInfo>,
    ) -> Vec<PullRequestInfo> {
        records
            .into_iter()
            .filter(|record| {
                !self
                    .config
                    .ignored_authors
                    .iter()
                    .any(|author| author == &record.author)
            })
            .collect()
    }

    /// Merge by number, first occurrence wins.
    pub fn deduplicate(records: Vec<PullRequestInfo>) -> Vec<PullRequestInfo> {
        let mut seen = HashSet::new();

        records
            .into_iter()
            .filter(|record| seen.insert(record.number))
            .collect()
    }

    /// Ascending by merge timestamp. The sort is stable, so equal
    /// timestamps keep their first-occurrence order.
    pub fn order(mut records: Vec<PullRequestInfo>) -> Vec<PullRequestInfo> {
        records.sort_by_key(|record| record.merged_at);
        records
    }

    /// Full collection for a release: labeled or broad fetch, cherry-pick
    /// resolution for patch releases, then filter, dedup, and order.
    pub async fn collect(
        &self,
        version: &Version,
        branch: &str,
        since: DateTime<Utc>,
        all: bool,
    ) -> Result<Vec<PullRequestInfo>> {
        let mut records = if all {
            info!("fetching all pull requests for model analysis");
            self.fetch_all(branch, since).await?
        } else {
            info!(
                "fetching pull requests with {} label",
                self.config.release_note_label
            );
            self.fetch_labeled(branch, since, &self.config.release_note_label)
                .await?
        };

        if version.patch() != 0 {
            records.extend(self.resolve_cherry_picks(branch, since).await?);
        }

        let records = self.filter_automation_authors(records);
        let records = Self::deduplicate(records);

        Ok(Self::order(records))
    }
}
