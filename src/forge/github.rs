//! Implements the Forge trait for GitHub
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use octocrab::{Octocrab, models::repos::Object, params};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::{
    error::{RelogError, Result},
    forge::{
        config::{DEFAULT_PAGE_SIZE, RemoteConfig},
        traits::Forge,
        types::{PullRequestInfo, PullRequestPage},
    },
};

#[derive(Debug, Deserialize)]
struct GitCommitter {
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    pub committer: GitCommitter,
}

/// GitHub forge implementation using Octocrab for API interactions with
/// repository contents, tags, commits, and pull requests.
pub struct GithubForge {
    config: RemoteConfig,
    instance: Octocrab,
}

impl GithubForge {
    /// Create GitHub client with personal access token authentication.
    /// Requests are made anonymously when no token is configured.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let mut builder = Octocrab::builder();

        if !config.token.expose_secret().is_empty() {
            builder = builder.personal_token(config.token.clone());
        }

        let instance = builder.build()?;

        Ok(Self { config, instance })
    }

    fn map_pull_request(
        &self,
        pull: octocrab::models::pulls::PullRequest,
    ) -> PullRequestInfo {
        PullRequestInfo {
            number: pull.number,
            title: pull.title.unwrap_or_default(),
            body: pull.body.unwrap_or_default(),
            author: pull.user.map(|u| u.login).unwrap_or_default(),
            labels: pull
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.name)
                .collect(),
            merged_at: pull.merged_at,
            updated_at: pull.updated_at.or(pull.merged_at).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Forge for GithubForge {
    async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let mut data = self
            .instance
            .repos(&self.config.owner, &self.config.repo)
            .get_content()
            .path(path)
            .send()
            .await
            .map_err(|err| {
                RelogError::forge(format!(
                    "failed to list directory {}: {}",
                    path, err
                ))
            })?;

        Ok(data.take_items().into_iter().map(|item| item.name).collect())
    }

    async fn get_file_content(&self, path: &str) -> Result<String> {
        let mut data = self
            .instance
            .repos(&self.config.owner, &self.config.repo)
            .get_content()
            .path(path)
            .send()
            .await
            .map_err(|err| {
                RelogError::forge(format!(
                    "failed to fetch file {}: {}",
                    path, err
                ))
            })?;

        let items = data.take_items();

        if items.is_empty() {
            return Err(RelogError::forge(format!(
                "no file found for path: {}",
                path
            )));
        }

        items[0].decoded_content().ok_or_else(|| {
            RelogError::forge(format!(
                "failed to decode file content for path: {}",
                path
            ))
        })
    }

    async fn get_tag_ref(&self, tag: &str) -> Result<String> {
        let reference = self
            .instance
            .repos(&self.config.owner, &self.config.repo)
            .get_ref(&params::repos::Reference::Tag(tag.to_string()))
            .await
            .map_err(|err| {
                RelogError::forge(format!("failed to get tag {}: {}", tag, err))
            })?;

        match reference.object {
            Object::Commit { sha, .. } => Ok(sha),
            Object::Tag { sha, .. } => Ok(sha),
            _ => Err(RelogError::forge(format!(
                "unexpected object type for tag: {}",
                tag
            ))),
        }
    }

    async fn get_commit_date(&self, sha: &str) -> Result<DateTime<Utc>> {
        let route = format!(
            "/repos/{}/{}/git/commits/{}",
            self.config.owner, self.config.repo, sha
        );

        debug!("fetching commit date for {}", sha);

        let commit: GitCommit =
            self.instance.get(route, None::<&()>).await.map_err(|err| {
                RelogError::forge(format!(
                    "failed to get commit {}: {}",
                    sha, err
                ))
            })?;

        let date = DateTime::parse_from_rfc3339(&commit.committer.date)?;

        Ok(date.with_timezone(&Utc))
    }

    async fn list_closed_pull_requests(
        &self,
        branch: &str,
        page: u32,
    ) -> Result<PullRequestPage> {
        let result = self
            .instance
            .pulls(&self.config.owner, &self.config.repo)
            .list()
            .state(params::State::Closed)
            .base(branch)
            .sort(params::pulls::Sort::Updated)
            .direction(params::Direction::Descending)
            .per_page(DEFAULT_PAGE_SIZE)
            .page(page)
            .send()
            .await?;

        let next_page = result.next.as_ref().map(|_| page + 1);

        Ok(PullRequestPage {
            items: result
                .items
                .into_iter()
                .map(|pull| self.map_pull_request(pull))
                .collect(),
            next_page,
        })
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequestInfo> {
        let pull = self
            .instance
            .pulls(&self.config.owner, &self.config.repo)
            .get(number)
            .await
            .map_err(|err| {
                RelogError::forge(format!(
                    "failed to fetch pull request #{}: {}",
                    number, err
                ))
            })?;

        Ok(self.map_pull_request(pull))
    }
}
