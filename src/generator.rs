//! End-to-end changelog generation pipeline.
//!
//! Runs the stages as a single sequential batch job: version resolution,
//! historical ledger construction, pull request collection, prompt
//! assembly, classification, author enrichment, and rendering. Every
//! stage is all-or-nothing; the first failure aborts the run and no
//! partial document is produced.
use chrono::Local;
use log::*;

use crate::{
    collector::{Collector, CollectorConfig},
    error::Result,
    forge::{config::RemoteConfig, traits::Forge},
    formatter::{self, FormatterConfig},
    history::{History, STYLE_EXCERPT_COUNT},
    oracle::{
        traits::Oracle,
        types::{ModelDetails, ModelResponse},
    },
    prompt,
    version::Version,
};

/// Run-level options supplied by the CLI layer.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// The release for which the changelog is generated.
    pub release: String,
    /// Explicit previous release. Computed from `release` when absent.
    pub from_release: Option<String>,
    /// Broad collection mode: analyze every merged pull request instead
    /// of only labeled ones.
    pub all: bool,
    /// Classification model identifier.
    pub model: String,
}

/// The prompt sent to the model, kept for artifact persistence.
#[derive(Debug, Clone)]
pub struct PromptData {
    pub text: String,
    pub version: String,
    pub timestamp: String,
}

/// Everything a generation run produces: the rendered document plus the
/// diagnostic artifacts.
#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    pub changelog: String,
    pub prompt: PromptData,
    pub response: ModelResponse,
    pub details: ModelDetails,
}

/// Drives one changelog generation run against the injected forge and
/// oracle collaborators.
pub struct Generator<'a> {
    config: GeneratorConfig,
    remote: RemoteConfig,
    collector_config: CollectorConfig,
    forge: &'a dyn Forge,
    oracle: &'a dyn Oracle,
}

impl<'a> Generator<'a> {
    pub fn new(
        config: GeneratorConfig,
        remote: RemoteConfig,
        collector_config: CollectorConfig,
        forge: &'a dyn Forge,
        oracle: &'a dyn Oracle,
    ) -> Self {
        Self {
            config,
            remote,
            collector_config,
            forge,
            oracle,
        }
    }

    pub async fn generate(&self) -> Result<GeneratorOutput> {
        let version = Version::parse(&self.config.release)?;

        let from_release = match &self.config.from_release {
            Some(explicit) => Version::parse(explicit)?,
            None => version.previous_release(),
        };

        let branch = version.branch();

        info!(
            "generating changelog for {} (from {}, branch: {})",
            version, from_release, branch
        );

        info!("fetching historical changelogs");
        let history = History::new(
            self.forge,
            self.remote.changelog_dir.clone(),
            &self.remote.pull_link_base_url,
        )?;
        let documents = history.list_documents().await?;
        let ledger = history.build_ledger(&documents).await?;
        let style_excerpt =
            history.style_excerpt(&documents, STYLE_EXCERPT_COUNT).await?;

        let collector =
            Collector::new(self.forge, self.collector_config.clone());
        let since = collector.resolve_window_start(&from_release).await?;

        info!(
            "fetching pull requests merged after {}",
            since.to_rfc3339()
        );
        let records = collector
            .collect(&version, &branch, since, self.config.all)
            .await?;
        info!("collected {} pull requests", records.len());

        let prompt_text = prompt::assemble(&style_excerpt, &ledger, &records);

        info!("calling classification model (model: {})", self.config.model);
        let (mut response, details) = self
            .oracle
            .classify(&prompt_text, &self.config.release, &self.config.model)
            .await?;
        info!(
            "received {} change entries from model",
            response.changes.len()
        );
        info!(
            "model latency: {:.2} seconds, total tokens: {}",
            details.latency_seconds, details.total_tokens
        );

        formatter::enrich_authors(&mut response, &records);

        let formatter_config = FormatterConfig {
            pull_link_base_url: self.remote.pull_link_base_url.clone(),
            author_link_base_url: self.remote.author_link_base_url.clone(),
            include_uncategorized: self.config.all,
        };
        let changelog = formatter::render(
            &formatter_config,
            &version,
            Local::now().date_naive(),
            &response,
        );

        let prompt_data = PromptData {
            text: prompt_text,
            version: self.config.release.clone(),
            timestamp: details.timestamp.clone(),
        };

        Ok(GeneratorOutput {
            changelog,
            prompt: prompt_data,
            response,
            details,
        })
    }
}
