//! CLI argument parsing and run configuration.
use clap::Parser;
use git_url_parse::GitUrl;
use secrecy::SecretString;
use std::env;

use crate::{
    error::{RelogError, Result},
    forge::config::{DEFAULT_CHANGELOG_DIR, RemoteConfig},
    generator::GeneratorConfig,
};

/// Default classification model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Required prefix of classification model identifiers.
pub const MODEL_PREFIX: &str = "gemini-";

/// CLI arguments for changelog generation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long)]
    /// The release for which the changelog is generated (X.Y.Z).
    pub release: String,

    #[arg(long)]
    /// The last release from which the changelog is generated.
    /// Computed from --release when omitted.
    pub from_release: Option<String>,

    #[arg(long, default_value_t = false)]
    /// Include pull requests without the release-note label for model
    /// analysis.
    pub all: bool,

    #[arg(long)]
    /// Output file path. Defaults to stdout.
    pub output: Option<String>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    /// Gemini model to use (must start with 'gemini-').
    pub model: String,

    #[arg(long)]
    /// GitHub repository URL (https://github.com/owner/repo).
    pub github_repo: String,

    #[arg(long, default_value = "")]
    /// GitHub personal access token. Falls back to GITHUB_TOKEN env var.
    /// May stay empty for public repositories.
    pub github_token: String,

    #[arg(long, default_value = "")]
    /// Google API key for the Gemini API. Falls back to GOOGLE_API_KEY
    /// env var.
    pub google_api_key: String,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

impl Args {
    /// Run-level generator options, with model identifier validation.
    pub fn generator_config(&self) -> Result<GeneratorConfig> {
        if !self.model.starts_with(MODEL_PREFIX) {
            return Err(RelogError::invalid_config(format!(
                "model must start with '{}', got: {}",
                MODEL_PREFIX, self.model
            )));
        }

        Ok(GeneratorConfig {
            release: self.release.clone(),
            from_release: self.from_release.clone(),
            all: self.all,
            model: self.model.clone(),
        })
    }

    /// Configure the remote repository connection from the repo URL and
    /// token arguments.
    pub fn remote_config(&self) -> Result<RemoteConfig> {
        let parsed = GitUrl::parse(&self.github_repo)?;

        validate_scheme(parsed.scheme)?;

        let mut token = self.github_token.clone();

        if token.is_empty()
            && let Some(parsed_token) = parsed.token
        {
            token = parsed_token;
        }

        if token.is_empty()
            && let Ok(env_var_token) = env::var("GITHUB_TOKEN")
        {
            token = env_var_token;
        }

        let host = parsed.host.ok_or(RelogError::invalid_config(
            "unable to parse host from github repo",
        ))?;

        let owner = parsed.owner.ok_or(RelogError::invalid_config(
            "unable to parse owner from github repo",
        ))?;

        let repo = parsed.name.clone();
        let link_base_url = format!("{}://{}", parsed.scheme, host);

        Ok(RemoteConfig {
            pull_link_base_url: format!(
                "{}/{}/{}/pull",
                link_base_url, owner, repo
            ),
            author_link_base_url: link_base_url,
            owner,
            repo,
            token: SecretString::from(token),
            changelog_dir: DEFAULT_CHANGELOG_DIR.to_string(),
        })
    }

    /// Resolve the Gemini API key, required for every run.
    pub fn google_api_key(&self) -> Result<SecretString> {
        let mut key = self.google_api_key.clone();

        if key.is_empty()
            && let Ok(env_var_key) = env::var("GOOGLE_API_KEY")
        {
            key = env_var_key;
        }

        if key.is_empty() {
            return Err(RelogError::invalid_config(
                "must set google api key",
            ));
        }

        Ok(SecretString::from(key))
    }
}

/// Validate repository URL uses HTTP or HTTPS scheme.
fn validate_scheme(scheme: git_url_parse::Scheme) -> Result<()> {
    match scheme {
        git_url_parse::Scheme::Http => Ok(()),
        git_url_parse::Scheme::Https => Ok(()),
        _ => Err(RelogError::invalid_config(
            "only http and https schemes are supported for repo urls",
        )),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI argument parsing and run configuration.
    use super::*;

    fn args() -> Args {
        Args {
            release: "1.15.0".into(),
            from_release: None,
            all: false,
            output: None,
            model: DEFAULT_MODEL.into(),
            github_repo: "https://github.com/test_owner/test_repo".into(),
            github_token: "test_token".into(),
            google_api_key: "test_key".into(),
            debug: false,
        }
    }

    #[test]
    fn builds_remote_config_from_repo_url() {
        let remote = args().remote_config().unwrap();

        assert_eq!(remote.owner, "test_owner");
        assert_eq!(remote.repo, "test_repo");
        assert_eq!(
            remote.pull_link_base_url,
            "https://github.com/test_owner/test_repo/pull"
        );
        assert_eq!(remote.author_link_base_url, "https://github.com");
        assert_eq!(remote.changelog_dir, DEFAULT_CHANGELOG_DIR);
    }

    #[test]
    fn only_supports_http_and_https_schemes() {
        let mut cli_args = args();
        cli_args.github_repo = "git@github.com:test_owner/test_repo".into();

        let result = cli_args.remote_config();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_model_without_gemini_prefix() {
        let mut cli_args = args();
        cli_args.model = "gpt-4".into();

        let result = cli_args.generator_config();
        assert!(matches!(result, Err(RelogError::InvalidConfig(_))));
    }

    #[test]
    fn accepts_default_model() {
        let config = args().generator_config().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.release, "1.15.0");
    }

    #[test]
    fn explicit_google_api_key_wins_over_environment() {
        let key = args().google_api_key().unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(key.expose_secret(), "test_key");
    }
}
