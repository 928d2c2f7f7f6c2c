//! Configuration for the remote repository connection.
use secrecy::SecretString;

/// Repository directory holding historical changelog documents.
pub const DEFAULT_CHANGELOG_DIR: &str = "CHANGELOG";
/// Page size for paginated pull request queries.
pub const DEFAULT_PAGE_SIZE: u8 = 100;

/// Remote repository connection configuration for authenticating and
/// interacting with the source-control platform.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Access token for authentication. May be empty for public
    /// repositories.
    pub token: SecretString,
    /// Base URL for pull request links in rendered changelogs.
    pub pull_link_base_url: String,
    /// Base URL for author profile links in rendered changelogs.
    pub author_link_base_url: String,
    /// Directory in the repository containing historical changelogs.
    pub changelog_dir: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: "".to_string(),
            repo: "".to_string(),
            token: SecretString::from("".to_string()),
            pull_link_base_url: "".to_string(),
            author_link_base_url: "".to_string(),
            changelog_dir: DEFAULT_CHANGELOG_DIR.to_string(),
        }
    }
}
