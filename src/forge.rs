//! Unified interface for the source-control platform.
//!
//! Provides token-based authentication, repository content access, and
//! pull request listing through a common trait with a GitHub
//! implementation.

/// Configuration for the remote repository connection.
pub mod config;

/// GitHub API client implementation.
pub mod github;

/// Common trait for source-control platform abstraction.
pub mod traits;

/// Shared data types for pull requests returned from the forge.
pub mod types;
