//! Forge pull request search for mapping commits to pull requests.
//!
//! Provides token-based authentication and search API rate-limit handling
//! behind a common trait so the mapper can be tested without a network.

/// Configuration and authentication for the forge.
pub mod config;

/// GitHub search API client.
pub mod github;

/// Common traits for forge search abstraction.
pub mod traits;

/// Search and rate-limit response payloads.
pub mod types;
