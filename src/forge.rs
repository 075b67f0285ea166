//! Source hosting service access for the public and enterprise GitHub
//! flavors.
//!
//! Provides commit range listing with per-commit patches, pull request text,
//! commit to pull request linkage, tag creation and repository creation
//! through common traits.

/// Host selection and connection settings.
pub mod config;

/// Resolves repository URIs to host clients.
pub mod factory;

/// GitHub API client for github.com and enterprise instances.
pub mod github;

/// Dry-run aware wrapper around a host client.
pub mod manager;

/// Data returned by host clients.
pub mod request;

/// Common traits for host abstraction.
pub mod traits;
