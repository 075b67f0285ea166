//! Command execution for revtrack.
//!
//! Each subcommand of the CLI is implemented by one module exposing an
//! `execute` function. Commands share a [`common::Context`] holding the
//! loaded configuration, the external command runner and the dry-run flag.
//!
//! # Dry Run Support
//!
//! With `--dry-run` every mutating action is logged instead of performed:
//! file writes, commits, pushes, tag and repository creation, and tracker
//! updates. Read-only calls still run so the output reflects real data.

/// Shared command context and helpers.
pub mod common;

/// Recipe revision bumps.
pub mod bump;

/// Issue tracker subcommands.
pub mod issue;

/// Pull request creation through `gh`.
pub mod pr;

pub mod prune_branches;

/// Commit tree reports across bumped dependencies.
pub mod report;

/// Repository mirroring.
pub mod sync;

pub mod tag;
