//! Error handling and result types for revtrack.
//!
//! Every fallible function in the crate returns the `Result<T>` defined
//! here, so errors from the source host, the `git` working copy, the issue
//! tracker and the filesystem all surface through `color-eyre` with their
//! context chain intact.
//!
//! Classified failures (see [`crate::error::RevtrackError`]) travel inside the
//! eyre report and can be recovered with `downcast_ref` where a caller needs
//! to tell them apart.
//!
//! # Usage
//!
//! ```rust,ignore
//! use color_eyre::eyre::Context;
//! use crate::result::Result;
//!
//! async fn read_recipe(path: &str) -> Result<String> {
//!     let content = tokio::fs::read_to_string(path)
//!         .await
//!         .wrap_err_with(|| format!("failed to read recipe {path}"))?;
//!     Ok(content)
//! }
//! ```

use color_eyre::eyre::Result as EyreResult;

/// Standard result type used throughout revtrack.
pub type Result<T> = EyreResult<T>;
