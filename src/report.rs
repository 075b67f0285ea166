//! Cross-repository commit reports.
//!
//! [`aggregator::Aggregator`] walks a commit range, follows dependency bumps
//! into the bumped repositories and produces a forest of
//! [`model::CommitReport`] that [`render`] turns into console, HTML, wiki and
//! JSON output.

pub mod aggregator;
pub mod model;
pub mod render;
