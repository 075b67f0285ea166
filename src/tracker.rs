//! Issue tracker integration.
//!
//! [`IssueTracker`] covers the work item operations the other commands need.
//! [`ewm::Ewm`] implements it on top of the `rtcwi` command line tool, with
//! login credentials resolved by [`credentials::Credentials`].
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

use crate::result::Result;

pub mod credentials;
pub mod ewm;

/// Changes applied to an existing work item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemChange {
    /// Workflow action moving the item to a new state, e.g. `Close`.
    pub state: Option<String>,
    /// `KEY: VALUE` attribute tokens, taking priority over `wifile`.
    pub attributes: Vec<String>,
    /// JSON file of attributes.
    pub wifile: Option<PathBuf>,
}

/// A work item to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewWorkItem {
    /// Work item type, e.g. `STG Defect` or `Task`.
    pub item_type: String,
    pub attributes: Vec<String>,
    pub wifile: Option<PathBuf>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Work item as returned by the tracker.
    async fn view(&self, id: &str) -> Result<Value>;

    async fn modify(&self, id: &str, change: &WorkItemChange) -> Result<Value>;

    async fn create(&self, item: &NewWorkItem) -> Result<Value>;

    /// Add a comment to a work item.
    async fn addnote(&self, id: &str, message: &str) -> Result<()>;
}

/// Value of a single attribute, or the whole item when it has none by
/// that name.
pub fn select_attribute(item: Value, attribute: Option<&str>) -> Value {
    match attribute {
        Some(name) if item.get(name).is_some() => item[name].clone(),
        _ => item,
    }
}
