//! Traits related to remote source hosts
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::{
    forge::{
        config::RemoteConfig,
        request::{HostCommit, PullRequest},
    },
    result::Result,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SourceHost: Send + Sync {
    fn remote_config(&self) -> RemoteConfig;

    /// Commits after `begin` up to and including `end`, in host order, with
    /// stats and file patches populated.
    async fn list_commits(
        &self,
        begin: &str,
        end: &str,
    ) -> Result<Vec<HostCommit>>;

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest>;

    /// Numbers of the pull requests that contain `commit_id`.
    async fn list_pull_requests_for_commit(
        &self,
        commit_id: &str,
    ) -> Result<Vec<u64>>;

    async fn create_tag(&self, name: &str, target: &str) -> Result<()>;
}

/// Maps repository URIs to host clients.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<Box<dyn SourceHost>>;

    /// Create the repository named by `uri` under its owner organization.
    async fn create_repository(&self, uri: &str) -> Result<()>;
}
