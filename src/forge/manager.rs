//! Manager that wraps host implementations
use async_trait::async_trait;
use log::*;

use crate::{
    Result,
    forge::{
        config::RemoteConfig,
        request::{HostCommit, PullRequest},
        traits::SourceHost,
    },
};

/// Wraps a [`SourceHost`] and suppresses mutating calls in dry-run mode.
pub struct HostManager {
    host: Box<dyn SourceHost>,
    remote_config: RemoteConfig,
}

impl HostManager {
    pub fn new(host: Box<dyn SourceHost>) -> Self {
        let remote_config = host.remote_config();
        Self {
            host,
            remote_config,
        }
    }
}

#[async_trait]
impl SourceHost for HostManager {
    fn remote_config(&self) -> RemoteConfig {
        self.remote_config.clone()
    }

    async fn list_commits(
        &self,
        begin: &str,
        end: &str,
    ) -> Result<Vec<HostCommit>> {
        debug!(
            "listing commits for {}/{}: {begin}..{end}",
            self.remote_config.owner, self.remote_config.repo
        );
        self.host.list_commits(begin, end).await
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        self.host.get_pull_request(number).await
    }

    async fn list_pull_requests_for_commit(
        &self,
        commit_id: &str,
    ) -> Result<Vec<u64>> {
        self.host.list_pull_requests_for_commit(commit_id).await
    }

    async fn create_tag(&self, name: &str, target: &str) -> Result<()> {
        if self.remote_config.dry_run {
            warn!(
                "dry_run: would create tag: name: {name}, target: {target}, repo: {}/{}",
                self.remote_config.owner, self.remote_config.repo
            );
            return Ok(());
        }

        self.host.create_tag(name, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::traits::MockSourceHost;

    fn config(dry_run: bool) -> RemoteConfig {
        RemoteConfig {
            owner: "openbmc".into(),
            repo: "bmcweb".into(),
            dry_run,
            ..RemoteConfig::default()
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_create_tag_dry_run() {
        let mut mock = MockSourceHost::new();
        mock.expect_remote_config().returning(|| config(true));
        mock.expect_create_tag().never();

        let manager = HostManager::new(Box::new(mock));
        manager.create_tag("v1.0", "abc").await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_create_tag_forwards() {
        let mut mock = MockSourceHost::new();
        mock.expect_remote_config().returning(|| config(false));
        mock.expect_create_tag()
            .withf(|name, target| name == "v1.0" && target == "abc")
            .times(1)
            .returning(|_, _| Ok(()));

        let manager = HostManager::new(Box::new(mock));
        manager.create_tag("v1.0", "abc").await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_reads_pass_through_in_dry_run() {
        let mut mock = MockSourceHost::new();
        mock.expect_remote_config().returning(|| config(true));
        mock.expect_list_commits().times(1).returning(|_, _| {
            Ok(vec![HostCommit {
                id: "abc".into(),
                ..HostCommit::default()
            }])
        });

        let manager = HostManager::new(Box::new(mock));
        let commits = manager.list_commits("a", "b").await.unwrap();
        assert_eq!(commits.len(), 1);
    }
}
