//! Factory for creating host clients based on repository URIs.
use async_trait::async_trait;
use log::*;

use crate::{
    Result,
    config::HostsConfig,
    forge::{
        config::{Remote, RemoteConfig},
        github::Github,
        manager::HostManager,
        traits::{HostResolver, SourceHost},
    },
};

/// Resolves repository URIs to dry-run aware host clients.
pub struct ForgeFactory {
    hosts: HostsConfig,
    dry_run: bool,
}

impl ForgeFactory {
    pub fn new(hosts: HostsConfig, dry_run: bool) -> Self {
        Self { hosts, dry_run }
    }

    /// Create a host client for the Remote configuration.
    pub async fn create(remote: &Remote) -> Result<Box<dyn SourceHost>> {
        let host: Box<dyn SourceHost> = match remote {
            Remote::Github(config) => Self::create_github(config).await?,
            Remote::Enterprise(config) => Self::create_github(config).await?,
        };

        Ok(Box::new(HostManager::new(host)))
    }

    async fn create_github(
        config: &RemoteConfig,
    ) -> Result<Box<dyn SourceHost>> {
        Ok(Box::new(Github::new(config.clone()).await?))
    }
}

#[async_trait]
impl HostResolver for ForgeFactory {
    async fn resolve(&self, uri: &str) -> Result<Box<dyn SourceHost>> {
        let remote = Remote::from_uri(uri, &self.hosts, self.dry_run)?;
        debug!("resolved {uri} to {:?}", remote.config().api_base_url);
        Self::create(&remote).await
    }

    async fn create_repository(&self, uri: &str) -> Result<()> {
        let remote = Remote::from_uri(uri, &self.hosts, self.dry_run)?;
        let config = remote.config();

        if config.dry_run {
            warn!(
                "dry_run: would create repository: {}/{} on {}",
                config.owner, config.repo, config.host
            );
            return Ok(());
        }

        Github::create_repository(config).await
    }
}
