//! Connection settings for source hosts and host selection by URI.
use git_url_parse::GitUrl;
use log::*;
use secrecy::SecretString;
use std::env;

use crate::{config::HostsConfig, error::RevtrackError, result::Result};

/// Page size used for paginated host queries.
pub const DEFAULT_PAGE_SIZE: u8 = 100;

/// How commits are linked to the pull requests that introduced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrLinkage {
    /// Ask the host which pull requests contain the commit.
    Query,
    /// Parse `(#N)` or `Merge pull request #N` from the commit summary.
    Summary,
}

/// Remote repository connection configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Remote host (e.g., "github.com").
    pub host: String,
    /// Repository owner or organization.
    pub owner: String,
    /// Repository name without `.git`.
    pub repo: String,
    /// URI the repository was requested with.
    pub uri: String,
    /// REST API root, e.g. `https://api.github.com`.
    pub api_base_url: String,
    /// Browser root for repository links.
    pub web_base_url: String,
    /// Access token, anonymous access when absent.
    pub token: Option<SecretString>,
    pub linkage: PrLinkage,
    /// Suppress mutating host calls.
    pub dry_run: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "".to_string(),
            owner: "".to_string(),
            repo: "".to_string(),
            uri: "".to_string(),
            api_base_url: "".to_string(),
            web_base_url: "".to_string(),
            token: None,
            linkage: PrLinkage::Query,
            dry_run: false,
        }
    }
}

/// Supported source host flavors.
#[derive(Debug, Clone)]
pub enum Remote {
    Github(RemoteConfig),
    Enterprise(RemoteConfig),
}

impl Remote {
    /// Select the host flavor for `uri` using tokens from the process
    /// environment.
    pub fn from_uri(
        uri: &str,
        hosts: &HostsConfig,
        dry_run: bool,
    ) -> Result<Self> {
        Self::from_uri_with_env(uri, hosts, dry_run, |name| {
            env::var(name).ok().filter(|v| !v.is_empty())
        })
    }

    /// Same as [`Remote::from_uri`] with an injectable variable lookup.
    pub fn from_uri_with_env<F>(
        uri: &str,
        hosts: &HostsConfig,
        dry_run: bool,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = parse_repo_uri(uri)?;

        if let Some(enterprise) = &hosts.enterprise_host
            && !enterprise.is_empty()
            && parsed.host.contains(enterprise.as_str())
        {
            let token = parsed
                .token
                .clone()
                .or_else(|| lookup(hosts.enterprise_token_env.as_str()))
                .ok_or_else(|| RevtrackError::MissingToken {
                    host: parsed.host.clone(),
                    env_var: hosts.enterprise_token_env.clone(),
                })?;

            let config = RemoteConfig {
                api_base_url: format!("https://{}/api/v3", parsed.host),
                web_base_url: format!(
                    "https://{}/{}/{}",
                    parsed.host, parsed.owner, parsed.repo
                ),
                host: parsed.host,
                owner: parsed.owner,
                repo: parsed.repo,
                uri: uri.to_string(),
                token: Some(SecretString::from(token)),
                linkage: PrLinkage::Summary,
                dry_run,
            };

            return Ok(Remote::Enterprise(config));
        }

        if parsed.host.contains(hosts.public_host.as_str()) {
            let token = parsed
                .token
                .clone()
                .or_else(|| lookup(hosts.public_token_env.as_str()));

            if token.is_none() {
                warn!(
                    "{} not set: using anonymous access for {}",
                    hosts.public_token_env, parsed.host
                );
            }

            let config = RemoteConfig {
                api_base_url: format!("https://api.{}", hosts.public_host),
                web_base_url: format!(
                    "https://{}/{}/{}",
                    parsed.host, parsed.owner, parsed.repo
                ),
                host: parsed.host,
                owner: parsed.owner,
                repo: parsed.repo,
                uri: uri.to_string(),
                token: token.map(SecretString::from),
                linkage: PrLinkage::Query,
                dry_run,
            };

            return Ok(Remote::Github(config));
        }

        Err(RevtrackError::UnsupportedHost(uri.to_string()).into())
    }

    pub fn config(&self) -> &RemoteConfig {
        match self {
            Remote::Github(config) => config,
            Remote::Enterprise(config) => config,
        }
    }
}

/// Host and repository path components of a repository URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub host: String,
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
}

/// Parse a repository URI such as `git://github.com/openbmc/bmcweb`,
/// `git@github.com:openbmc/bmcweb.git` or plain `github.com/openbmc/bmcweb`.
pub fn parse_repo_uri(uri: &str) -> Result<RepoLocation> {
    let trimmed = uri.trim().trim_end_matches('/');

    let normalized = if trimmed.contains("://") || is_scp_like(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = GitUrl::parse(&normalized).map_err(|err| {
        RevtrackError::UnsupportedHost(format!("{uri}: {err}"))
    })?;

    let host = parsed
        .host
        .ok_or_else(|| RevtrackError::UnsupportedHost(uri.to_string()))?;

    let owner = parsed
        .owner
        .ok_or_else(|| RevtrackError::UnsupportedHost(uri.to_string()))?;

    let repo = parsed.name.trim_end_matches(".git").to_string();

    if repo.is_empty() {
        return Err(RevtrackError::UnsupportedHost(uri.to_string()).into());
    }

    Ok(RepoLocation {
        host,
        owner,
        repo,
        token: parsed.token,
    })
}

fn is_scp_like(uri: &str) -> bool {
    match (uri.find('@'), uri.find(':')) {
        (Some(at), Some(colon)) => at < colon,
        _ => false,
    }
}

/// Repository name from the last path segment of `uri`, `.git` removed.
pub fn repo_name_from_uri(uri: &str) -> String {
    uri.trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(uri)
        .trim_end_matches(".git")
        .to_string()
}
