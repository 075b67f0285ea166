//! Issue tracker login resolution.
use color_eyre::eyre::Context;
use log::*;
use secrecy::SecretString;
use std::{convert::Infallible, path::PathBuf};

use crate::{config::TrackerConfig, result::Result};

/// `.netrc` machine holding tracker credentials.
pub const NETRC_MACHINE: &str = "EWM";

pub const ID_ENV: &str = "EWM_ID";
pub const PASSWORD_ENV: &str = "EWM_PASSWORD";
pub const PROJECT_ENV: &str = "EWM_PROJECT";
pub const REPOSITORY_ENV: &str = "EWM_REPOSITORY";

/// Login and password for one `.netrc` machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetrcEntry {
    pub login: Option<String>,
    pub password: Option<String>,
}

/// Find `machine` in `.netrc` text.
pub fn parse_netrc(text: &str, machine: &str) -> Option<NetrcEntry> {
    let mut tokens = text.split_whitespace();
    let mut current: Option<NetrcEntry> = None;

    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                if current.is_some() {
                    return current;
                }
                if tokens.next() == Some(machine) {
                    current = Some(NetrcEntry::default());
                }
            }
            "default" => {
                if current.is_some() {
                    return current;
                }
            }
            "login" => {
                let value = tokens.next().map(String::from);
                if let Some(entry) = current.as_mut() {
                    entry.login = value;
                }
            }
            "password" => {
                let value = tokens.next().map(String::from);
                if let Some(entry) = current.as_mut() {
                    entry.password = value;
                }
            }
            "account" => {
                tokens.next();
            }
            _ => {}
        }
    }

    current
}

/// Everything needed to log in to the tracker.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub id: String,
    pub password: Option<SecretString>,
    pub project: String,
    pub repository: String,
}

impl Credentials {
    /// Resolve from the process environment, `~/.netrc` and `config`.
    pub async fn resolve(config: &TrackerConfig) -> Result<Self> {
        let lookup = |name: &str| std::env::var(name).ok();
        let home = dirs::home_dir();

        let netrc = match &home {
            Some(home) => {
                tokio::fs::read_to_string(home.join(".netrc")).await.ok()
            }
            None => None,
        };

        Self::resolve_with(config, lookup, home, netrc.as_deref()).await
    }

    /// Resolve with an explicit environment lookup, home directory and
    /// `.netrc` content.
    ///
    /// Each value comes from the environment first, then the `.netrc`
    /// machine entry (login and password only), then the configuration.
    pub async fn resolve_with<F>(
        config: &TrackerConfig,
        lookup: F,
        home: Option<PathBuf>,
        netrc: Option<&str>,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let entry = netrc
            .and_then(|text| parse_netrc(text, NETRC_MACHINE))
            .unwrap_or_default();

        let default_id = lookup("USER").map(|user| match &config.user_domain {
            Some(domain) => format!("{user}@{domain}"),
            None => user,
        });

        let id = lookup(ID_ENV)
            .or(entry.login)
            .or_else(|| config.id.clone())
            .or(default_id)
            .unwrap_or_default();

        let password = match lookup(PASSWORD_ENV).or(entry.password) {
            Some(password) => Some(password),
            None => Self::config_password(config, &lookup, home).await?,
        };

        if password.is_none() {
            warn!("no tracker password found for {id}");
        }

        Ok(Self {
            id,
            password: password.map(SecretString::from),
            project: lookup(PROJECT_ENV)
                .or_else(|| config.project.clone())
                .unwrap_or_default(),
            repository: lookup(REPOSITORY_ENV)
                .or_else(|| config.repository.clone())
                .unwrap_or_default(),
        })
    }

    async fn config_password<F>(
        config: &TrackerConfig,
        lookup: &F,
        home: Option<PathBuf>,
    ) -> Result<Option<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = &config.password {
            return Ok(Some(password.clone()));
        }

        let Some(file) = &config.authentication_file else {
            return Ok(None);
        };

        let expanded = shellexpand::full_with_context(
            file,
            || home.map(|h| h.to_string_lossy().into_owned()),
            |name| Ok::<_, Infallible>(lookup(name)),
        )
        .wrap_err_with(|| format!("failed to expand {file}"))?;
        let path = PathBuf::from(expanded.into_owned());

        if !path.exists() {
            debug!("authentication file {} not found", path.display());
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;

        Ok(content
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()))
    }
}
