//! Common functionality shared between commands
use color_eyre::eyre::Context as _;
use log::*;
use std::{path::Path, sync::Arc};

use crate::{
    cli,
    config::Config,
    forge::factory::ForgeFactory,
    process::{CommandRunner, SystemRunner},
    result::Result,
};

/// Settings and services every command starts from.
pub struct Context {
    pub config: Config,
    pub runner: Arc<dyn CommandRunner>,
    pub dry_run: bool,
}

impl Context {
    /// Load configuration named by the global arguments.
    pub async fn load(args: &cli::Args) -> Result<Self> {
        let config = Config::load(args.config.as_deref()).await?;

        if args.dry_run {
            info!("dry run: no changes will be made");
        }

        Ok(Self {
            config,
            runner: Arc::new(SystemRunner),
            dry_run: args.dry_run,
        })
    }

    pub fn forge_factory(&self) -> ForgeFactory {
        ForgeFactory::new(self.config.hosts.clone(), self.dry_run)
    }
}

/// Write a generated document unless running dry.
pub async fn write_output(
    path: &Path,
    content: &str,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        warn!("dry_run: would write {}", path.display());
        return Ok(());
    }

    tokio::fs::write(path, content)
        .await
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;

    info!("wrote {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_output(&path, "[]", false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_output(&path, "[]", true).await.unwrap();
        assert!(!path.exists());
    }
}
