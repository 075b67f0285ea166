//! Repository sync command implementation.
//!
//! Keeps a local clone of a source repository, makes sure every configured
//! mirror remote exists, creates the target repository when it cannot be
//! reached, points `origin` at the read-only upstream and pushes the synced
//! branch to the mirror that matches the target.
use color_eyre::eyre::Context as _;
use log::*;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    cli::SyncArgs,
    command::common::Context,
    config::{MirrorRemote, SyncConfig},
    error::RevtrackError,
    forge::traits::HostResolver,
    git::WorkingCopy,
    process::CommandRunner,
    result::Result,
};

/// Push URL that disables pushing to the upstream.
const DISABLED_PUSH_URL: &str = "null";

/// Sync settings remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub repo_path: Option<PathBuf>,
    pub source_domain: Option<String>,
    pub target_domain: Option<String>,
    pub source_project: Option<String>,
    pub target_project: Option<String>,
}

impl SyncSettings {
    /// Settings saved at `path`, or defaults when there are none.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no saved sync settings at {}", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;

        serde_json::from_str(&content)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))
    }

    pub async fn save(&self, path: &Path, dry_run: bool) -> Result<()> {
        if dry_run {
            warn!("dry_run: would save sync settings to {}", path.display());
            return Ok(());
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;

        debug!("saved sync settings to {}", path.display());

        Ok(())
    }

    /// Saved settings overridden by the command line.
    pub fn merged(&self, args: &SyncArgs) -> Self {
        Self {
            repo_path: args.repo_path.clone().or_else(|| self.repo_path.clone()),
            source_domain: args
                .source_domain
                .clone()
                .or_else(|| self.source_domain.clone()),
            target_domain: args
                .target_domain
                .clone()
                .or_else(|| self.target_domain.clone()),
            source_project: args
                .source_project
                .clone()
                .or_else(|| self.source_project.clone()),
            target_project: args
                .target_project
                .clone()
                .or_else(|| self.target_project.clone()),
        }
    }
}

/// `git@<domain>:<project>/<repo>.git`
pub fn ssh_uri(domain: &str, project: &str, repo: &str) -> String {
    format!("git@{domain}:{project}/{repo}.git")
}

/// Everything one sync run needs, resolved from arguments, saved settings
/// and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub location: PathBuf,
    pub source_domain: String,
    pub source_project: String,
    pub target_domain: String,
    pub target_project: String,
    pub source_uri: String,
    pub target_uri: String,
    pub upstream_uri: String,
    pub target_repo_name: String,
    pub default_branch: String,
    pub branch: String,
    /// Remotes to create, with urls for the target repository name.
    pub mirrors: Vec<(MirrorRemote, String)>,
}

impl SyncPlan {
    pub fn new(
        args: &SyncArgs,
        settings: &SyncSettings,
        config: &SyncConfig,
    ) -> Result<Self> {
        let workspace = settings
            .repo_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        if !workspace.is_dir() {
            return Err(RevtrackError::invalid_args(format!(
                "workspace {} does not exist",
                workspace.display()
            ))
            .into());
        }

        let source_domain = settings
            .source_domain
            .clone()
            .unwrap_or_else(|| config.upstream_domain.clone());
        let source_project = settings
            .source_project
            .clone()
            .unwrap_or_else(|| config.upstream_project.clone());

        let (Some(target_domain), Some(target_project)) =
            (settings.target_domain.clone(), settings.target_project.clone())
        else {
            return Err(RevtrackError::invalid_args(
                "target domain and project are required",
            )
            .into());
        };

        let repo_name = args.repo_name.as_str();
        let target_repo_name = args
            .target_repo_name
            .clone()
            .unwrap_or_else(|| repo_name.to_string());
        let dir_name = args.repo_dir_name.as_deref().unwrap_or(repo_name);
        let default_branch = config.default_branch.clone();

        Ok(Self {
            location: workspace.join(dir_name),
            source_uri: ssh_uri(&source_domain, &source_project, repo_name),
            target_uri: ssh_uri(
                &target_domain,
                &target_project,
                &target_repo_name,
            ),
            upstream_uri: ssh_uri(
                &config.upstream_domain,
                &config.upstream_project,
                repo_name,
            ),
            mirrors: config
                .mirrors
                .iter()
                .map(|m| {
                    let url = ssh_uri(&m.domain, &m.project, &target_repo_name);
                    (m.clone(), url)
                })
                .collect(),
            branch: args
                .remote_branch
                .clone()
                .unwrap_or_else(|| default_branch.clone()),
            source_domain,
            source_project,
            target_domain,
            target_project,
            target_repo_name,
            default_branch,
        })
    }

    /// Mirror remote pointing at the target repository.
    pub fn target_mirror(&self) -> Option<&MirrorRemote> {
        self.mirrors.iter().map(|(m, _)| m).find(|m| {
            m.domain == self.target_domain && m.project == self.target_project
        })
    }

    /// Remote the synced branch is pulled from.
    pub fn source_remote(&self) -> &str {
        self.mirrors
            .iter()
            .map(|(m, _)| m)
            .find(|m| {
                m.domain == self.source_domain
                    && m.project == self.source_project
            })
            .map(|m| m.name.as_str())
            .unwrap_or("origin")
    }

    /// Target repository in `host/owner/repo` form.
    pub fn target_repository(&self) -> String {
        format!(
            "{}/{}/{}",
            self.target_domain, self.target_project, self.target_repo_name
        )
    }
}

/// Execute sync command.
pub async fn execute(ctx: &Context, args: &SyncArgs) -> Result<()> {
    let settings = SyncSettings::load(&args.json_file).await?.merged(args);
    let plan = SyncPlan::new(args, &settings, &ctx.config.sync)?;
    let factory = ctx.forge_factory();

    sync(&plan, ctx.runner.clone(), &factory, ctx.dry_run).await?;

    settings.save(&args.json_file, ctx.dry_run).await
}

async fn refresh(
    plan: &SyncPlan,
    runner: Arc<dyn CommandRunner>,
    remote: &str,
    branch: &str,
    dry_run: bool,
) -> Result<WorkingCopy> {
    if !plan.location.join(".git").exists() {
        info!("cloning {} into {}", plan.source_uri, plan.location.display());
        return WorkingCopy::clone_into(
            &plan.source_uri,
            branch,
            &plan.location,
            runner,
            dry_run,
        )
        .await;
    }

    let working_copy = WorkingCopy::new(&plan.location, runner, dry_run);
    working_copy.fetch(remote, branch).await?;
    working_copy.checkout(branch).await?;
    working_copy.pull(remote, branch).await?;

    Ok(working_copy)
}

async fn sync(
    plan: &SyncPlan,
    runner: Arc<dyn CommandRunner>,
    resolver: &dyn HostResolver,
    dry_run: bool,
) -> Result<()> {
    let existed = plan.location.join(".git").exists();
    let working_copy = refresh(
        plan,
        runner.clone(),
        "origin",
        &plan.default_branch,
        dry_run,
    )
    .await?;

    if !existed && dry_run {
        warn!(
            "dry_run: {} not cloned: skipping remote setup",
            plan.location.display()
        );
        return Ok(());
    }

    let remotes = working_copy.remotes().await?;
    for (mirror, url) in plan.mirrors.iter() {
        if !remotes.contains(&mirror.name) {
            info!("adding remote {} at {url}", mirror.name);
            working_copy.add_remote(&mirror.name, url).await?;
        }
    }

    if !working_copy.remote_reachable(&plan.target_uri).await? {
        warn!("{} does not exist: creating it", plan.target_uri);
        resolver.create_repository(&plan.target_repository()).await?;
    }

    if working_copy.remote_url("origin").await?.as_deref()
        != Some(plan.upstream_uri.as_str())
    {
        info!("pointing origin at {}", plan.upstream_uri);
        if remotes.iter().any(|r| r == "origin") {
            working_copy.remove_remote("origin").await?;
        }
        working_copy.add_remote("origin", &plan.upstream_uri).await?;
        working_copy
            .set_push_url("origin", DISABLED_PUSH_URL)
            .await?;
        working_copy.fetch("origin", &plan.default_branch).await?;
    }

    let Some(mirror) = plan.target_mirror() else {
        warn!(
            "no mirror remote configured for {}/{}: nothing pushed",
            plan.target_domain, plan.target_project
        );
        return Ok(());
    };

    working_copy
        .push(&mirror.name, &plan.default_branch, false)
        .await?;

    if plan.branch != plan.default_branch {
        let working_copy = refresh(
            plan,
            runner,
            plan.source_remote(),
            &plan.branch,
            dry_run,
        )
        .await?;
        working_copy.push(&mirror.name, &plan.branch, true).await?;
    }

    info!("synced {} to {}", plan.source_uri, plan.target_uri);

    Ok(())
}
