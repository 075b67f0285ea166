//! Local `git` working copy operations.
//!
//! Every call runs `git` with an explicit working directory. Calls that change
//! the repository or a remote are suppressed in dry-run mode.
use log::*;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    process::{CommandOutput, CommandRunner, CommandSpec, run_checked},
    result::Result,
};

/// A local clone driven through the `git` command line.
#[derive(Clone)]
pub struct WorkingCopy {
    dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
    dry_run: bool,
}

impl WorkingCopy {
    pub fn new(
        dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        dry_run: bool,
    ) -> Self {
        Self {
            dir: dir.into(),
            runner,
            dry_run,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn spec(&self, args: &[&str]) -> CommandSpec {
        let mut full = vec!["--no-pager"];
        full.extend_from_slice(args);
        CommandSpec::new("git", full.iter().copied()).cwd(&self.dir)
    }

    async fn read(&self, args: &[&str]) -> Result<String> {
        let output = run_checked(self.runner.as_ref(), self.spec(args)).await?;
        Ok(output.stdout)
    }

    async fn mutate(&self, args: &[&str]) -> Result<()> {
        if self.dry_run {
            warn!("dry_run: would run: git {}", args.join(" "));
            return Ok(());
        }
        run_checked(self.runner.as_ref(), self.spec(args)).await?;
        Ok(())
    }

    /// Run `git log` with the given arguments and return its output.
    pub async fn log(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["log"];
        full.extend_from_slice(args);
        self.read(&full).await
    }

    pub async fn show(&self, rev: &str) -> Result<String> {
        self.read(&["show", rev]).await
    }

    /// Abbreviated hash of `HEAD`.
    pub async fn head_short_id(&self) -> Result<String> {
        let out = self.log(&["-n", "1", "--pretty=format:%h"]).await?;
        Ok(out.trim().to_string())
    }

    /// Files containing lines matching all `patterns`.
    pub async fn grep_files(&self, patterns: &[&str]) -> Result<Vec<String>> {
        let mut args = vec!["grep", "-l"];
        for (i, pattern) in patterns.iter().enumerate() {
            if i > 0 {
                args.push("--and");
            }
            args.push("-e");
            args.push(pattern);
        }

        let output = self.runner.run(self.spec(&args)).await?;

        // grep exits 1 when nothing matched
        if output.status == 1 {
            return Ok(vec![]);
        }

        let output = output.check(&self.spec(&args))?;

        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    pub async fn remotes(&self) -> Result<Vec<String>> {
        let out = self.read(&["remote"]).await?;
        Ok(out.lines().map(|l| l.trim().to_string()).collect())
    }

    /// True when `url` answers `git ls-remote`.
    pub async fn remote_reachable(&self, url: &str) -> Result<bool> {
        let output: CommandOutput =
            self.runner.run(self.spec(&["ls-remote", url])).await?;
        Ok(output.success())
    }

    /// Fetch URL of a remote, `None` when the remote does not exist.
    pub async fn remote_url(&self, name: &str) -> Result<Option<String>> {
        let spec = self.spec(&["remote", "get-url", name]);
        let output = self.runner.run(spec).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }

    pub async fn current_branch(&self) -> Result<String> {
        let out = self.read(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(out.trim().to_string())
    }

    pub async fn add(&self, path: &str) -> Result<()> {
        self.mutate(&["add", path]).await
    }

    pub async fn commit(&self, message: &str) -> Result<()> {
        self.mutate(&["commit", "-m", message]).await
    }

    pub async fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        self.mutate(&["fetch", remote, branch]).await
    }

    pub async fn reset_hard(&self, rev: &str) -> Result<()> {
        self.mutate(&["reset", "--hard", rev]).await
    }

    pub async fn checkout(&self, branch: &str) -> Result<()> {
        self.mutate(&["checkout", branch]).await
    }

    pub async fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.mutate(&["pull", remote, branch]).await
    }

    pub async fn push(
        &self,
        remote: &str,
        refspec: &str,
        tags: bool,
    ) -> Result<()> {
        let mut args = vec!["push", remote, refspec];
        if tags {
            args.push("--tags");
        }
        self.mutate(&args).await
    }

    pub async fn delete_branch(&self, branch: &str) -> Result<()> {
        self.mutate(&["branch", "-D", branch]).await
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.mutate(&["remote", "add", name, url]).await
    }

    pub async fn remove_remote(&self, name: &str) -> Result<()> {
        self.mutate(&["remote", "remove", name]).await
    }

    pub async fn set_push_url(&self, name: &str, url: &str) -> Result<()> {
        self.mutate(&["remote", "set-url", "--push", name, url]).await
    }

    /// Clone `branch` of `url` into `dir` and return the working copy for it.
    pub async fn clone_into(
        url: &str,
        branch: &str,
        dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        dry_run: bool,
    ) -> Result<Self> {
        let dir = dir.into();
        let parent = dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let target = dir.to_string_lossy().to_string();

        if dry_run {
            warn!(
                "dry_run: would run: git clone --branch {branch} {url} {target}"
            );
        } else {
            let spec = CommandSpec::new(
                "git",
                ["clone", "--branch", branch, url, target.as_str()],
            )
            .cwd(parent);
            run_checked(runner.as_ref(), spec).await?;
        }

        Ok(Self::new(dir, runner, dry_run))
    }
}
