//! Recipe scanning and pinned revision (`SRCREV`) bumping.
use color_eyre::eyre::Context;
use log::*;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    error::RevtrackError,
    forge::{request::HostCommit, traits::HostResolver},
    git::WorkingCopy,
    report::{aggregator::dedup_by_message, model::summarize},
    result::Result,
};

// Evaluated in order; a later match replaces an earlier one.
static RECIPE_URI_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"KSRC[+=? ]+"([-a-zA-Z0-9/:\.@]+);"#,
        r#"_URI[+=? ]+"([-a-zA-Z0-9/:\.]+)""#,
        r#"_URI[+=? ]+"([-a-zA-Z0-9/:\.@]+);"#,
        r#"\+SRC_URI[+=? ]+"([-a-zA-Z0-9/:\.@]+);"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Length of a full commit hash.
pub const REVISION_LEN: usize = 40;

/// Project and pinned revision found in a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeScan {
    pub project: Option<String>,
    pub srcrev: Option<String>,
}

/// Check that `revision` is a full 40 digit hexadecimal hash.
pub fn validate_revision(revision: &str) -> Result<()> {
    let len = revision.chars().count();

    if len != REVISION_LEN {
        return Err(RevtrackError::InvalidRevision {
            value: revision.to_string(),
            len,
        }
        .into());
    }

    if !revision.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RevtrackError::invalid_args(format!(
            "sha number {revision} is not hexadecimal"
        ))
        .into());
    }

    Ok(())
}

/// Project named by the first URI in a `_URI` assignment that references
/// `remote_filter` (`<remote>/<org>`).
pub fn extract_project_from_uris(
    assignment: &str,
    remote_filter: &str,
) -> Option<String> {
    let quoted = assignment.split('"').nth(1)?;

    quoted
        .split_whitespace()
        .find(|uri| uri.contains(remote_filter))
        .and_then(|uri| uri.split(';').next())
        .and_then(|uri| uri.rsplit('/').next())
        .map(|name| name.replace(".git", ""))
}

fn is_uri_assignment(line: &str) -> bool {
    line.contains("_URI") || line.trim_start().starts_with("KSRC")
}

/// Scan recipe text for the project it fetches from `remote_filter` and its
/// pinned revision. Both `_URI` and kernel `KSRC` assignments name the
/// project. Stops as soon as both are known.
pub fn scan_recipe(text: &str, remote_filter: &str) -> RecipeScan {
    let mut scan = RecipeScan::default();
    let mut uris = String::new();

    for line in text.lines() {
        let line = line.trim_end();

        if line.contains("SRCREV") {
            let value = line.rsplit('=').next().unwrap_or_default();
            scan.srcrev = Some(value.replace('"', "").trim().to_string());
        } else if scan.project.is_none()
            && (!uris.is_empty() || is_uri_assignment(line))
        {
            uris.push_str(line.split('\\').next().unwrap_or_default());

            // assignment complete unless continued on the next line
            if !line.contains('\\') {
                scan.project = extract_project_from_uris(&uris, remote_filter);
                if scan.project.is_none() {
                    uris.clear();
                }
            }
        }

        if scan.project.is_some() && scan.srcrev.is_some() {
            break;
        }
    }

    scan
}

/// Dependency repository URI referenced by a recipe.
pub fn recipe_uri(text: &str) -> Option<String> {
    RECIPE_URI_REGEXES
        .iter()
        .filter_map(|re| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .last()
}

/// Commit summaries grouped by author in first appearance order, using the
/// same duplicate message rule as commit reports.
pub fn shortlog(commits: &[HostCommit]) -> String {
    let mut groups: Vec<(String, Vec<String>)> = vec![];

    for commit in dedup_by_message(commits) {
        let summary = commit.message.lines().next().unwrap_or_default();
        match groups.iter_mut().find(|(a, _)| *a == commit.author_name) {
            Some((_, summaries)) => summaries.push(summary.to_string()),
            None => groups
                .push((commit.author_name.clone(), vec![summary.to_string()])),
        }
    }

    let mut out = String::new();

    for (author, summaries) in groups.iter() {
        out.push_str(&format!("{author} ({}):\n", summaries.len()));
        for summary in summaries.iter() {
            out.push_str(&format!("  {summary}\n"));
        }
        out.push('\n');
    }

    out
}

fn abbrev(rev: &str) -> String {
    rev.chars().take(10).collect()
}

/// Bump commit message: subject followed by the shortlog.
pub fn commit_message(
    project: &str,
    location: Option<&str>,
    old_rev: &str,
    new_rev: &str,
    shortlog: &str,
) -> String {
    let location = location
        .filter(|l| !l.is_empty())
        .map(|l| format!(" {l}"))
        .unwrap_or_default();

    format!(
        "{project}:{location} srcrev bump {}..{}\n\n{shortlog}",
        abbrev(old_rev),
        abbrev(new_rev)
    )
}

/// What to bump and where to look for it.
#[derive(Debug, Clone, Default)]
pub struct BumpRequest {
    pub project: String,
    pub revision: String,
    pub remote: String,
    pub org: String,
    pub location: Option<String>,
    /// Recipes to consider, relative to the working copy. Searched with
    /// `git grep` when empty.
    pub recipes: Vec<PathBuf>,
    /// Project pinned through `KSRC`, which `git grep` cannot find.
    pub kernel_project: String,
    pub kernel_recipes: Vec<PathBuf>,
}

impl BumpRequest {
    fn remote_filter(&self) -> String {
        format!("{}/{}", self.remote, self.org)
    }

    fn is_kernel(&self) -> bool {
        !self.kernel_project.is_empty() && self.project == self.kernel_project
    }
}

/// Result of processing one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpOutcome {
    /// Recipe does not pin the requested project.
    Skipped { recipe: PathBuf },
    UpToDate { recipe: PathBuf, revision: String },
    /// Dry run: the commit that would have been created.
    Pending { recipe: PathBuf, message: String },
    Committed { recipe: PathBuf, message: String },
}

/// Rewrites recipes pinning a project to a new revision and commits them.
pub struct RecipeBumper<'a> {
    working_copy: &'a WorkingCopy,
    resolver: &'a dyn HostResolver,
}

impl<'a> RecipeBumper<'a> {
    pub fn new(
        working_copy: &'a WorkingCopy,
        resolver: &'a dyn HostResolver,
    ) -> Self {
        Self {
            working_copy,
            resolver,
        }
    }

    pub async fn candidate_recipes(
        &self,
        req: &BumpRequest,
    ) -> Result<Vec<PathBuf>> {
        if !req.recipes.is_empty() {
            return Ok(req.recipes.clone());
        }

        if req.is_kernel() && !req.kernel_recipes.is_empty() {
            return Ok(req.kernel_recipes.clone());
        }

        let filter = req.remote_filter();
        let files = self.working_copy.grep_files(&["_URI", &filter]).await?;

        debug!("{} candidate recipes reference {filter}", files.len());

        Ok(files.into_iter().map(PathBuf::from).collect())
    }

    /// Bump every candidate recipe pinning `req.project`.
    pub async fn bump(&self, req: &BumpRequest) -> Result<Vec<BumpOutcome>> {
        validate_revision(&req.revision)?;

        let mut outcomes = vec![];

        for recipe in self.candidate_recipes(req).await? {
            outcomes.push(self.bump_recipe(req, &recipe).await?);
        }

        Ok(outcomes)
    }

    async fn bump_recipe(
        &self,
        req: &BumpRequest,
        recipe: &Path,
    ) -> Result<BumpOutcome> {
        let path = self.working_copy.dir().join(recipe);
        let content = tokio::fs::read_to_string(&path)
            .await
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;

        let scan = scan_recipe(&content, &req.remote_filter());

        let (Some(project), Some(srcrev)) = (scan.project, scan.srcrev) else {
            info!("No SRCREV or URI found in {}", recipe.display());
            return Ok(BumpOutcome::Skipped {
                recipe: recipe.to_path_buf(),
            });
        };

        if project != req.project || srcrev.is_empty() {
            debug!("{} pins {project}: skipping", recipe.display());
            return Ok(BumpOutcome::Skipped {
                recipe: recipe.to_path_buf(),
            });
        }

        if srcrev == req.revision {
            return Ok(BumpOutcome::UpToDate {
                recipe: recipe.to_path_buf(),
                revision: srcrev,
            });
        }

        let log = self.dependency_shortlog(&content, &srcrev, &req.revision).await;
        let message = commit_message(
            &project,
            req.location.as_deref(),
            &srcrev,
            &req.revision,
            &log,
        );

        if self.working_copy.dry_run() {
            warn!("dry_run: would bump {} to {}", recipe.display(), req.revision);
            return Ok(BumpOutcome::Pending {
                recipe: recipe.to_path_buf(),
                message,
            });
        }

        let updated = content.replace(&srcrev, &req.revision);
        tokio::fs::write(&path, updated)
            .await
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;

        let recipe_arg = recipe.to_string_lossy();
        self.working_copy.add(&recipe_arg).await?;
        self.working_copy.commit(&message).await?;

        info!("bumped {project} in {}", recipe.display());

        Ok(BumpOutcome::Committed {
            recipe: recipe.to_path_buf(),
            message,
        })
    }

    async fn dependency_shortlog(
        &self,
        content: &str,
        old_rev: &str,
        new_rev: &str,
    ) -> String {
        let Some(uri) = recipe_uri(content) else {
            warn!("no dependency uri in recipe: shortlog omitted");
            return String::new();
        };

        let commits = match self.resolver.resolve(&uri).await {
            Ok(host) => host.list_commits(old_rev, new_rev).await,
            Err(err) => Err(err),
        };

        match commits {
            Ok(commits) => shortlog(&commits),
            Err(err) => {
                warn!("unable to list {uri} {old_rev}..{new_rev}: {err:#}");
                String::new()
            }
        }
    }
}

/// Subject line of a bump commit message.
pub fn subject(message: &str) -> String {
    summarize(message)
}
