//! CLI argument parsing.
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Global CLI arguments shared by every subcommand.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    #[arg(long, default_value_t = false, global = true)]
    /// Print mutating actions instead of performing them.
    pub dry_run: bool,

    #[arg(long, global = true)]
    /// Configuration file. Defaults to revtrack.toml when present.
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available tools.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report the commits between two revisions, following dependency bumps.
    Report(ReportArgs),

    /// Bump the pinned revision of a project in its recipes.
    Bump(BumpArgs),

    /// Create a tag on a hosted repository.
    Tag(TagArgs),

    /// Open or edit a pull request from the latest local commits.
    Pr(PrArgs),

    /// Work with the issue tracker.
    #[command(subcommand)]
    Issue(IssueCommand),

    /// Clone or refresh a repository and push it to its mirror.
    Sync(SyncArgs),

    /// Delete local branches named on standard input.
    PruneBranches,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Repository uri, e.g. github.com/openbmc/openbmc.
    pub repo_uri: String,
    /// Revision the report starts after.
    pub begin: String,
    /// Last revision included in the report.
    pub end: String,

    #[arg(long = "html_file", alias = "html-file")]
    /// Write an HTML report to this file.
    pub html_file: Option<PathBuf>,

    #[arg(long)]
    /// Write a Markdown wiki page to this file.
    pub wiki: Option<PathBuf>,

    #[arg(long = "json_file", alias = "json-file")]
    /// Write the report tree as JSON to this file.
    pub json_file: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct BumpArgs {
    /// Project whose recipes are bumped.
    pub project_name: String,
    /// Full 40 character revision to pin.
    pub project_sha: String,

    #[arg(long)]
    /// Remote host the recipe fetches from. Defaults to [bump] remote.
    pub remote: Option<String>,

    #[arg(long)]
    /// Organization on the remote. Defaults to [bump] org.
    pub org: Option<String>,

    #[arg(long)]
    /// Label added to the commit subject after the project name.
    pub location: Option<String>,

    #[arg(long = "recipe")]
    /// Recipe to bump instead of searching the working copy.
    pub recipes: Vec<PathBuf>,

    #[arg(long, default_value = ".")]
    /// Working copy containing the recipes.
    pub repo_dir: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TagArgs {
    /// Repository uri.
    pub repo_uri: String,
    /// Tag name.
    pub name: String,
    /// Commit the tag points at.
    pub target: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PrArgs {
    #[arg(short = 'R', long, default_value = "github.com/openbmc/openbmc")]
    /// Repository in [HOST/]OWNER/REPO form.
    pub repo: String,

    #[arg(short = 'B', long, default_value = "master")]
    /// Branch the changes are merged into.
    pub branch: String,

    #[arg(short = 't', long)]
    /// Title, built from the commit subjects when omitted.
    pub title: Option<String>,

    #[arg(short = 'b', long)]
    /// Body, built from the commit messages when omitted.
    pub body: Option<String>,

    #[arg(short = 'n', long = "n_entries", default_value_t = 1)]
    /// Number of latest commits described by the pull request.
    pub entries: usize,

    #[arg(short = 'e', long)]
    /// Edit this existing pull request instead of creating one.
    pub edit: Option<u64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum IssueCommand {
    /// Show a work item.
    View {
        id: String,
        #[arg(long)]
        /// Print only this attribute.
        attribute: Option<String>,
    },

    /// Change state or attributes of a work item.
    Modify {
        id: String,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        wifile: Option<PathBuf>,
        /// KEY: VALUE attribute tokens.
        attributes: Vec<String>,
    },

    /// Create a work item.
    Create {
        #[arg(long = "type")]
        item_type: String,
        #[arg(long)]
        wifile: Option<PathBuf>,
        attributes: Vec<String>,
    },

    /// Add a comment to a work item.
    Addnote { id: String, message: String },

    /// Add a comment and print whether the tracker accepted it.
    Addcomment { id: String, comment: String },

    /// Show the logged in user.
    Whoami,

    /// Save the current working environment.
    Setcwe {
        #[arg(long)]
        repository: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },

    /// Full text search.
    Search {
        text: String,
        #[arg(short, long)]
        max: Option<u32>,
    },

    /// Run a saved query.
    Runquery {
        name: String,
        #[arg(long)]
        /// Print `|` separated rows instead of JSON.
        text_mode: bool,
    },

    /// List the saved queries of the project.
    Listqueries,

    /// Subscribe users to a work item.
    Subscribe { id: String, users: Vec<String> },

    /// Remove a subscriber, the logged in user by default.
    Unsubscribe { id: String, user: Option<String> },

    /// Link a work item to other items or URLs.
    Link {
        id: String,
        link_type: String,
        targets: Vec<String>,
    },

    /// Remove links from a work item.
    Unlink {
        id: String,
        link_type: String,
        targets: Vec<String>,
    },

    /// End the tracker session.
    Logout,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SyncArgs {
    /// Repository name on the source host.
    pub repo_name: String,

    #[arg(long = "target_repo_name", alias = "target-repo-name")]
    /// Repository name on the target host. Defaults to the source name.
    pub target_repo_name: Option<String>,

    #[arg(long = "repo_path", alias = "repo-path")]
    /// Workspace directory holding the clone.
    pub repo_path: Option<PathBuf>,

    #[arg(long = "repo_dir_name", alias = "repo-dir-name")]
    /// Directory name of the clone. Defaults to the repository name.
    pub repo_dir_name: Option<String>,

    #[arg(long = "source_domain", alias = "source-domain")]
    pub source_domain: Option<String>,

    #[arg(long = "target_domain", alias = "target-domain")]
    pub target_domain: Option<String>,

    #[arg(long = "source_project", alias = "source-project")]
    pub source_project: Option<String>,

    #[arg(long = "target_project", alias = "target-project")]
    pub target_project: Option<String>,

    #[arg(long = "remote_branch", alias = "remote-branch")]
    /// Branch to sync. Defaults to [sync] default_branch.
    pub remote_branch: Option<String>,

    #[arg(long = "json_file", default_value = "last_config.json")]
    /// Settings read before parsing and saved after a successful sync.
    pub json_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_with_outputs() {
        let args = Args::parse_from([
            "revtrack",
            "--dry-run",
            "report",
            "github.com/openbmc/openbmc",
            "1.0",
            "1.1",
            "--html_file",
            "out.html",
            "--json_file",
            "out.json",
        ]);

        assert!(args.dry_run);
        match args.command {
            Command::Report(report) => {
                assert_eq!(report.begin, "1.0");
                assert_eq!(report.html_file, Some(PathBuf::from("out.html")));
                assert_eq!(report.json_file, Some(PathBuf::from("out.json")));
                assert!(report.wiki.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_bump_with_recipes() {
        let args = Args::parse_from([
            "revtrack",
            "bump",
            "bmcweb",
            "0123456789012345678901234567890123456789",
            "--recipe",
            "a.bb",
            "--recipe",
            "b.bb",
            "--location",
            "downstream",
            "--debug",
        ]);

        assert!(args.debug);
        match args.command {
            Command::Bump(bump) => {
                assert_eq!(bump.recipes.len(), 2);
                assert_eq!(bump.location.as_deref(), Some("downstream"));
                assert!(bump.remote.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_issue_subcommand() {
        let args = Args::parse_from([
            "revtrack", "issue", "modify", "282739", "--state", "Close",
            "Tags:", "foo",
        ]);

        match args.command {
            Command::Issue(IssueCommand::Modify {
                id,
                state,
                attributes,
                ..
            }) => {
                assert_eq!(id, "282739");
                assert_eq!(state.as_deref(), Some("Close"));
                assert_eq!(attributes, vec!["Tags:", "foo"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_pr_defaults() {
        let args = Args::parse_from(["revtrack", "pr", "-n", "2"]);
        match args.command {
            Command::Pr(pr) => {
                assert_eq!(pr.entries, 2);
                assert_eq!(pr.branch, "master");
                assert!(pr.edit.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
