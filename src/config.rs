//! Configuration loading and parsing for `revtrack.toml` files.
//!
//! Every table is optional; missing fields fall back to the defaults below so
//! the tools run without any configuration file at all.
use color_eyre::eyre::Context;
use log::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::result::Result;

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "revtrack.toml";

/// Default maximum recursion depth for commit-tree reports.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Summary marker identifying automated merge commits.
pub const DEFAULT_MERGE_MARKER: &str = "Merge pull request";

/// Delimiter terminating a release note.
pub const DEFAULT_NOTE_DELIMITER: &str = "::";

/// Pattern locating the start of a release note.
pub const DEFAULT_RELEASE_NOTE_PATTERN: &str = r"(?is)Release note[: ](.*)";

/// Kernel recipe whose `KSRC` line holds the kernel URI.
pub const DEFAULT_KERNEL_RECIPE: &str =
    "meta-aspeed/recipes-kernel/linux/linux-aspeed_git.bb";

/// Source host selection and credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostsConfig {
    /// Hostname of the public hosting service.
    pub public_host: String,
    /// Hostname of the enterprise hosting service, if one is used.
    pub enterprise_host: Option<String>,
    /// Environment variable holding the public service token.
    pub public_token_env: String,
    /// Environment variable holding the enterprise service token.
    pub enterprise_token_env: String,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            public_host: "github.com".into(),
            enterprise_host: None,
            public_token_env: "GITHUB_TOKEN".into(),
            enterprise_token_env: "GHE_TOKEN".into(),
        }
    }
}

/// Commit-tree report settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Maximum depth of dependency recursion.
    pub max_depth: usize,
    /// URI prefixes a bumped dependency must start with to be followed.
    pub bump_uri_schemes: Vec<String>,
    /// Summary text marking merge commits that are not expanded.
    pub merge_marker: String,
    /// Link template for issue identifiers, `{id}` is substituted.
    pub defect_link_template: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            bump_uri_schemes: vec!["git".into()],
            merge_marker: DEFAULT_MERGE_MARKER.into(),
            defect_link_template: None,
        }
    }
}

/// A named issue identifier pattern.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IssueRule {
    pub name: String,
    pub pattern: String,
}

impl IssueRule {
    fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Text extraction rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Issue identifier rules in priority order.
    pub issue_rules: Vec<IssueRule>,
    /// Pattern whose first capture group is the release note text.
    pub release_note_pattern: String,
    /// Delimiter that ends a release note.
    pub note_delimiter: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            issue_rules: vec![
                IssueRule::new(
                    "defect",
                    r"(?i)fixes\b[^\n]*?\b([SF]W[0-9]+)\b",
                ),
                IssueRule::new("tracker", r"(?i)fixes\b[^\n]*?\b(PE[0-9]+)\b"),
                IssueRule::new(
                    "numeric-defect",
                    r"(?i)fixes\b[^\n]*?#?\b([0-9]{6,8})\b",
                ),
            ],
            release_note_pattern: DEFAULT_RELEASE_NOTE_PATTERN.into(),
            note_delimiter: DEFAULT_NOTE_DELIMITER.into(),
        }
    }
}

/// Recipe bump settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BumpConfig {
    /// Remote host recipes must reference.
    pub remote: String,
    /// Organization recipes must reference.
    pub org: String,
    /// Label inserted in the commit subject, e.g. "downstream".
    pub location: Option<String>,
    /// Project whose recipes pin it through a `KSRC` variable.
    pub kernel_project: String,
    /// Recipes searched for `kernel_project` instead of `git grep`.
    pub kernel_recipes: Vec<String>,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            remote: "github.com".into(),
            org: "openbmc".into(),
            location: None,
            kernel_project: "linux".into(),
            kernel_recipes: vec![DEFAULT_KERNEL_RECIPE.into()],
        }
    }
}

/// Issue tracker adapter settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Tracker command line tool.
    pub program: Option<String>,
    /// Arguments placed before every tool subcommand.
    pub program_args: Vec<String>,
    pub id: Option<String>,
    pub password: Option<String>,
    pub project: Option<String>,
    pub repository: Option<String>,
    /// File whose first line is the password; `~` and variables are expanded.
    pub authentication_file: Option<String>,
    /// Domain appended to `$USER` for the default login id.
    pub user_domain: Option<String>,
}

/// Extra remote kept in a synced working copy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MirrorRemote {
    pub name: String,
    pub domain: String,
    pub project: String,
}

/// Repository sync settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remotes created in every synced working copy.
    pub mirrors: Vec<MirrorRemote>,
    /// Domain of the read-only upstream `origin`.
    pub upstream_domain: String,
    /// Project of the read-only upstream `origin`.
    pub upstream_project: String,
    /// Default branch pushed to the target mirror.
    pub default_branch: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mirrors: vec![],
            upstream_domain: "github.com".into(),
            upstream_project: "openbmc".into(),
            default_branch: "master".into(),
        }
    }
}

/// Root configuration structure for `revtrack.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub hosts: HostsConfig,
    pub report: ReportConfig,
    pub extract: ExtractConfig,
    pub bump: BumpConfig,
    pub tracker: TrackerConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] in the
    /// current directory when it exists, otherwise use defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    debug!("no configuration found: using default");
                    return Ok(Config::default());
                }
                default_path.to_path_buf()
            }
        };

        let content =
            tokio::fs::read_to_string(&path).await.wrap_err_with(|| {
                format!("failed to read config file {}", path.display())
            })?;

        let config = Self::parse(&content).wrap_err_with(|| {
            format!("failed to parse config file {}", path.display())
        })?;

        info!("loaded configuration from {}", path.display());

        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults() {
        let config = Config::default();
        assert_eq!(config.report.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.report.bump_uri_schemes, vec!["git".to_string()]);
        assert_eq!(config.extract.issue_rules.len(), 3);
        assert_eq!(config.extract.issue_rules[0].name, "defect");
        assert_eq!(config.hosts.public_host, "github.com");
    }

    #[test]
    fn parses_partial_config() {
        let config = Config::parse(
            r#"
[hosts]
enterprise_host = "git.corp.example"

[report]
max_depth = 3

[[extract.issue_rules]]
name = "jira"
pattern = '(?i)fixes\s+([A-Z]+-[0-9]+)'
"#,
        )
        .unwrap();

        assert_eq!(
            config.hosts.enterprise_host.as_deref(),
            Some("git.corp.example")
        );
        assert_eq!(config.hosts.public_host, "github.com");
        assert_eq!(config.report.max_depth, 3);
        assert_eq!(config.report.merge_marker, DEFAULT_MERGE_MARKER);
        assert_eq!(config.extract.issue_rules.len(), 1);
        assert_eq!(config.extract.issue_rules[0].name, "jira");
        assert_eq!(config.extract.note_delimiter, DEFAULT_NOTE_DELIMITER);
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(Config::parse("[report]\nmax_depth = \"deep\"").is_err());
    }

    #[tokio::test]
    async fn loads_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[bump]\norg = \"ibm-fork\"\n").unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.bump.org, "ibm-fork");
        assert_eq!(config.bump.remote, "github.com");
    }

    #[test]
    fn parses_sync_mirrors() {
        let config = Config::parse(
            r#"
[bump]
kernel_recipes = ["meta-fork/recipes-kernel/linux/linux-fork_git.bb"]

[[sync.mirrors]]
name = "ghe"
domain = "github.ibm.com"
project = "openbmc"
"#,
        )
        .unwrap();

        assert_eq!(config.sync.mirrors, vec![MirrorRemote {
            name: "ghe".into(),
            domain: "github.ibm.com".into(),
            project: "openbmc".into(),
        }]);
        assert_eq!(config.bump.kernel_project, "linux");
        assert_eq!(config.bump.kernel_recipes, vec![
            "meta-fork/recipes-kernel/linux/linux-fork_git.bb".to_string()
        ]);
    }

    #[tokio::test]
    async fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Config::load(Some(&path)).await.is_err());
    }
}
