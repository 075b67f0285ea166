//! Implements the SourceHost trait for Github
use async_trait::async_trait;
use log::*;
use octocrab::{Octocrab, params::repos::Reference};
use serde::{Deserialize, Serialize};

use crate::{
    error::RevtrackError,
    forge::{
        config::{DEFAULT_PAGE_SIZE, RemoteConfig},
        request::{ChangedFile, HostCommit, PullRequest},
        traits::SourceHost,
    },
    result::Result,
};

#[derive(Debug, Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct CompareCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    total_commits: u64,
    commits: Vec<CompareCommit>,
}

#[derive(Debug, Deserialize)]
struct GitAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    message: String,
    author: Option<GitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitStats {
    additions: u64,
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    sha: String,
    commit: GitCommit,
    stats: Option<CommitStats>,
    #[serde(default)]
    files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
struct PullNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedRepository {
    full_name: String,
}

impl From<CommitDetail> for HostCommit {
    fn from(detail: CommitDetail) -> Self {
        let (insertions, deletions) = detail
            .stats
            .map(|s| (s.additions, s.deletions))
            .unwrap_or_default();

        HostCommit {
            id: detail.sha,
            author_name: detail
                .commit
                .author
                .and_then(|a| a.name)
                .unwrap_or_default(),
            message: detail.commit.message,
            insertions,
            deletions,
            files: detail
                .files
                .into_iter()
                .map(|f| ChangedFile {
                    filename: f.filename,
                    patch: f.patch,
                })
                .collect(),
        }
    }
}

/// GitHub host implementation using Octocrab for both github.com and
/// enterprise instances.
pub struct Github {
    config: RemoteConfig,
    instance: Octocrab,
}

impl Github {
    /// Create a client for the configured repository and verify the
    /// repository is reachable.
    pub async fn new(config: RemoteConfig) -> Result<Self> {
        let instance = Self::client(&config)?;

        let repo = instance.repos(&config.owner, &config.repo).get().await?;

        debug!(
            "connected to {}/{}: default branch {:?}",
            config.owner, config.repo, repo.default_branch
        );

        Ok(Self { config, instance })
    }

    fn client(config: &RemoteConfig) -> Result<Octocrab> {
        let mut builder =
            Octocrab::builder().base_uri(config.api_base_url.clone())?;

        if let Some(token) = &config.token {
            builder = builder.personal_token(token.clone());
        }

        Ok(builder.build()?)
    }

    /// Create `config.repo` under the `config.owner` organization.
    pub async fn create_repository(config: &RemoteConfig) -> Result<()> {
        if config.token.is_none() {
            return Err(RevtrackError::forge(format!(
                "creating {}/{} requires an access token",
                config.owner, config.repo
            ))
            .into());
        }

        let instance = Self::client(config)?;

        let endpoint =
            format!("{}/orgs/{}/repos", config.api_base_url, config.owner);

        let body = serde_json::json!({
            "name": config.repo,
            "private": false,
        });

        let created: CreatedRepository =
            instance.post(endpoint, Some(&body)).await?;

        info!("created repository {}", created.full_name);

        Ok(())
    }

    async fn get_commit_detail(&self, sha: &str) -> Result<HostCommit> {
        let endpoint = format!(
            "{}/repos/{}/{}/commits/{}",
            self.config.api_base_url, self.config.owner, self.config.repo, sha
        );

        let detail: CommitDetail =
            self.instance.get(endpoint, None::<&()>).await?;

        Ok(detail.into())
    }
}

#[async_trait]
impl SourceHost for Github {
    fn remote_config(&self) -> RemoteConfig {
        self.config.clone()
    }

    async fn list_commits(
        &self,
        begin: &str,
        end: &str,
    ) -> Result<Vec<HostCommit>> {
        let endpoint = format!(
            "{}/repos/{}/{}/compare/{}...{}",
            self.config.api_base_url,
            self.config.owner,
            self.config.repo,
            begin,
            end
        );

        let mut shas: Vec<String> = vec![];
        let mut page = 1;

        loop {
            let params = PageParams {
                per_page: DEFAULT_PAGE_SIZE,
                page,
            };

            let response: CompareResponse = self
                .instance
                .get(&endpoint, Some(&params))
                .await
                .map_err(RevtrackError::from)?;

            let count = response.commits.len();
            shas.extend(response.commits.into_iter().map(|c| c.sha));

            if count == 0 || shas.len() as u64 >= response.total_commits {
                break;
            }

            page += 1;
        }

        info!(
            "{}/{}: {} commits in {begin}...{end}",
            self.config.owner,
            self.config.repo,
            shas.len()
        );

        let mut commits = vec![];

        for sha in shas.iter() {
            commits.push(self.get_commit_detail(sha).await?);
        }

        Ok(commits)
    }

    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        let pr = self
            .instance
            .pulls(&self.config.owner, &self.config.repo)
            .get(number)
            .await?;

        let page = self
            .instance
            .issues(&self.config.owner, &self.config.repo)
            .list_comments(number)
            .per_page(DEFAULT_PAGE_SIZE)
            .send()
            .await?;

        let comments = self
            .instance
            .all_pages(page)
            .await?
            .into_iter()
            .filter_map(|c| c.body)
            .collect();

        Ok(PullRequest {
            number,
            body: pr.body.unwrap_or_default(),
            comments,
        })
    }

    async fn list_pull_requests_for_commit(
        &self,
        commit_id: &str,
    ) -> Result<Vec<u64>> {
        let endpoint = format!(
            "{}/repos/{}/{}/commits/{}/pulls",
            self.config.api_base_url,
            self.config.owner,
            self.config.repo,
            commit_id
        );

        let pulls: Vec<PullNumber> =
            self.instance.get(endpoint, None::<&()>).await?;

        Ok(pulls.into_iter().map(|p| p.number).collect())
    }

    async fn create_tag(&self, name: &str, target: &str) -> Result<()> {
        self.instance
            .repos(&self.config.owner, &self.config.repo)
            .create_ref(&Reference::Tag(name.to_string()), target)
            .await?;

        info!(
            "created tag {name} at {target} in {}/{}",
            self.config.owner, self.config.repo
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_commit_detail() {
        let detail: CommitDetail = serde_json::from_value(serde_json::json!({
            "sha": "0123456789abcdef0123456789abcdef01234567",
            "commit": {
                "message": "Bump bmcweb\n\nDetails",
                "author": { "name": "Jane Dev", "email": "jane@example.com" }
            },
            "stats": { "additions": 3, "deletions": 1, "total": 4 },
            "files": [
                { "filename": "bmcweb.bb", "patch": "-SRCREV = \"a\"" },
                { "filename": "logo.png" }
            ]
        }))
        .unwrap();

        let commit: HostCommit = detail.into();
        assert_eq!(commit.author_name, "Jane Dev");
        assert_eq!(commit.insertions, 3);
        assert_eq!(commit.deletions, 1);
        assert_eq!(commit.files.len(), 2);
        assert!(commit.files[1].patch.is_none());
    }

    #[test]
    fn tolerates_missing_stats_and_files() {
        let detail: CommitDetail = serde_json::from_value(serde_json::json!({
            "sha": "abc",
            "commit": { "message": "msg", "author": null }
        }))
        .unwrap();

        let commit: HostCommit = detail.into();
        assert_eq!(commit.author_name, "");
        assert_eq!(commit.insertions, 0);
        assert!(commit.files.is_empty());
    }
}
