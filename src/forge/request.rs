use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// File touched by a commit, with its unified diff when the host provides
/// one.
pub struct ChangedFile {
    pub filename: String,
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Commit as reported by a source host.
pub struct HostCommit {
    pub id: String,
    pub author_name: String,
    pub message: String,
    pub insertions: u64,
    pub deletions: u64,
    pub files: Vec<ChangedFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Pull request text used for metadata extraction.
pub struct PullRequest {
    pub number: u64,
    pub body: String,
    pub comments: Vec<String>,
}

impl PullRequest {
    /// Body followed by every comment.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.body.as_str())
            .chain(self.comments.iter().map(String::as_str))
    }
}
