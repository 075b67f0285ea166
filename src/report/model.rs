//! Commit report tree.
use serde::{Deserialize, Serialize};

use crate::{
    extract::push_unique,
    forge::{config::repo_name_from_uri, request::HostCommit},
};

/// Report for one deduplicated commit, with the reports of any dependency
/// ranges it bumped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub repository_uri: String,
    pub repository_name: String,
    pub commit_id: String,
    pub short_id: String,
    pub author_name: String,
    pub summary: String,
    pub insertions: u64,
    pub deletions: u64,
    pub closed_issues: Vec<String>,
    pub release_notes: Vec<String>,
    pub children: Vec<CommitReport>,
}

impl CommitReport {
    /// Report with commit identity and stats filled in and no metadata.
    pub fn new(repository_uri: &str, commit: &HostCommit) -> Self {
        Self {
            repository_uri: repository_uri.to_string(),
            repository_name: repo_name_from_uri(repository_uri),
            commit_id: commit.id.clone(),
            short_id: commit.id.chars().take(7).collect(),
            author_name: commit.author_name.clone(),
            summary: summarize(&commit.message),
            insertions: commit.insertions,
            deletions: commit.deletions,
            closed_issues: vec![],
            release_notes: vec![],
            children: vec![],
        }
    }

    pub fn total_insertions(&self) -> u64 {
        self.insertions
            + self
                .children
                .iter()
                .map(CommitReport::total_insertions)
                .sum::<u64>()
    }

    pub fn total_deletions(&self) -> u64 {
        self.deletions
            + self
                .children
                .iter()
                .map(CommitReport::total_deletions)
                .sum::<u64>()
    }

    /// Closed issues of this commit and its descendants, first seen first.
    pub fn all_closed_issues(&self) -> Vec<String> {
        let mut issues = vec![];
        self.walk(&mut |r| {
            for issue in r.closed_issues.iter() {
                push_unique(&mut issues, issue.clone());
            }
        });
        issues
    }

    /// Release notes of this commit and its descendants, first seen first.
    pub fn all_release_notes(&self) -> Vec<String> {
        let mut notes = vec![];
        self.walk(&mut |r| {
            for note in r.release_notes.iter() {
                push_unique(&mut notes, note.clone());
            }
        });
        notes
    }

    /// Visit this report and its descendants depth first.
    pub fn walk<F: FnMut(&CommitReport)>(&self, visit: &mut F) {
        visit(self);
        for child in self.children.iter() {
            child.walk(visit);
        }
    }
}

/// First line of a commit message with whitespace runs collapsed.
pub fn summarize(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Totals over a report forest.
pub struct ReportSummary<'a> {
    reports: &'a [CommitReport],
}

impl<'a> ReportSummary<'a> {
    pub fn new(reports: &'a [CommitReport]) -> Self {
        Self { reports }
    }

    /// Number of commits including nested dependency commits.
    pub fn commit_count(&self) -> usize {
        let mut count = 0;
        for report in self.reports.iter() {
            report.walk(&mut |_| count += 1);
        }
        count
    }

    pub fn total_insertions(&self) -> u64 {
        self.reports.iter().map(CommitReport::total_insertions).sum()
    }

    pub fn total_deletions(&self) -> u64 {
        self.reports.iter().map(CommitReport::total_deletions).sum()
    }

    pub fn closed_issues(&self) -> Vec<String> {
        let mut issues = vec![];
        for report in self.reports.iter() {
            for issue in report.all_closed_issues() {
                push_unique(&mut issues, issue);
            }
        }
        issues
    }

    pub fn release_notes(&self) -> Vec<String> {
        let mut notes = vec![];
        for report in self.reports.iter() {
            for note in report.all_release_notes() {
                push_unique(&mut notes, note);
            }
        }
        notes
    }
}
