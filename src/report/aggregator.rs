//! Recursive commit report aggregation across bumped dependencies.
use futures_util::{FutureExt, future::BoxFuture};
use log::*;
use regex::Regex;
use std::collections::HashMap;

use crate::{
    config::ReportConfig,
    extract::{TextExtractor, push_unique},
    forge::{
        config::PrLinkage,
        request::HostCommit,
        traits::{HostResolver, SourceHost},
    },
    report::model::CommitReport,
    result::Result,
};

/// A commit range in one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeKey {
    pub uri: String,
    pub begin: String,
    pub end: String,
}

impl RangeKey {
    pub fn new(uri: &str, begin: &str, end: &str) -> Self {
        Self {
            uri: uri.to_string(),
            begin: begin.to_string(),
            end: end.to_string(),
        }
    }
}

/// Commits whose message is not repeated later in the list. For a repeated
/// message only the last occurrence survives; host order is preserved.
pub fn dedup_by_message(commits: &[HostCommit]) -> Vec<&HostCommit> {
    let mut last_seen: HashMap<&str, &str> = HashMap::new();

    for commit in commits.iter() {
        last_seen.insert(commit.message.as_str(), commit.id.as_str());
    }

    commits
        .iter()
        .filter(|c| {
            if last_seen.get(c.message.as_str()) == Some(&c.id.as_str()) {
                last_seen.remove(c.message.as_str());
                return true;
            }
            debug!("dropping duplicate message commit {}", c.id);
            false
        })
        .collect()
}

/// Walks commit ranges, following dependency bumps into the bumped
/// repositories.
pub struct Aggregator<'a> {
    resolver: &'a dyn HostResolver,
    extractor: &'a TextExtractor,
    config: &'a ReportConfig,
    trailing_pr: Regex,
    merge_pr: Regex,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        resolver: &'a dyn HostResolver,
        extractor: &'a TextExtractor,
        config: &'a ReportConfig,
    ) -> Result<Self> {
        Ok(Self {
            resolver,
            extractor,
            config,
            trailing_pr: Regex::new(r"\(#([0-9]+)\)$")?,
            merge_pr: Regex::new(r"Merge pull request #([0-9]+)")?,
        })
    }

    /// Reports for the commits after `begin` up to `end` in `uri`, in host
    /// order. Never fails: unreachable repositories yield no reports and a
    /// failing walk keeps the reports built so far.
    pub async fn aggregate(
        &self,
        uri: &str,
        begin: &str,
        end: &str,
    ) -> Vec<CommitReport> {
        let range = RangeKey::new(uri, begin, end);
        self.aggregate_range(range.clone(), vec![range]).await
    }

    fn aggregate_range<'s>(
        &'s self,
        range: RangeKey,
        chain: Vec<RangeKey>,
    ) -> BoxFuture<'s, Vec<CommitReport>> {
        async move {
            let host = match self.resolver.resolve(&range.uri).await {
                Ok(host) => host,
                Err(err) => {
                    warn!("skipping {}: {err:#}", range.uri);
                    return vec![];
                }
            };

            let mut reports = vec![];

            if let Err(err) = self
                .collect(host.as_ref(), &range, &chain, &mut reports)
                .await
            {
                error!(
                    "failed walking {} {}..{}: {err:#}",
                    range.uri, range.begin, range.end
                );
            }

            reports
        }
        .boxed()
    }

    async fn collect(
        &self,
        host: &dyn SourceHost,
        range: &RangeKey,
        chain: &[RangeKey],
        reports: &mut Vec<CommitReport>,
    ) -> Result<()> {
        let commits = host.list_commits(&range.begin, &range.end).await?;
        let linkage = host.remote_config().linkage;

        for commit in dedup_by_message(&commits) {
            let mut report = CommitReport::new(&range.uri, commit);

            if report.summary.contains(&self.config.merge_marker) {
                debug!("merge commit {}: no metadata", report.short_id);
                reports.push(report);
                continue;
            }

            match self.pull_request_metadata(host, linkage, commit).await {
                Ok((issues, notes)) => {
                    report.closed_issues = issues;
                    report.release_notes = notes;
                }
                Err(err) => {
                    warn!(
                        "no pull request metadata for {}: {err:#}",
                        report.short_id
                    );
                }
            }

            for file in commit.files.iter() {
                let Some(patch) = &file.patch else {
                    continue;
                };

                let Some(bump) = self.extractor.bump(patch) else {
                    continue;
                };

                if !bump.qualifies(&self.config.bump_uri_schemes) {
                    debug!("ignoring bump of {} in {}", bump.uri, file.filename);
                    continue;
                }

                let child = RangeKey::new(&bump.uri, &bump.old_rev, &bump.new_rev);

                if chain.contains(&child) {
                    warn!(
                        "cycle: {} {}..{} is already being expanded",
                        child.uri, child.begin, child.end
                    );
                    continue;
                }

                if chain.len() >= self.config.max_depth {
                    warn!(
                        "max depth {} reached: not expanding {}",
                        self.config.max_depth, child.uri
                    );
                    continue;
                }

                info!(
                    "{} bumps {} {}..{}",
                    report.short_id, child.uri, child.begin, child.end
                );

                let mut child_chain = chain.to_vec();
                child_chain.push(child.clone());

                let children = self.aggregate_range(child, child_chain).await;
                report.children.extend(children);
            }

            reports.push(report);
        }

        Ok(())
    }

    async fn pull_request_metadata(
        &self,
        host: &dyn SourceHost,
        linkage: PrLinkage,
        commit: &HostCommit,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let numbers = match linkage {
            PrLinkage::Query => {
                host.list_pull_requests_for_commit(&commit.id).await?
            }
            PrLinkage::Summary => self.summary_pull_numbers(&commit.message),
        };

        let mut issues = vec![];
        let mut notes = vec![];

        for number in numbers {
            let pr = host.get_pull_request(number).await?;
            for text in pr.texts() {
                for issue in self.extractor.issues(text) {
                    push_unique(&mut issues, issue);
                }
                for note in self.extractor.release_notes(text) {
                    push_unique(&mut notes, note);
                }
            }
        }

        Ok((issues, notes))
    }

    /// Pull request numbers named by `(#N)` at the end of the summary or a
    /// `Merge pull request #N` summary.
    fn summary_pull_numbers(&self, message: &str) -> Vec<u64> {
        let summary = message.lines().next().unwrap_or_default().trim();
        let mut numbers = vec![];

        for re in [&self.trailing_pr, &self.merge_pr] {
            if let Some(n) = re
                .captures(summary)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
            {
                push_unique(&mut numbers, n);
            }
        }

        numbers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ExtractConfig, ReportConfig},
        error::RevtrackError,
        forge::{
            config::RemoteConfig,
            request::{ChangedFile, PullRequest},
            traits::MockSourceHost,
        },
    };
    use std::sync::{Arc, Mutex};

    const ROOT: &str = "git://github.com/openbmc/openbmc";
    const DEP: &str = "git://github.com/openbmc/bmcweb";
    const BEGIN: &str = "b0b0";
    const END: &str = "e0e0";

    fn commit(id: &str, message: &str) -> HostCommit {
        HostCommit {
            id: id.into(),
            author_name: "Jane Dev".into(),
            message: message.into(),
            insertions: 1,
            deletions: 1,
            files: vec![],
        }
    }

    fn bump_patch(uri: &str, old: &str, new: &str) -> String {
        format!(
            " SRC_URI += \"{uri}\"\n-SRCREV = \"{old}\"\n+SRCREV = \"{new}\"\n"
        )
    }

    fn remote(linkage: PrLinkage) -> RemoteConfig {
        RemoteConfig {
            linkage,
            ..RemoteConfig::default()
        }
    }

    /// Resolver serving canned commit lists per `(uri, begin, end)` and
    /// recording every range requested.
    struct FakeResolver {
        ranges: HashMap<(String, String, String), Vec<HostCommit>>,
        prs: HashMap<u64, PullRequest>,
        linkage: PrLinkage,
        requested: Arc<Mutex<Vec<(String, String, String)>>>,
        unreachable: Vec<String>,
    }

    impl FakeResolver {
        fn new(linkage: PrLinkage) -> Self {
            Self {
                ranges: HashMap::new(),
                prs: HashMap::new(),
                linkage,
                requested: Arc::new(Mutex::new(vec![])),
                unreachable: vec![],
            }
        }

        fn with_range(
            mut self,
            uri: &str,
            begin: &str,
            end: &str,
            commits: Vec<HostCommit>,
        ) -> Self {
            self.ranges
                .insert((uri.into(), begin.into(), end.into()), commits);
            self
        }

        fn with_pr(mut self, number: u64, body: &str, comments: &[&str]) -> Self {
            self.prs.insert(
                number,
                PullRequest {
                    number,
                    body: body.into(),
                    comments: comments.iter().map(|c| c.to_string()).collect(),
                },
            );
            self
        }

        fn requested(&self) -> Vec<(String, String, String)> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HostResolver for FakeResolver {
        async fn resolve(&self, uri: &str) -> Result<Box<dyn SourceHost>> {
            if self.unreachable.iter().any(|u| u == uri) {
                return Err(RevtrackError::UnsupportedHost(uri.into()).into());
            }

            let ranges = self.ranges.clone();
            let prs = self.prs.clone();
            let requested = Arc::clone(&self.requested);
            let linkage = self.linkage;
            let uri = uri.to_string();

            let mut host = MockSourceHost::new();
            host.expect_remote_config()
                .returning(move || remote(linkage));
            host.expect_list_commits().returning(move |begin, end| {
                let key = (uri.clone(), begin.to_string(), end.to_string());
                requested.lock().unwrap().push(key.clone());
                ranges
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| RevtrackError::forge("bad range").into())
            });
            let lookup = prs.clone();
            host.expect_get_pull_request().returning(move |n| {
                lookup
                    .get(&n)
                    .cloned()
                    .ok_or_else(|| RevtrackError::forge("no pr").into())
            });
            host.expect_list_pull_requests_for_commit()
                .returning(|id| match id {
                    "c1" => Ok(vec![7]),
                    _ => Ok(vec![]),
                });

            Ok(Box::new(host))
        }

        async fn create_repository(&self, _uri: &str) -> Result<()> {
            Ok(())
        }
    }

    async fn run(
        resolver: &FakeResolver,
        config: &ReportConfig,
    ) -> Vec<CommitReport> {
        let extractor = TextExtractor::new(&ExtractConfig::default()).unwrap();
        let aggregator = Aggregator::new(resolver, &extractor, config).unwrap();
        aggregator.aggregate(ROOT, BEGIN, END).await
    }

    #[test]
    fn duplicate_messages_keep_last_occurrence() {
        let commits = vec![
            commit("aaa", "fix typo"),
            commit("ccc", "other change"),
            commit("bbb", "fix typo"),
        ];

        let survivors: Vec<&str> = dedup_by_message(&commits)
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(survivors, vec!["ccc", "bbb"]);
    }

    #[test_log::test(tokio::test)]
    async fn fix_typo_scenario_reports_last_commit() {
        let resolver = FakeResolver::new(PrLinkage::Query).with_range(
            ROOT,
            BEGIN,
            END,
            vec![commit("aaa", "fix typo"), commit("bbb", "fix typo")],
        );
        let config = ReportConfig::default();
        let extractor = TextExtractor::new(&ExtractConfig::default()).unwrap();
        let aggregator = Aggregator::new(&resolver, &extractor, &config).unwrap();

        let reports = aggregator.aggregate(ROOT, BEGIN, END).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].commit_id, "bbb");
        assert_eq!(reports[0].repository_name, "openbmc");
    }

    #[test_log::test(tokio::test)]
    async fn merge_commits_have_no_metadata_or_children() {
        let mut merge = commit("c1", "Merge pull request #12 from dev/topic");
        merge.files = vec![ChangedFile {
            filename: "bmcweb.bb".into(),
            patch: Some(bump_patch(DEP, "1111", "2222")),
        }];

        let resolver = FakeResolver::new(PrLinkage::Query)
            .with_range(ROOT, BEGIN, END, vec![merge])
            .with_pr(7, "Fixes SW000001", &[]);

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].closed_issues.is_empty());
        assert!(reports[0].release_notes.is_empty());
        assert!(reports[0].children.is_empty());
        assert_eq!(resolver.requested().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn bump_recurses_into_dependency_range() {
        let mut bump = commit("c1", "bmcweb: srcrev bump 1111..2222");
        bump.files = vec![
            ChangedFile {
                filename: "README".into(),
                patch: None,
            },
            ChangedFile {
                filename: "bmcweb.bb".into(),
                patch: Some(bump_patch(DEP, "1111", "2222")),
            },
        ];

        let resolver = FakeResolver::new(PrLinkage::Query)
            .with_range(ROOT, BEGIN, END, vec![bump])
            .with_range(DEP, "1111", "2222", vec![commit("d1", "Add route")])
            .with_pr(
                7,
                "Fixes: SW123456 and also fixes SW123456 again",
                &["Release note: Adds route ::"],
            );

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].closed_issues, vec!["SW123456"]);
        assert_eq!(reports[0].release_notes, vec!["Adds route"]);
        assert_eq!(reports[0].children.len(), 1);
        assert_eq!(reports[0].children[0].commit_id, "d1");
        assert_eq!(reports[0].children[0].repository_name, "bmcweb");
        assert!(resolver.requested().contains(&(
            DEP.to_string(),
            "1111".to_string(),
            "2222".to_string()
        )));
    }

    #[test_log::test(tokio::test)]
    async fn incomplete_or_unqualified_bumps_do_not_recurse() {
        let mut incomplete = commit("c2", "partial");
        incomplete.files = vec![ChangedFile {
            filename: "a.bb".into(),
            patch: Some(format!(" SRC_URI = \"{DEP}\"\n+SRCREV = \"2222\"\n")),
        }];
        let mut https = commit("c3", "https dep");
        https.files = vec![ChangedFile {
            filename: "b.bb".into(),
            patch: Some(bump_patch(
                "https://github.com/openbmc/bmcweb",
                "1111",
                "2222",
            )),
        }];

        let resolver = FakeResolver::new(PrLinkage::Query).with_range(
            ROOT,
            BEGIN,
            END,
            vec![incomplete, https],
        );

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.children.is_empty()));
        assert_eq!(resolver.requested().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn unreachable_dependency_is_skipped() {
        let mut bump = commit("c4", "bump");
        bump.files = vec![ChangedFile {
            filename: "bmcweb.bb".into(),
            patch: Some(bump_patch(DEP, "1111", "2222")),
        }];

        let mut resolver = FakeResolver::new(PrLinkage::Query)
            .with_range(ROOT, BEGIN, END, vec![bump, commit("c5", "next")]);
        resolver.unreachable.push(DEP.into());

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].children.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn unresolvable_root_yields_nothing() {
        let mut resolver = FakeResolver::new(PrLinkage::Query);
        resolver.unreachable.push(ROOT.into());
        assert!(run(&resolver, &ReportConfig::default()).await.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn failing_dependency_listing_keeps_siblings() {
        let mut bump = commit("c6", "bump");
        bump.files = vec![ChangedFile {
            filename: "bmcweb.bb".into(),
            patch: Some(bump_patch(DEP, "dead", "beef")),
        }];

        // no canned range for the dependency, so listing it fails
        let resolver = FakeResolver::new(PrLinkage::Query)
            .with_range(ROOT, BEGIN, END, vec![bump, commit("c7", "sibling")]);

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports.len(), 2);
        assert!(reports[0].children.is_empty());
        assert_eq!(reports[1].commit_id, "c7");
    }

    #[test_log::test(tokio::test)]
    async fn missing_pull_request_keeps_commit_without_metadata() {
        // c1 links to PR 7, which the host does not know
        let resolver = FakeResolver::new(PrLinkage::Query).with_range(
            ROOT,
            BEGIN,
            END,
            vec![commit("c1", "change")],
        );

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].closed_issues.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn summary_linkage_reads_pr_number() {
        let resolver = FakeResolver::new(PrLinkage::Summary)
            .with_range(
                ROOT,
                BEGIN,
                END,
                vec![commit("x1", "Update fan tables (#42)\n\nbody")],
            )
            .with_pr(42, "", &["fixes FW000777"]);

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports[0].closed_issues, vec!["FW000777"]);
    }

    #[test_log::test(tokio::test)]
    async fn cycles_are_not_expanded() {
        let mut forward = commit("c1", "bump dep");
        forward.files = vec![ChangedFile {
            filename: "dep.bb".into(),
            patch: Some(bump_patch(DEP, "1111", "2222")),
        }];
        let mut back = commit("d1", "bump root");
        back.files = vec![ChangedFile {
            filename: "root.bb".into(),
            patch: Some(bump_patch(ROOT, BEGIN, END)),
        }];

        let resolver = FakeResolver::new(PrLinkage::Query)
            .with_range(ROOT, BEGIN, END, vec![forward])
            .with_range(DEP, "1111", "2222", vec![back]);

        let reports = run(&resolver, &ReportConfig::default()).await;
        assert_eq!(reports[0].children.len(), 1);
        assert!(reports[0].children[0].children.is_empty());
        assert_eq!(resolver.requested().len(), 2);
    }

    #[test_log::test(tokio::test)]
    async fn depth_is_capped() {
        let mut bump = commit("c1", "bump dep");
        bump.files = vec![ChangedFile {
            filename: "dep.bb".into(),
            patch: Some(bump_patch(DEP, "1111", "2222")),
        }];

        let resolver = FakeResolver::new(PrLinkage::Query)
            .with_range(ROOT, BEGIN, END, vec![bump])
            .with_range(DEP, "1111", "2222", vec![commit("d1", "leaf")]);

        let config = ReportConfig {
            max_depth: 1,
            ..ReportConfig::default()
        };

        let reports = run(&resolver, &config).await;
        assert!(reports[0].children.is_empty());
        assert_eq!(resolver.requested().len(), 1);
    }
}
