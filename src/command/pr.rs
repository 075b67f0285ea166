//! Pull request helper built on the `gh` command line tool.
use std::sync::Arc;

use crate::{
    cli::PrArgs,
    command::common::Context,
    git::WorkingCopy,
    process::{CommandRunner, CommandSpec, run_checked},
    result::Result,
};

/// One local commit described by the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitText {
    pub subject: String,
    pub body: String,
}

/// `"<branch>: <subject1> & <subject2> ..."`
pub fn default_title(branch: &str, commits: &[CommitText]) -> String {
    let subjects: Vec<&str> =
        commits.iter().map(|c| c.subject.as_str()).collect();
    format!("{branch}: {}", subjects.join(" & "))
}

/// One `#### <subject>` heading per commit followed by its fenced body.
pub fn default_body(commits: &[CommitText]) -> String {
    commits
        .iter()
        .map(|c| format!("#### {}\n```\n{}```", c.subject, c.body))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `gh` invocation creating, or editing when `edit` is set, a pull request.
pub fn gh_command(args: &PrArgs, title: &str, body: &str) -> CommandSpec {
    let mut gh_args: Vec<String> = vec!["pr".into()];

    match args.edit {
        Some(number) => gh_args.extend([
            "edit".into(),
            number.to_string(),
            "-R".into(),
            args.repo.clone(),
        ]),
        None => gh_args.extend([
            "create".into(),
            "-R".into(),
            args.repo.clone(),
            "-B".into(),
            args.branch.clone(),
        ]),
    }

    gh_args.extend(["-b".into(), body.into(), "-t".into(), title.into()]);

    CommandSpec::new("gh", gh_args)
}

async fn latest_commits(
    working_copy: &WorkingCopy,
    count: usize,
) -> Result<Vec<CommitText>> {
    let count = count.to_string();
    let ids = working_copy
        .log(&["-n", &count, "--pretty=format:%h"])
        .await?;

    let mut commits = vec![];

    for id in ids.split_whitespace() {
        let subject = working_copy
            .log(&["-n", "1", "--pretty=format:%s", id])
            .await?;
        let body = working_copy
            .log(&["-n", "1", "--pretty=format:%b", id])
            .await?;
        commits.push(CommitText {
            subject: subject.trim().to_string(),
            body,
        });
    }

    Ok(commits)
}

/// Execute pr command.
pub async fn execute(ctx: &Context, args: &PrArgs) -> Result<()> {
    let working_copy = WorkingCopy::new(".", ctx.runner.clone(), ctx.dry_run);
    submit(&working_copy, ctx.runner.clone(), args).await
}

async fn submit(
    working_copy: &WorkingCopy,
    runner: Arc<dyn CommandRunner>,
    args: &PrArgs,
) -> Result<()> {
    let commits = if args.title.is_none() || args.body.is_none() {
        latest_commits(working_copy, args.entries).await?
    } else {
        vec![]
    };

    let title = args
        .title
        .clone()
        .unwrap_or_else(|| default_title(&args.branch, &commits));
    let body = args.body.clone().unwrap_or_else(|| default_body(&commits));

    let spec = gh_command(args, &title, &body);

    if working_copy.dry_run() {
        println!("{}", spec.display());
        return Ok(());
    }

    let output = run_checked(runner.as_ref(), spec).await?;
    println!("{}", output.stdout.trim_end());

    Ok(())
}
