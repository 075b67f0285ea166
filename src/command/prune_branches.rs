//! Delete local branches listed on standard input.
use log::*;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::{command::common::Context, git::WorkingCopy, result::Result};

/// Branch names from pasted references: the text after the last `/` of
/// each line, ignoring lines ending in `/`.
pub fn branch_names(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| line.trim().rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

async fn read_lines<R: AsyncRead + Unpin>(input: R) -> Result<Vec<String>> {
    let mut lines = BufReader::new(input).lines();
    let mut out = vec![];
    while let Some(line) = lines.next_line().await? {
        out.push(line);
    }
    Ok(out)
}

/// Execute prune-branches command.
pub async fn execute(ctx: &Context) -> Result<()> {
    println!("Enter/Paste your list of branches to delete. ctrl-d to execute.");

    let lines = read_lines(tokio::io::stdin()).await?;
    let working_copy = WorkingCopy::new(".", ctx.runner.clone(), ctx.dry_run);

    prune(&working_copy, &branch_names(&lines)).await
}

async fn prune(working_copy: &WorkingCopy, branches: &[String]) -> Result<()> {
    if branches.is_empty() {
        info!("no branches to delete");
        return Ok(());
    }

    for branch in branches.iter() {
        match working_copy.delete_branch(branch).await {
            Ok(()) => info!("deleted {branch}"),
            Err(err) => error!("failed to delete {branch}: {err}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, MockCommandRunner};
    use std::sync::Arc;

    #[test]
    fn takes_last_path_segment() {
        let lines = vec![
            "remotes/origin/feature/fan-control".to_string(),
            "  topic-1 ".to_string(),
            "origin/".to_string(),
            String::new(),
        ];
        assert_eq!(branch_names(&lines), vec!["fan-control", "topic-1"]);
    }

    #[tokio::test]
    async fn reads_all_input_lines() {
        let input: &[u8] = b"a/b\nc\n";
        assert_eq!(read_lines(input).await.unwrap(), vec!["a/b", "c"]);
    }

    #[tokio::test]
    async fn deletes_each_branch_and_continues_on_failure() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec| spec.args[1..3] == ["branch", "-D"])
            .times(2)
            .returning(|spec| {
                let status = if spec.args[3] == "gone" { 1 } else { 0 };
                Ok(CommandOutput {
                    status,
                    ..CommandOutput::default()
                })
            });

        let wc = WorkingCopy::new("/work", Arc::new(runner), false);
        prune(&wc, &["gone".into(), "topic".into()]).await.unwrap();
    }
}
