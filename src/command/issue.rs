//! Issue tracker command implementation.
use serde_json::Value;

use crate::{
    cli::IssueCommand,
    command::common::Context,
    result::Result,
    tracker::{
        IssueTracker, NewWorkItem, WorkItemChange, credentials::Credentials,
        ewm::Ewm, select_attribute,
    },
};

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines.iter() {
        println!("{line}");
    }
}

/// Execute issue command.
pub async fn execute(ctx: &Context, command: &IssueCommand) -> Result<()> {
    let credentials = Credentials::resolve(&ctx.config.tracker).await?;
    let ewm = Ewm::new(
        &ctx.config.tracker,
        credentials,
        ctx.runner.clone(),
        ctx.dry_run,
    );

    run(&ewm, command).await
}

async fn run(ewm: &Ewm, command: &IssueCommand) -> Result<()> {
    match command {
        IssueCommand::View { id, attribute } => {
            let item = ewm.view(id).await?;
            print_json(&select_attribute(item, attribute.as_deref()))
        }
        IssueCommand::Modify {
            id,
            state,
            wifile,
            attributes,
        } => {
            let change = WorkItemChange {
                state: state.clone(),
                attributes: attributes.clone(),
                wifile: wifile.clone(),
            };
            print_json(&ewm.modify(id, &change).await?)
        }
        IssueCommand::Create {
            item_type,
            wifile,
            attributes,
        } => {
            let item = NewWorkItem {
                item_type: item_type.clone(),
                attributes: attributes.clone(),
                wifile: wifile.clone(),
            };
            print_json(&ewm.create(&item).await?)
        }
        IssueCommand::Addnote { id, message } => ewm.addnote(id, message).await,
        IssueCommand::Addcomment { id, comment } => {
            println!("{}", ewm.addcomment(id, comment).await?);
            Ok(())
        }
        IssueCommand::Whoami => {
            println!("{}", ewm.whoami().await?);
            Ok(())
        }
        IssueCommand::Setcwe {
            repository,
            project,
            user,
        } => {
            let lines = ewm
                .setcwe(
                    repository.as_deref(),
                    project.as_deref(),
                    user.as_deref(),
                )
                .await?;
            print_lines(&lines);
            Ok(())
        }
        IssueCommand::Search { text, max } => {
            print_json(&ewm.search(text, *max).await?)
        }
        IssueCommand::Runquery { name, text_mode } => {
            if *text_mode {
                print_lines(&ewm.runquery_text(name).await?);
                Ok(())
            } else {
                print_json(&ewm.runquery(name).await?)
            }
        }
        IssueCommand::Listqueries => print_json(&ewm.listqueries().await?),
        IssueCommand::Subscribe { id, users } => {
            print_json(&ewm.subscribe(id, users).await?)
        }
        IssueCommand::Unsubscribe { id, user } => {
            print_json(&ewm.unsubscribe(id, user.as_deref()).await?)
        }
        IssueCommand::Link {
            id,
            link_type,
            targets,
        } => {
            print_lines(&ewm.link(id, link_type, targets).await?);
            Ok(())
        }
        IssueCommand::Unlink {
            id,
            link_type,
            targets,
        } => {
            print_lines(&ewm.unlink(id, link_type, targets).await?);
            Ok(())
        }
        IssueCommand::Logout => ewm.logout().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TrackerConfig,
        process::{CommandOutput, MockCommandRunner},
    };
    use std::sync::Arc;

    fn ewm(runner: MockCommandRunner, dry_run: bool) -> Ewm {
        let credentials = Credentials {
            id: "jdev@example.com".into(),
            password: None,
            project: "Firmware".into(),
            repository: "https://ewm.example.com/ccm".into(),
        };
        Ewm::new(
            &TrackerConfig::default(),
            credentials,
            Arc::new(runner),
            dry_run,
        )
    }

    #[tokio::test]
    async fn view_runs_display() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec| spec.args[4] == "login")
            .times(1)
            .returning(|_| Ok(CommandOutput::default()));
        runner
            .expect_run()
            .withf(|spec| spec.args[4] == "display")
            .times(1)
            .returning(|_| {
                Ok(CommandOutput {
                    stdout: r#"{"Status": "Open"}"#.into(),
                    ..CommandOutput::default()
                })
            });

        let command = IssueCommand::View {
            id: "282739".into(),
            attribute: Some("Status".into()),
        };
        run(&ewm(runner, false), &command).await.unwrap();
    }

    #[tokio::test]
    async fn dry_run_addnote_runs_nothing() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();

        let command = IssueCommand::Addnote {
            id: "282739".into(),
            message: "fixed".into(),
        };
        run(&ewm(runner, true), &command).await.unwrap();
    }

    #[tokio::test]
    async fn unlink_runs_tool_unlink() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec| spec.args[4] == "login")
            .returning(|_| Ok(CommandOutput::default()));
        runner
            .expect_run()
            .withf(|spec| spec.args[4..] == ["unlink", "282739", "Parent", "1"])
            .times(1)
            .returning(|_| Ok(CommandOutput::default()));

        let command = IssueCommand::Unlink {
            id: "282739".into(),
            link_type: "Parent".into(),
            targets: vec!["1".into()],
        };
        run(&ewm(runner, false), &command).await.unwrap();
    }
}
