//! EWM work item tracker driven through the `rtcwi` command line tool.
use async_trait::async_trait;
use color_eyre::eyre::Context;
use log::*;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    config::TrackerConfig,
    process::{CommandRunner, CommandSpec, run_checked},
    result::Result,
    tracker::{
        IssueTracker, NewWorkItem, WorkItemChange, credentials::Credentials,
    },
};

pub const DEFAULT_PROGRAM: &str = "rtcwi";

/// Session with the EWM tracker. Logs in on first use and stays logged in
/// until [`Ewm::logout`].
pub struct Ewm {
    runner: Arc<dyn CommandRunner>,
    program: String,
    program_args: Vec<String>,
    credentials: Credentials,
    dry_run: bool,
    authenticated: Mutex<bool>,
}

impl Ewm {
    pub fn new(
        config: &TrackerConfig,
        credentials: Credentials,
        runner: Arc<dyn CommandRunner>,
        dry_run: bool,
    ) -> Self {
        Self {
            runner,
            program: config
                .program
                .clone()
                .unwrap_or_else(|| DEFAULT_PROGRAM.into()),
            program_args: config.program_args.clone(),
            credentials,
            dry_run,
            authenticated: Mutex::new(false),
        }
    }

    fn project_opts(&self) -> Vec<String> {
        vec![
            "-p".into(),
            self.credentials.project.clone(),
            "-r".into(),
            self.credentials.repository.clone(),
        ]
    }

    /// Command with project options placed before `args`.
    fn spec(&self, args: Vec<String>) -> CommandSpec {
        let mut full = self.program_args.clone();
        full.extend(self.project_opts());
        full.extend(args);
        CommandSpec::new(&self.program, full)
    }

    async fn login(&self) -> Result<()> {
        let mut authenticated = self.authenticated.lock().await;

        if *authenticated {
            return Ok(());
        }

        let mut spec = self.spec(vec![
            "login".into(),
            "-u".into(),
            self.credentials.id.clone(),
        ]);

        if let Some(password) = &self.credentials.password {
            spec = spec.stdin(password.expose_secret());
        }

        debug!("logging in to tracker as {}", self.credentials.id);
        run_checked(self.runner.as_ref(), spec).await?;
        *authenticated = true;

        Ok(())
    }

    async fn run(&self, spec: CommandSpec) -> Result<String> {
        self.login().await?;
        let output = run_checked(self.runner.as_ref(), spec).await?;
        Ok(output.stdout)
    }

    async fn run_json(&self, spec: CommandSpec) -> Result<Value> {
        let description = spec.display();
        let stdout = self.run(spec).await?;
        serde_json::from_str(&stdout)
            .wrap_err_with(|| format!("unexpected output from {description}"))
    }

    async fn run_lines(&self, spec: CommandSpec) -> Result<Vec<String>> {
        let stdout = self.run(spec).await?;
        let mut lines: Vec<String> =
            stdout.lines().map(|l| l.trim_end().to_string()).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Ok(lines)
    }

    fn skip_write(&self, spec: &CommandSpec) -> bool {
        if self.dry_run {
            warn!("dry_run: would run: {}", spec.display());
        }
        self.dry_run
    }

    pub async fn logout(&self) -> Result<()> {
        let mut authenticated = self.authenticated.lock().await;
        run_checked(self.runner.as_ref(), self.spec(vec!["logout".into()]))
            .await?;
        *authenticated = false;
        Ok(())
    }

    /// Authenticated user id.
    pub async fn whoami(&self) -> Result<String> {
        let lines = self.run_lines(self.spec(vec!["whoami".into()])).await?;
        Ok(lines.into_iter().next().unwrap_or_default())
    }

    /// Save the current working environment, defaulting each value to the
    /// resolved credentials.
    pub async fn setcwe(
        &self,
        repository: Option<&str>,
        project: Option<&str>,
        user: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut args = self.program_args.clone();
        args.extend([
            "setcwe".to_string(),
            "-r".into(),
            repository.unwrap_or(&self.credentials.repository).into(),
            "-p".into(),
            project.unwrap_or(&self.credentials.project).into(),
            "-u".into(),
            user.unwrap_or(&self.credentials.id).into(),
        ]);

        let spec = CommandSpec::new(&self.program, args);
        if self.skip_write(&spec) {
            return Ok(vec![]);
        }
        self.run_lines(spec).await
    }

    /// Full text search for work items.
    pub async fn search(&self, text: &str, max: Option<u32>) -> Result<Value> {
        let mut args = vec!["search".to_string(), text.to_string()];
        if let Some(max) = max {
            args.extend(["--max".to_string(), max.to_string()]);
        }
        self.run_json(self.spec(args)).await
    }

    pub async fn listqueries(&self) -> Result<Value> {
        self.run_json(self.spec(vec!["listqueries".into()])).await
    }

    pub async fn runquery(&self, name: &str) -> Result<Value> {
        self.run_json(self.spec(vec!["runquery".into(), name.into()]))
            .await
    }

    /// Query results as `|` separated lines, headers first.
    pub async fn runquery_text(&self, name: &str) -> Result<Vec<String>> {
        Ok(query_rows(&self.runquery(name).await?))
    }

    /// Add subscribers to a work item. Returns the current subscriber list.
    pub async fn subscribe(&self, id: &str, users: &[String]) -> Result<Value> {
        let mut args = vec!["subscribe".to_string(), id.to_string()];
        args.extend(users.iter().cloned());

        let spec = self.spec(args);
        if self.skip_write(&spec) {
            return Ok(Value::Null);
        }
        self.run_json(spec).await
    }

    /// Remove a subscriber, the logged in user by default. The tool
    /// compares ids case sensitively. Returns the remaining subscribers.
    pub async fn unsubscribe(
        &self,
        id: &str,
        user: Option<&str>,
    ) -> Result<Value> {
        let spec = self.spec(vec![
            "unsubscribe".into(),
            id.into(),
            user.unwrap_or(&self.credentials.id).into(),
        ]);
        if self.skip_write(&spec) {
            return Ok(Value::Null);
        }
        self.run_json(spec).await
    }

    pub async fn link(
        &self,
        id: &str,
        link_type: &str,
        targets: &[String],
    ) -> Result<Vec<String>> {
        self.change_links("link", id, link_type, targets).await
    }

    pub async fn unlink(
        &self,
        id: &str,
        link_type: &str,
        targets: &[String],
    ) -> Result<Vec<String>> {
        self.change_links("unlink", id, link_type, targets).await
    }

    async fn change_links(
        &self,
        action: &str,
        id: &str,
        link_type: &str,
        targets: &[String],
    ) -> Result<Vec<String>> {
        let mut args =
            vec![action.to_string(), id.to_string(), link_type.to_string()];
        args.extend(targets.iter().cloned());

        let spec = self.spec(args);
        if self.skip_write(&spec) {
            return Ok(vec![]);
        }
        self.run_lines(spec).await
    }

    /// Add a comment, reporting rejection by the tool as `false` instead of
    /// an error.
    pub async fn addcomment(&self, id: &str, comment: &str) -> Result<bool> {
        let spec = self.comment_spec(id, comment);
        if self.skip_write(&spec) {
            return Ok(false);
        }

        self.login().await?;
        let output = self.runner.run(spec).await?;

        if output.status != 0 {
            warn!("comment on {id} rejected: {}", output.stderr.trim());
        }

        Ok(output.status == 0)
    }

    fn comment_spec(&self, id: &str, comment: &str) -> CommandSpec {
        self.spec(vec!["addcomment".into(), id.into(), comment.into()])
    }
}

/// Flatten a query result into a header line and one line per result.
pub fn query_rows(data: &Value) -> Vec<String> {
    let headers: Vec<&str> = data["headers"]
        .as_array()
        .map(|h| h.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut rows = vec![headers.join("|")];

    for result in data["results"].as_array().into_iter().flatten() {
        let row: Vec<String> = headers
            .iter()
            .map(|h| match &result[*h] {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        rows.push(row.join("|"));
    }

    rows
}

#[async_trait]
impl IssueTracker for Ewm {
    async fn view(&self, id: &str) -> Result<Value> {
        self.run_json(self.spec(vec!["display".into(), id.into()]))
            .await
    }

    async fn modify(&self, id: &str, change: &WorkItemChange) -> Result<Value> {
        let mut args = vec!["modify".to_string(), id.to_string()];
        if let Some(wifile) = &change.wifile {
            args.extend(["--wifile".into(), wifile.display().to_string()]);
        }
        if let Some(state) = &change.state {
            args.extend(["--action".into(), state.clone()]);
        }
        args.extend(change.attributes.iter().cloned());

        let spec = self.spec(args);
        if self.skip_write(&spec) {
            return Ok(Value::Null);
        }
        self.run_json(spec).await
    }

    async fn create(&self, item: &NewWorkItem) -> Result<Value> {
        let mut args = vec![];
        if let Some(wifile) = &item.wifile {
            args.extend(["--wifile".to_string(), wifile.display().to_string()]);
        }
        args.extend(["create".to_string(), item.item_type.clone()]);
        args.extend(item.attributes.iter().cloned());

        let spec = self.spec(args);
        if self.skip_write(&spec) {
            return Ok(Value::Null);
        }
        self.run_json(spec).await
    }

    async fn addnote(&self, id: &str, message: &str) -> Result<()> {
        let spec = self.comment_spec(id, message);
        if self.skip_write(&spec) {
            return Ok(());
        }
        self.run(spec).await?;
        Ok(())
    }
}
