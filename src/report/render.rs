//! Console, HTML, wiki and JSON renderings of a report forest.
use serde::Serialize;

use crate::{
    report::{
        aggregator::RangeKey,
        model::{CommitReport, ReportSummary},
    },
    result::Result,
};

const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[94m";
const ENDC: &str = "\x1b[0m";

const HTML_TEMPLATE: &str = r#"<html><body>
{% for row in rows -%}
<div style="margin-left: {{ row.indent_px }}px"><a href="{{ row.repository_url | safe }}" target="_blank" style="color: red">{{ row.repository_name }}</a>&nbsp;<a href="{{ row.commit_url | safe }}" target="_blank" style="color: blue">{{ row.short_id }}</a>&nbsp;<span>{{ row.summary }}</span></div>
{% endfor -%}
<p>{{ insertions }} insertions and {{ deletions }} deletions</p>
<div>Closed Issues</div>
{% for issue in issues -%}
<div>{% if issue.link %}<a href="{{ issue.link }}" target="_blank">{{ issue.id }}</a>{% else %}{{ issue.id }}{% endif %}</div>
{% endfor -%}
{% if notes -%}
<div>Release Notes</div>
{% for note in notes -%}
<div>{{ note }}</div>
{% endfor -%}
{% endif -%}
</body></html>
"#;

const WIKI_TEMPLATE: &str = r#"## {{ end }}
from {{ begin }} to {{ end }}
{% if issues %}
Fixes:
{% for issue in issues -%}
* {% if issue.link %}[{{ issue.id }}]({{ issue.link }}){% else %}{{ issue.id }}{% endif %}
{% endfor %}
---
{% endif -%}
{% if notes %}
Release Notes:
{% for note in notes -%}
* {{ note }}
{% endfor -%}
{% endif %}
```
Commits...
{% for line in lines -%}
{{ line }}
{% endfor -%}
```
"#;

#[derive(Debug, Serialize)]
struct Row {
    level: usize,
    indent_px: usize,
    repository_name: String,
    repository_url: String,
    commit_url: String,
    short_id: String,
    author_name: String,
    summary: String,
}

#[derive(Debug, Serialize)]
struct IssueLink {
    id: String,
    link: Option<String>,
}

/// Browser URL for a repository URI.
pub fn repository_url(uri: &str) -> String {
    let uri = uri.trim().trim_end_matches('/').trim_end_matches(".git");

    if let Some(rest) = uri.strip_prefix("git://") {
        return format!("http://{rest}");
    }

    if let Some(rest) = uri.strip_prefix("git@")
        && let Some((host, path)) = rest.split_once(':')
    {
        return format!("https://{host}/{path}");
    }

    if uri.contains("://") {
        return uri.to_string();
    }

    format!("https://{uri}")
}

fn rows(reports: &[CommitReport]) -> Vec<Row> {
    fn visit(report: &CommitReport, level: usize, rows: &mut Vec<Row>) {
        let repository_url = repository_url(&report.repository_uri);
        rows.push(Row {
            level,
            indent_px: level * 20,
            repository_name: report.repository_name.clone(),
            commit_url: format!("{repository_url}/commit/{}", report.commit_id),
            repository_url,
            short_id: report.short_id.clone(),
            author_name: report.author_name.clone(),
            summary: report.summary.clone(),
        });
        for child in report.children.iter() {
            visit(child, level + 1, rows);
        }
    }

    let mut rows = vec![];
    for report in reports.iter() {
        visit(report, 0, &mut rows);
    }
    rows
}

fn issue_links(issues: Vec<String>, template: Option<&str>) -> Vec<IssueLink> {
    issues
        .into_iter()
        .map(|id| IssueLink {
            link: template.map(|t| t.replace("{id}", &id)),
            id,
        })
        .collect()
}

/// Indented one line per commit listing with author names.
pub fn plain_lines(reports: &[CommitReport]) -> Vec<String> {
    rows(reports)
        .into_iter()
        .map(|r| {
            format!(
                "{}{} {} {} {}",
                "  ".repeat(r.level),
                r.repository_name,
                r.short_id,
                r.author_name,
                r.summary
            )
        })
        .collect()
}

/// Terminal report with issue and release note digests and totals.
pub fn console(reports: &[CommitReport], range: &RangeKey, color: bool) -> String {
    let summary = ReportSummary::new(reports);
    let (red, blue, endc) = if color {
        (RED, BLUE, ENDC)
    } else {
        ("", "", "")
    };

    let mut out = vec![
        format!("## {}", range.end),
        format!("from {} to {}", range.begin, range.end),
    ];

    let issues = summary.closed_issues();
    if !issues.is_empty() {
        out.push("Fixes:".into());
        out.extend(issues.iter().map(|i| format!("* {i}")));
        out.push("---".into());
    }

    let notes = summary.release_notes();
    if !notes.is_empty() {
        out.push("Release Notes:".into());
        out.extend(notes.iter().map(|n| format!("* {n}")));
    }

    out.push("Commits...".into());
    for row in rows(reports) {
        out.push(format!(
            "{}{red}{}{endc} {blue}{}{endc} {}",
            "  ".repeat(row.level),
            row.repository_name,
            row.short_id,
            row.summary
        ));
    }

    out.push(format!(
        "{} commits, {} insertions, {} deletions",
        summary.commit_count(),
        summary.total_insertions(),
        summary.total_deletions()
    ));

    out.join("\n")
}

/// HTML document with one indented `<div>` per commit.
pub fn html(
    reports: &[CommitReport],
    defect_link_template: Option<&str>,
) -> Result<String> {
    let summary = ReportSummary::new(reports);

    let mut context = tera::Context::new();
    context.insert("rows", &rows(reports));
    context.insert("insertions", &summary.total_insertions());
    context.insert("deletions", &summary.total_deletions());
    context.insert(
        "issues",
        &issue_links(summary.closed_issues(), defect_link_template),
    );
    context.insert("notes", &summary.release_notes());

    let mut tera = tera::Tera::default();
    tera.add_raw_template("report.html", HTML_TEMPLATE)?;
    Ok(tera.render("report.html", &context)?)
}

/// Markdown page listing fixes, release notes and a commit block.
pub fn wiki(
    reports: &[CommitReport],
    range: &RangeKey,
    defect_link_template: Option<&str>,
) -> Result<String> {
    let summary = ReportSummary::new(reports);

    let mut context = tera::Context::new();
    context.insert("begin", &range.begin);
    context.insert("end", &range.end);
    context.insert(
        "issues",
        &issue_links(summary.closed_issues(), defect_link_template),
    );
    context.insert("notes", &summary.release_notes());
    context.insert("lines", &plain_lines(reports));

    let mut tera = tera::Tera::default();
    tera.add_raw_template("report.md", WIKI_TEMPLATE)?;
    Ok(tera.render("report.md", &context)?)
}

/// Pretty printed JSON forest.
pub fn json(reports: &[CommitReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}
