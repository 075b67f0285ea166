//! Commit tree report command implementation.
use log::*;

use crate::{
    cli::ReportArgs,
    command::common::{Context, write_output},
    config::Config,
    extract::TextExtractor,
    forge::traits::HostResolver,
    report::{
        aggregator::{Aggregator, RangeKey},
        model::CommitReport,
        render,
    },
    result::Result,
};

/// Execute report command: print the console report and write any
/// requested documents.
pub async fn execute(ctx: &Context, args: &ReportArgs) -> Result<()> {
    let factory = ctx.forge_factory();
    let reports = build(&factory, &ctx.config, args).await?;
    let range = RangeKey::new(&args.repo_uri, &args.begin, &args.end);

    if reports.is_empty() {
        warn!(
            "no commits found in {} {}..{}",
            range.uri, range.begin, range.end
        );
    }

    println!("{}", render::console(&reports, &range, true));

    publish(&reports, &range, &ctx.config, args, ctx.dry_run).await
}

/// Aggregate the report forest for the requested range.
pub async fn build(
    resolver: &dyn HostResolver,
    config: &Config,
    args: &ReportArgs,
) -> Result<Vec<CommitReport>> {
    let extractor = TextExtractor::new(&config.extract)?;
    let aggregator = Aggregator::new(resolver, &extractor, &config.report)?;

    Ok(aggregator
        .aggregate(&args.repo_uri, &args.begin, &args.end)
        .await)
}

async fn publish(
    reports: &[CommitReport],
    range: &RangeKey,
    config: &Config,
    args: &ReportArgs,
    dry_run: bool,
) -> Result<()> {
    let links = config.report.defect_link_template.as_deref();

    if let Some(path) = &args.html_file {
        write_output(path, &render::html(reports, links)?, dry_run).await?;
    }

    if let Some(path) = &args.wiki {
        let page = render::wiki(reports, range, links)?;
        write_output(path, &page, dry_run).await?;
    }

    if let Some(path) = &args.json_file {
        write_output(path, &render::json(reports)?, dry_run).await?;
    }

    Ok(())
}
