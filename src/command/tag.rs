//! Tag creation command implementation.
use log::*;

use crate::{
    cli::TagArgs, command::common::Context, forge::traits::HostResolver,
    result::Result,
};

/// Execute tag command.
pub async fn execute(ctx: &Context, args: &TagArgs) -> Result<()> {
    let factory = ctx.forge_factory();
    create(&factory, args).await
}

async fn create(resolver: &dyn HostResolver, args: &TagArgs) -> Result<()> {
    let host = resolver.resolve(&args.repo_uri).await?;
    host.create_tag(&args.name, &args.target).await?;
    info!("tagged {} as {} in {}", args.target, args.name, args.repo_uri);
    Ok(())
}
