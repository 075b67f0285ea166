use clap::Parser;

use revtrack::{
    Result,
    cli::{self, Command},
    command::{self, common::Context},
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("revtrack")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = cli::Args::parse();

    initialize_logger(cli_args.debug)?;

    let ctx = Context::load(&cli_args).await?;

    match &cli_args.command {
        Command::Report(args) => command::report::execute(&ctx, args).await,
        Command::Bump(args) => command::bump::execute(&ctx, args).await,
        Command::Tag(args) => command::tag::execute(&ctx, args).await,
        Command::Pr(args) => command::pr::execute(&ctx, args).await,
        Command::Issue(issue) => command::issue::execute(&ctx, issue).await,
        Command::Sync(args) => command::sync::execute(&ctx, args).await,
        Command::PruneBranches => command::prune_branches::execute(&ctx).await,
    }
}
