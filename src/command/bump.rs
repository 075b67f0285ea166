//! Recipe revision bump command implementation.
use log::*;
use std::path::PathBuf;

use crate::{
    cli::BumpArgs,
    command::common::Context,
    config::BumpConfig,
    git::WorkingCopy,
    recipe::{BumpOutcome, BumpRequest, RecipeBumper, validate_revision},
    result::Result,
};

/// Execute bump command: rewrite and commit every recipe pinning the
/// project to an older revision.
pub async fn execute(ctx: &Context, args: &BumpArgs) -> Result<()> {
    validate_revision(&args.project_sha)?;

    let working_copy =
        WorkingCopy::new(&args.repo_dir, ctx.runner.clone(), ctx.dry_run);
    let factory = ctx.forge_factory();
    let request = request(args, &ctx.config.bump);

    let outcomes = RecipeBumper::new(&working_copy, &factory)
        .bump(&request)
        .await?;

    let mut committed = false;

    for outcome in outcomes.iter() {
        match outcome {
            BumpOutcome::Skipped { recipe } => {
                debug!("skipped {}", recipe.display())
            }
            BumpOutcome::UpToDate { recipe, revision } => {
                println!(
                    "{} is up to date: {} already pins {revision}",
                    request.project,
                    recipe.display()
                );
            }
            BumpOutcome::Pending { recipe, message } => {
                println!("{}:\n{message}", recipe.display());
            }
            BumpOutcome::Committed { .. } => committed = true,
        }
    }

    if outcomes.is_empty() {
        warn!("no recipes reference {}/{}", request.remote, request.org);
    }

    if committed {
        println!("{}", working_copy.show("HEAD").await?);
    }

    Ok(())
}

fn request(args: &BumpArgs, config: &BumpConfig) -> BumpRequest {
    BumpRequest {
        project: args.project_name.clone(),
        revision: args.project_sha.clone(),
        remote: args.remote.clone().unwrap_or_else(|| config.remote.clone()),
        org: args.org.clone().unwrap_or_else(|| config.org.clone()),
        location: args.location.clone().or_else(|| config.location.clone()),
        recipes: args.recipes.clone(),
        kernel_project: config.kernel_project.clone(),
        kernel_recipes: config
            .kernel_recipes
            .iter()
            .map(PathBuf::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BumpArgs {
        BumpArgs {
            project_name: "bmcweb".into(),
            project_sha: "0123456789012345678901234567890123456789".into(),
            remote: None,
            org: Some("ibm-openbmc".into()),
            location: None,
            recipes: vec![],
            repo_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn request_falls_back_to_config() {
        let config = BumpConfig {
            location: Some("downstream".into()),
            ..BumpConfig::default()
        };

        let req = request(&args(), &config);
        assert_eq!(req.remote, "github.com");
        assert_eq!(req.org, "ibm-openbmc");
        assert_eq!(req.location.as_deref(), Some("downstream"));
        assert!(req.recipes.is_empty());
        assert_eq!(req.kernel_recipes, vec![PathBuf::from(
            "meta-aspeed/recipes-kernel/linux/linux-aspeed_git.bb"
        )]);
    }

    #[tokio::test]
    async fn rejects_short_revision() {
        let ctx = Context {
            config: Default::default(),
            runner: std::sync::Arc::new(
                crate::process::MockCommandRunner::new(),
            ),
            dry_run: true,
        };
        let args = BumpArgs {
            project_sha: "abc".into(),
            ..args()
        };

        let err = execute(&ctx, &args).await.unwrap_err();
        assert_eq!(err.to_string(), "sha number abc is 3 not 40");
    }
}
