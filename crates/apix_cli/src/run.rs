use std::sync::Arc;

use anyhow::Context;
use apix_hosted::ApiTesterClient;
use apix_runner::{
    config::Project,
    runner::{log_dry_run, Runner},
};
use apix_utils::exit::ExitCode;
use tracing::debug;

use crate::{args::RunArgs, credentials, reporting::build_reporters};

static TEST_SUITE_NAME: &str = "apix";

pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let project = load_project(&args)?;

    if project.dry_run {
        log_dry_run(&project);
        return Ok(ExitCode::SUCCESS);
    }

    let region = project.region()?;
    let credentials = credentials::resolve(args.credentials, credentials::credentials_filepath())?;
    debug!(username = %credentials.username, %region, "resolved credentials");

    let api = ApiTesterClient::new(region.api_base_url(), credentials)?;
    let reporters = build_reporters(args.reporter, TEST_SUITE_NAME);

    let code = Runner::new(Arc::new(api), project, args.fire_and_forget, reporters)?
        .run_project()
        .await?;
    Ok(code)
}

/// Reads the project and applies everything the command line overrides.
fn load_project(args: &RunArgs) -> anyhow::Result<Project> {
    let mut project = Project::from_file(&args.config)
        .with_context(|| format!("failed to load project {}", args.config.display()))?;

    if let Some(suite) = &args.suite {
        project.filter_suites(suite)?;
    }
    if let Some(build) = &args.build {
        project.sauce.metadata.build = build.clone();
    }
    if let Some(region) = &args.region {
        project.sauce.region = region.clone();
    }
    if let Some(concurrency) = args.concurrency {
        project.sauce.concurrency = concurrency;
    }
    project.dry_run |= args.dry_run;

    project.set_defaults();
    project.validate()?;
    Ok(project)
}
