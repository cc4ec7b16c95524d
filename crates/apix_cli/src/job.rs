use std::{str::FromStr, time::Duration};

use anyhow::anyhow;
use apix_hosted::JobClient;
use apix_runner::region::Region;
use apix_utils::exit::ExitCode;
use tracing::{error, info};

use crate::{args::WaitArgs, credentials};

pub async fn wait(args: WaitArgs) -> anyhow::Result<ExitCode> {
    let region = Region::from_str(&args.region).map_err(|e| anyhow!(e))?;
    let credentials = credentials::resolve(args.credentials, credentials::credentials_filepath())?;

    let client = JobClient::new(region.api_base_url(), credentials)?;
    let polled = client
        .wait(
            &args.id,
            Duration::from_secs(args.interval),
            Duration::from_secs(args.timeout),
        )
        .await?;

    let job = &polled.job;
    if polled.timed_out {
        error!(id = %args.id, status = %job.status, "job did not finish in time");
    } else if job.passed {
        info!(id = %job.id, name = %job.name, status = %job.status, "job passed");
    } else {
        error!(id = %job.id, name = %job.name, status = %job.status, error = %job.error, "job failed");
    }

    Ok(ExitCode::from_verdict(job.passed && !polled.timed_out))
}
