use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::reporting::ReporterKind;

/// Runs api test suites against the hosted api-testing service.
///
/// The apix cli
#[derive(Parser)]
#[clap(version = apix_utils::VERSION)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Triggers every suite of a project and reports their results.
    ///
    /// Exits with 0 if every test passed, 1 if any test failed or did not finish in time, and
    /// 101 if apix itself could not run the suites.
    Run(RunArgs),
    /// Works with hosted jobs.
    #[clap(subcommand)]
    Job(JobCmd),
}

#[derive(Args)]
pub struct RunArgs {
    /// Project configuration to run.
    #[clap(long, short = 'c', default_value = "apix.toml")]
    pub config: PathBuf,

    /// Only run the suite with this name.
    #[clap(long)]
    pub suite: Option<String>,

    /// Trigger the suites without waiting for them to finish.
    ///
    /// Every triggered test is reported as in progress, and the run passes.
    #[clap(long = "async")]
    pub fire_and_forget: bool,

    /// Print what would be triggered, without triggering anything.
    #[clap(long)]
    pub dry_run: bool,

    /// Reporters to use for the run.
    ///
    /// `stdout` prints one line per result.
    /// `junit-xml[=path]` writes JUnit XML to a file, `apix-test-results.xml` by default.
    /// `json[=path]` writes a JSON summary to a file, `apix-test-results.json` by default.
    #[clap(long, short = 'r', default_value = "stdout")]
    pub reporter: Vec<ReporterKind>,

    /// Build to associate the triggered runs with. Overrides the config file.
    #[clap(long)]
    pub build: Option<String>,

    /// Region of the service, e.g. `us-west-1`. Overrides the config file.
    #[clap(long)]
    pub region: Option<String>,

    /// How many results may be fetched at once. Overrides the config file.
    #[clap(long)]
    pub concurrency: Option<usize>,

    #[clap(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Subcommand)]
pub enum JobCmd {
    /// Waits for a hosted job to finish.
    ///
    /// Exits with 0 if the job passed, and 1 if it failed or did not finish in time.
    Wait(WaitArgs),
}

#[derive(Args)]
pub struct WaitArgs {
    /// Id of the job to wait for.
    pub id: String,

    /// Seconds between two reads of the job.
    #[clap(long, default_value_t = 5)]
    pub interval: u64,

    /// Seconds to wait before giving up. 0 waits a day.
    #[clap(long, default_value_t = 0)]
    pub timeout: u64,

    /// Region of the service the job runs in.
    #[clap(long, default_value = apix_runner::config::DEFAULT_REGION)]
    pub region: String,

    #[clap(flatten)]
    pub credentials: CredentialArgs,
}

/// Credentials of the account to run as. When not given, they are read from the credentials
/// file in the user's config directory.
#[derive(Args, Debug, Default, Clone)]
pub struct CredentialArgs {
    /// Username of the account.
    #[clap(long, env = "APIX_USERNAME")]
    pub username: Option<String>,

    /// Access key of the account.
    #[clap(long, env = "APIX_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,
}

#[cfg(test)]
mod test {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, JobCmd};
    use crate::reporting::ReporterKind;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["apix", "run"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config.to_str(), Some("apix.toml"));
        assert_eq!(args.reporter, [ReporterKind::Stdout]);
        assert!(!args.fire_and_forget);
        assert!(!args.dry_run);
    }

    #[test]
    fn run_with_several_reporters() {
        let cli = Cli::try_parse_from([
            "apix",
            "run",
            "--async",
            "--reporter",
            "stdout",
            "--reporter",
            "junit-xml=out.xml",
            "--suite",
            "smoke",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.fire_and_forget);
        assert_eq!(args.suite.as_deref(), Some("smoke"));
        assert_eq!(
            args.reporter,
            [
                ReporterKind::Stdout,
                ReporterKind::JUnitXml("out.xml".into())
            ]
        );
    }

    #[test]
    fn job_wait_defaults() {
        let cli = Cli::try_parse_from(["apix", "job", "wait", "job-1"]).unwrap();
        let Command::Job(JobCmd::Wait(args)) = cli.command else {
            panic!("expected job wait");
        };
        assert_eq!(args.id, "job-1");
        assert_eq!(args.interval, 5);
        assert_eq!(args.timeout, 0);
        assert_eq!(args.region, "us-west-1");
    }
}
