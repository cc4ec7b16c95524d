mod args;
mod credentials;
mod job;
mod reporting;
mod run;

use apix_utils::exit::ExitCode;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Command, JobCmd};

fn init_logging() {
    let filter = EnvFilter::try_from_env("APIX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    init_logging();

    let args = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start the async runtime: {error}");
            std::process::exit(ExitCode::APIX_ERROR.get());
        }
    };

    let result = runtime.block_on(async move {
        match args.command {
            Command::Run(run_args) => run::run(run_args).await,
            Command::Job(JobCmd::Wait(wait_args)) => job::wait(wait_args).await,
        }
    });

    let code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::APIX_ERROR
        }
    };

    std::process::exit(code.get());
}
