use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Error, Result};
use clap::Parser;
use tracing::debug;

use depwalk::core::{Config, FetchFailurePolicy};

use crate::args::{DepwalkArgs, VerbositySpec};
use crate::errors::ErrorWithExitCode;

mod args;
mod commands;
mod errors;

fn main() -> ExitCode {
    let args = DepwalkArgs::parse();

    init_logging(&args.verbose);

    match cli_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => exit_with_error(err),
    }
}

fn init_logging(verbose: &VerbositySpec) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt::Layer;
    use tracing_subscriber::fmt::time::Uptime;
    use tracing_subscriber::prelude::*;

    let fmt_layer = Layer::new()
        .with_writer(std::io::stderr)
        .with_timer(Uptime::default())
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(verbose.as_trace().into())
                .with_env_var(depwalk::DEPWALK_LOG_ENV)
                .from_env_lossy(),
        );

    if let Err(err) = tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(fmt_layer),
    ) {
        eprintln!("could not set up global logger: {err}");
    }
}

fn exit_with_error(err: Error) -> ExitCode {
    debug!("exit_with_error; err={:?}", err);

    if let Some(ErrorWithExitCode { source, exit_code }) = err.downcast_ref::<ErrorWithExitCode>() {
        if let Some(source_err) = source {
            eprintln!("error: {source_err:?}");
        }
        *exit_code
    } else {
        eprintln!("error: {err:?}");
        ExitCode::FAILURE
    }
}

fn cli_main(args: DepwalkArgs) -> Result<()> {
    let fetch_failure_policy = if args.strict {
        FetchFailurePolicy::Abort
    } else {
        FetchFailurePolicy::Prune
    };

    let mut builder = Config::builder()
        .concurrency(args.concurrency)
        .idle_interval(Duration::from_millis(args.idle_interval_ms))
        .request_timeout(Duration::from_secs(args.timeout_secs))
        .fetch_failure_policy(fetch_failure_policy);
    if let Some(registry) = args.registry {
        builder = builder.registry_url(registry);
    }
    let config = builder.build()?;

    commands::run(args.command, &config)
}
