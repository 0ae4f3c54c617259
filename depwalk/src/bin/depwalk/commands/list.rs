use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};

use depwalk::core::Config;
use depwalk::core::errors::WalkError;
use depwalk::ops;

use crate::args::ListArgs;
use crate::errors::{ErrorWithExitCode, WALK_ABORTED};

#[tracing::instrument(skip_all, level = "info")]
pub fn run(args: ListArgs, config: &Config) -> Result<()> {
    let graph = ops::list(config, args.name, &args.version).map_err(|err| {
        if err.is::<WalkError>() {
            ErrorWithExitCode::new(err, ExitCode::from(WALK_ABORTED)).into()
        } else {
            err
        }
    })?;

    let mut stdout = io::stdout().lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut stdout, &graph)
    } else {
        serde_json::to_writer(&mut stdout, &graph)
    }
    .context("failed to serialize dependency graph")?;
    writeln!(stdout)?;
    Ok(())
}
