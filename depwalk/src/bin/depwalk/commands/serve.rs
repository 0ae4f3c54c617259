use anyhow::Result;

use depwalk::core::Config;
use depwalk::ops;

use crate::args::ServeArgs;

pub fn run(args: ServeArgs, config: &Config) -> Result<()> {
    ops::serve(config, args.bind)
}
