use anyhow::Result;

use depwalk::core::Config;

use crate::args::Command;

pub mod list;
pub mod serve;

pub fn run(command: Command, config: &Config) -> Result<()> {
    use Command::*;

    match command {
        // Keep these sorted alphabetically.
        List(args) => list::run(args, config),
        Serve(args) => serve::run(args, config),
    }
}
