#![deny(missing_docs)]

//! CLI arguments datastructures.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use url::Url;

use depwalk::core::PackageName;
use depwalk::core::config::{DEFAULT_CONCURRENCY, DEFAULT_IDLE_INTERVAL, DEFAULT_REQUEST_TIMEOUT};

/// Resolve transitive dependency graphs of npm packages.
#[derive(Parser, Clone, Debug)]
#[command(
    author,
    version,
    long_about = "Depwalk crawls an npm-compatible package registry and assembles the full \
    transitive dependency graph of a package version, resolving version ranges along the way.",
    after_help = "Set DEPWALK_LOG to override the logging filter, e.g. DEPWALK_LOG=depwalk=trace."
)]
pub struct DepwalkArgs {
    /// Logging verbosity.
    #[command(flatten)]
    pub verbose: VerbositySpec,

    /// Base URL of the package registry.
    #[arg(long, env = "DEPWALK_REGISTRY", value_name = "URL", global = true)]
    pub registry: Option<Url>,

    /// Number of concurrent workers.
    #[arg(
        long,
        short = 'j',
        env = "DEPWALK_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        global = true
    )]
    pub concurrency: usize,

    /// How long idle workers wait before polling for new tasks.
    #[arg(
        long,
        env = "DEPWALK_IDLE_INTERVAL_MS",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_IDLE_INTERVAL.as_millis() as u64,
        hide_short_help = true,
        global = true
    )]
    pub idle_interval_ms: u64,

    /// Timeout of a single registry request.
    #[arg(
        long,
        env = "DEPWALK_TIMEOUT_SECS",
        value_name = "SECONDS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
        hide_short_help = true,
        global = true
    )]
    pub timeout_secs: u64,

    /// Abort the whole walk on registry transport, status and parse errors, instead of
    /// skipping the affected dependency.
    #[arg(long, env = "DEPWALK_STRICT", global = true)]
    pub strict: bool,

    /// Subcommand and its arguments.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommand and its arguments.
#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Resolve the dependency graph of a package and print it as JSON.
    List(ListArgs),
    /// Serve dependency graphs over HTTP.
    Serve(ServeArgs),
}

/// Arguments accepted by the `list` command.
#[derive(Parser, Clone, Debug)]
pub struct ListArgs {
    /// Name of the package, e.g. `express` or `@types/node`.
    #[arg(value_parser = parse_package_name)]
    pub name: PackageName,

    /// Version range or dist-tag to resolve.
    #[arg(default_value = "latest")]
    pub version: String,

    /// Pretty-print the output JSON.
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments accepted by the `serve` command.
#[derive(Parser, Clone, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DEPWALK_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,
}

fn parse_package_name(name: &str) -> anyhow::Result<PackageName> {
    PackageName::try_new(name)
}

/// Logging verbosity selection.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct VerbositySpec {
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity.",
    )]
    verbose: u8,

    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        help = "Decrease logging verbosity.",
        conflicts_with = "verbose",
    )]
    quiet: u8,
}

impl VerbositySpec {
    /// Convert the verbosity specification to a [`LevelFilter`].
    pub fn as_trace(&self) -> LevelFilter {
        match 2 + self.verbose as i16 - self.quiet as i16 {
            i16::MIN..=-1 => LevelFilter::OFF,
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            4..=i16::MAX => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use tracing::level_filters::LevelFilter;

    use super::{Command, DepwalkArgs};

    #[test]
    fn verify_cli() {
        DepwalkArgs::command().debug_assert();
    }

    #[test]
    fn list_defaults_to_latest() {
        let args = DepwalkArgs::parse_from(["depwalk", "list", "@types/node"]);
        let Command::List(list) = args.command else {
            panic!("expected list command");
        };
        assert_eq!(list.name.as_str(), "@types/node");
        assert_eq!(list.version, "latest");
        assert!(!list.pretty);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            DepwalkArgs::parse_from(["depwalk", "list", "express", "^4", "--strict", "-j", "3"]);
        assert!(args.strict);
        assert_eq!(args.concurrency, 3);
    }

    #[test]
    fn invalid_package_name_is_rejected() {
        assert!(DepwalkArgs::try_parse_from(["depwalk", "list", "no spaces"]).is_err());
    }

    #[test]
    fn verbosity() {
        let parse = |flags: &[&str]| {
            let mut argv = vec!["depwalk"];
            argv.extend_from_slice(flags);
            argv.push("serve");
            DepwalkArgs::parse_from(argv).verbose.as_trace()
        };
        assert_eq!(parse(&[]), LevelFilter::INFO);
        assert_eq!(parse(&["-v"]), LevelFilter::DEBUG);
        assert_eq!(parse(&["-vvv"]), LevelFilter::TRACE);
        assert_eq!(parse(&["-q"]), LevelFilter::WARN);
        assert_eq!(parse(&["-qqq"]), LevelFilter::OFF);
    }
}
