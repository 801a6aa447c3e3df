//! Builds random red-black trees and checks each one's invariants.
//!
//! Usage:
//!   rbfuzz <number of trees> <number of nodes per tree> [--seed N] [-v]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use redblack::fuzz::{self, DEFAULT_HEADROOM, FuzzConfig};
use redblack::logging;

#[derive(Parser)]
#[command(name = "rbfuzz")]
#[command(about = "Build random red-black trees and check their invariants")]
#[command(override_usage = "rbfuzz <number of trees> <number of nodes per tree>")]
struct Cli {
    /// Number of trees to build
    #[arg(value_name = "TREES")]
    trials: usize,

    /// Number of nodes per tree
    #[arg(value_name = "NODES")]
    nodes: usize,

    /// Seed for the key generator (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Keys are drawn from 1..NODES + HEADROOM
    #[arg(long, default_value_t = DEFAULT_HEADROOM)]
    headroom: usize,

    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Raise terminal log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<FuzzConfig, fuzz::ConfigError> {
        let config = FuzzConfig::new(self.trials, self.nodes)?.with_headroom(self.headroom)?;
        Ok(match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        })
    }
}

/// A rejected config, reported the way clap reports bad arguments: the
/// message followed by the usage line.
fn usage_error(e: fuzz::ConfigError) -> clap::Error {
    Cli::command().error(ErrorKind::ValueValidation, e)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config().unwrap_or_else(|e| usage_error(e).exit());

    let level = logging::level_for(cli.verbose);
    if let Err(e) = logging::initialize_logging(level, cli.log_file.as_deref()) {
        eprintln!("rbfuzz: {e}");
        return ExitCode::from(2);
    }

    let report = fuzz::run(&config);
    for failure in &report.failures {
        println!("{failure}\n");
    }
    println!("{report}");

    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USAGE: &str = "rbfuzz <number of trees> <number of nodes per tree>";

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn positional_args() {
        let cli = Cli::try_parse_from(["rbfuzz", "500", "70", "--seed", "3"]).unwrap();
        let config = cli.config().unwrap();
        assert_eq!((config.trials, config.nodes, config.headroom), (500, 70, DEFAULT_HEADROOM));
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn missing_arg_is_a_usage_error() {
        let missing = Cli::try_parse_from(["rbfuzz", "500"]).err().unwrap();
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredArgument);
        assert!(missing.render().to_string().contains(USAGE));
    }

    #[test]
    fn zero_counts_print_usage() {
        let cases = [
            (["rbfuzz", "0", "70"], fuzz::ConfigError::NoTrials),
            (["rbfuzz", "500", "0"], fuzz::ConfigError::NoNodes),
        ];
        for (args, expected) in cases {
            let cli = Cli::try_parse_from(args).unwrap();
            let err = cli.config().unwrap_err();
            assert_eq!(err, expected);

            let err = usage_error(err);
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
            let rendered = err.render().to_string();
            assert!(rendered.contains(USAGE), "{rendered}");
            assert!(rendered.contains(&expected.to_string()), "{rendered}");
        }
    }

    #[test]
    fn oversized_headroom_is_rejected() {
        let max = usize::MAX.to_string();
        let cli = Cli::try_parse_from(["rbfuzz", "1", "2", "--headroom", &max]).unwrap();
        assert_eq!(
            cli.config(),
            Err(fuzz::ConfigError::KeyRangeOverflow { nodes: 2, headroom: usize::MAX })
        );
    }
}
