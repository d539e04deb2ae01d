//! # polcheck CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use polcheck_cli::check::{run_check, CheckArgs};
use polcheck_cli::extract::{run_extract, ExtractArgs};

/// Policy compliance checks from the command line.
///
/// Extract text from policy PDFs and check documents against them, offline
/// with substring matching or through the hosted model.
#[derive(Parser, Debug)]
#[command(name = "polcheck", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the text extracted from a policy file.
    Extract(ExtractArgs),

    /// Check a document against policy files.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so `--json` output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Extract(args) => run_extract(&args),
        Commands::Check(args) => run_check(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use polcheck_cli::check::CheckMode;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_accepts_repeated_policies() {
        let cli = Cli::try_parse_from([
            "polcheck", "check", "--policy", "a.pdf", "--policy", "b.pdf", "--text", "hi",
        ])
        .unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.policies.len(), 2);
                assert_eq!(args.mode, CheckMode::Substring);
                assert!(!args.json);
            }
            other => panic!("expected check, got {other:?}"),
        }
    }

    #[test]
    fn check_parses_prompt_mode_and_verbosity() {
        let cli = Cli::try_parse_from([
            "polcheck", "-vv", "check", "--policy", "a.pdf", "--document", "d.txt", "--mode",
            "prompt", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.mode, CheckMode::Prompt);
                assert!(args.json);
                assert!(args.document.is_some());
            }
            other => panic!("expected check, got {other:?}"),
        }
    }

    #[test]
    fn check_requires_a_policy() {
        assert!(Cli::try_parse_from(["polcheck", "check", "--text", "hi"]).is_err());
    }

    #[test]
    fn check_requires_exactly_one_document_source() {
        assert!(Cli::try_parse_from(["polcheck", "check", "--policy", "a.pdf"]).is_err());
        assert!(Cli::try_parse_from([
            "polcheck", "check", "--policy", "a.pdf", "--text", "x", "--document", "d.txt",
        ])
        .is_err());
    }

    #[test]
    fn extract_takes_a_path() {
        let cli = Cli::try_parse_from(["polcheck", "extract", "policy.pdf"]).unwrap();
        assert!(matches!(cli.command, Commands::Extract(_)));
    }
}
