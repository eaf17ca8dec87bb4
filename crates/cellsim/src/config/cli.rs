use clap::{Parser, Subcommand};
use utils::version;

use crate::config::run::{RunArgs, ValidateArgs, WeightArgs};

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive the drift allocator over a simulated cell
    Run(RunArgs),
    /// Check a scenario file without running it
    Validate(ValidateArgs),
    /// Print the QoS weight of a single context
    Weight(WeightArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::parse_from([
            "cellsim",
            "run",
            "--scenario",
            "s.yaml",
            "--slots",
            "20",
            "--seed",
            "9",
            "--metrics-format",
            "json",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.slots, 20);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.metrics_format, "json");
    }

    #[test]
    fn parses_weight_flags() {
        let cli = Cli::parse_from([
            "cellsim",
            "weight",
            "--priority-level",
            "1",
            "--delay-budget-ms",
            "5",
            "--gbr",
        ]);
        let Commands::Weight(args) = cli.command else {
            panic!("expected weight subcommand");
        };
        assert_eq!(args.priority_level, 1);
        assert_eq!(args.delay_budget_ms, 5);
        assert!(args.gbr);
    }
}
