use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    #[arg(
        long,
        env = "CELLSIM_SCENARIO",
        value_hint = clap::ValueHint::FilePath,
        help = "Scenario file describing the cell, QoS classes and flows"
    )]
    pub scenario: PathBuf,

    #[arg(long, default_value_t = 1000, help = "Number of timeslots to simulate")]
    pub slots: u64,

    #[arg(
        long,
        help = "Seed for the score perturbation, overrides the scenario seed"
    )]
    pub seed: Option<u64>,

    #[arg(
        long,
        env = "CELLSIM_METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Path for per-slot metrics, e.g. logs/metrics.log. Metrics go to stdout when unset"
    )]
    pub metrics_file: Option<PathBuf>,

    #[arg(
        long,
        env = "CELLSIM_METRICS_FORMAT",
        default_value = "influx",
        help = "Metrics encoding: influx or json"
    )]
    pub metrics_format: String,
}

#[derive(Parser, Clone, Debug)]
pub struct ValidateArgs {
    #[arg(
        long,
        env = "CELLSIM_SCENARIO",
        value_hint = clap::ValueHint::FilePath,
        help = "Scenario file to check"
    )]
    pub scenario: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct WeightArgs {
    #[arg(long, help = "Priority level, 1 is the most important")]
    pub priority_level: u8,

    #[arg(long, help = "Packet delay budget in milliseconds")]
    pub delay_budget_ms: u32,

    #[arg(long, help = "Guaranteed bit rate flow")]
    pub gbr: bool,

    #[arg(long, default_value_t = 2.0, help = "Base of the priority factor")]
    pub priority_base: f64,
}
