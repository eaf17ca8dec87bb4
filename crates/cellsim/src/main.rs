mod cell;
mod config;
mod logging;
mod metrics;
mod scenario;
mod sim;

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use api_types::QosContext;
use clap::Parser;
use lyapunov::{
    DriftAllocator, QosWeightCalculator, SchedulerError, StaticQosDirectory, WeightConfig,
};
use utils::version;

use crate::config::{Cli, Commands, RunArgs, ValidateArgs, WeightArgs};
use crate::metrics::SlotRecorder;
use crate::scenario::Scenario;
use crate::sim::Simulation;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_args) => run_simulation(run_args),
        Commands::Validate(validate_args) => run_validate(validate_args),
        Commands::Weight(weight_args) => run_weight(weight_args),
    }
}

fn scheduler_error(report: error_stack::Report<SchedulerError>) -> anyhow::Error {
    anyhow::anyhow!("{report:?}")
}

fn run_simulation(run_args: RunArgs) -> Result<()> {
    let _guard = logging::init(run_args.metrics_file.as_deref())?;

    tracing::info!("Starting cellsim {}", &**version::VERSION);

    let scenario = Scenario::load(&run_args.scenario)
        .with_context(|| format!("loading {}", run_args.scenario.display()))?;
    let recorder = SlotRecorder::new(
        &run_args.metrics_format,
        scenario.cell.direction,
        scenario.cell.slot_duration_us,
    );
    let mut simulation =
        Simulation::new(&scenario, run_args.seed, Some(recorder)).map_err(scheduler_error)?;

    tracing::info!(
        direction = %scenario.cell.direction,
        flows = scenario.flows.len(),
        slots = run_args.slots,
        "running scenario"
    );
    let summary = simulation.run(run_args.slots);
    summary.log();

    Ok(())
}

fn run_validate(validate_args: ValidateArgs) -> Result<()> {
    utils::logging::init();

    let scenario = Scenario::load(&validate_args.scenario)
        .with_context(|| format!("loading {}", validate_args.scenario.display()))?;
    // tunable ranges are only checked when an allocator is built
    DriftAllocator::builder()
        .qos_directory(Arc::new(StaticQosDirectory::new()))
        .config(scenario.allocator_config(None))
        .build()
        .map_err(scheduler_error)?;

    tracing::info!(
        flows = scenario.flows.len(),
        classes = scenario.qos_classes.len(),
        "scenario {} is valid",
        validate_args.scenario.display()
    );
    Ok(())
}

fn run_weight(weight_args: WeightArgs) -> Result<()> {
    utils::logging::init();

    let cfg = WeightConfig {
        priority_base: weight_args.priority_base,
        ..Default::default()
    };
    cfg.validate().map_err(scheduler_error)?;

    let calculator = QosWeightCalculator::new(cfg);
    let weight = calculator.weight(Some(&QosContext {
        qfi: 0,
        five_qi: 0,
        priority_level: weight_args.priority_level,
        delay_budget_ms: weight_args.delay_budget_ms,
        is_gbr: weight_args.gbr,
    }));
    println!("{weight}");
    Ok(())
}
