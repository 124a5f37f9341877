use anyhow::Context;
use clap::Parser;

use perf_sim_core::api::simulation_dto::simulation_dto::SimulationDto;
use perf_sim_core::domain::simulator::engine::SimulationEngine;
use perf_sim_core::domain::utils::id::ContainerId;
use perf_sim_core::loader::parser::parse_json_file;
use perf_sim_core::logger;

/// Architecture performance simulator
///
/// Runs a discrete-event simulation of the given architecture and usage model and
/// prints the run summary as JSON. Reproducible when a seed is given.
#[derive(Parser, Debug)]
#[command(name = "perf-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the JSON simulation description
    #[arg(short = 'c', long)]
    config: String,

    /// Random seed, overrides the seed of the description
    #[arg(long)]
    seed: Option<u64>,

    /// Simulation end time, overrides the end time of the description
    #[arg(short = 'e', long)]
    end_time: Option<f64>,

    /// Container to take out of the topology during the run
    #[arg(long, requires = "remove_at")]
    remove_container: Option<String>,

    /// Simulation time at which --remove-container takes effect
    #[arg(long, requires = "remove_container")]
    remove_at: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    log::info!("Logger initialized. Loading simulation from '{}'.", args.config);

    let mut dto: SimulationDto = parse_json_file(&args.config).with_context(|| format!("failed to read simulation description '{}'", args.config))?;
    if let Some(seed) = args.seed {
        dto.seed = Some(seed);
    }
    if let Some(end_time) = args.end_time {
        dto.simulation_end = end_time;
    }

    let mut engine = SimulationEngine::try_from(dto).context("invalid simulation description")?;

    if let (Some(container), Some(at)) = (args.remove_container, args.remove_at) {
        engine.run_until(at).context("simulation failed before scale-in")?;
        let dropped = engine.remove_container(&ContainerId::new(container.as_str()))?;
        log::info!("Scale-in of '{}' at {} dropped {} job(s).", container, engine.now(), dropped);
    }

    let report = engine.run().context("simulation failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
