use crate::api::simulation_dto::simulation_dto::SimulationDto;
use crate::domain::simulator::engine::SimulationEngine;
use crate::error::Result;
use crate::loader::parser::{parse_json_file, parse_json_str};

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Builds a ready-to-run simulation from a JSON description on disk.
pub fn load_simulation(file_path: &str) -> Result<SimulationEngine> {
    let dto: SimulationDto = parse_json_file::<SimulationDto>(file_path)?;
    log::info!("Simulation description '{}' parsed successfully.", file_path);

    let engine = SimulationEngine::try_from(dto)?;
    log::info!("Simulation engine constructed with {} resource(s).", engine.registry().len());

    Ok(engine)
}

/// Builds a ready-to-run simulation from an in-memory JSON description.
pub fn simulation_from_str(json: &str) -> Result<SimulationEngine> {
    let dto: SimulationDto = parse_json_str(json)?;
    SimulationEngine::try_from(dto)
}
