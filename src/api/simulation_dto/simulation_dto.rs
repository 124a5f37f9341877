use serde::Deserialize;

use crate::api::simulation_dto::architecture_dto::ArchitectureDto;
use crate::api::simulation_dto::usage_dto::UsageScenarioDto;

/// Root of a simulation description file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationDto {
    pub simulation_end: f64,
    pub seed: Option<u64>,
    pub architecture: ArchitectureDto,
    pub usage_scenarios: Vec<UsageScenarioDto>,
}
