pub mod architecture_dto;
pub mod simulation_dto;
pub mod usage_dto;
