pub mod architecture_model;
pub mod static_architecture;
