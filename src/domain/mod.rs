pub mod architecture;
pub mod request;
pub mod resource;
pub mod scenario;
pub mod simulator;
pub mod utils;
