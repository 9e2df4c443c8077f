// src/simulation/mod.rs

pub mod csv;
pub mod framework;
pub mod optimizer;
pub mod vehicle;

pub use framework::{run_mission, SimulationError};
pub use optimizer::StraightLineOptimizer;
pub use vehicle::SimulatedVehicle;
