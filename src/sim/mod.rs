pub mod config;
pub mod detector;
pub mod medium;
pub mod photon;
pub mod retro;
pub mod sampling;
pub mod scattering;
mod simulation;

pub use config::SimulationConfig;
pub use simulation::{Simulation, SimulationResult};
