pub mod geom;
pub mod sim;
pub mod vecutils;

// Prelude
pub use sim::detector::{Detector, HitRecord, HitTable};
pub use sim::medium::Medium;
pub use sim::photon::{Absorption, PhotonEnsemble};
pub use sim::retro::retro_propagate;
pub use sim::scattering::ScatteringModel;
pub use sim::{Simulation, SimulationConfig, SimulationResult};
