use anyhow::Result;
use ndarray as nd;
use photoprop::sim::sampling::cascade;
use photoprop::{Simulation, SimulationConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    let mut rng = StdRng::seed_from_u64(42);

    // Point source at the origin, one sensor 5 units away
    let sensors = nd::arr2(&[[5.0, 0.0, 0.0]]);
    let sim = Simulation::new(sensors, config)?;
    let (x0, v0, t0) = cascade(&[0.0, 0.0, 0.0], 0.0, 10_000, &mut rng);
    let result = sim.run(x0, v0, t0, &mut rng)?;

    let travel: Vec<f64> = result.hits.iter().map(|h| h.travel_time()).collect();
    println!("Hits: {}", travel.len());
    if !travel.is_empty() {
        println!(
            "Mean travel time: {:.2}",
            photoprop::vecutils::mean(&travel)
        );
    }

    let absorption = result.retro_propagate(10, 200, &mut rng)?;
    match absorption.mean_position() {
        Some(mean) => println!("Retro-propagated source estimate: {:.2?}", mean),
        None => println!("No retro-propagated photon was absorbed on its path"),
    }
    Ok(())
}
