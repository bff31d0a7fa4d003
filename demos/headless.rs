//! Headless conveyor demo: solve, lay belts, run the simulation and print
//! the map every few ticks.
//!
//! Run: cargo run --bin headless [seed]

use beltpath_belts::BeltConfig;
use beltpath_demos::Factory;
use rand::SeedableRng;
use rand::rngs::StdRng;

const TICKS: usize = 120;
const PRINT_EVERY: usize = 30;

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut factory = match Factory::generate(&mut rng, BeltConfig::default()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {e} (seed {seed})");
            std::process::exit(1);
        }
    };
    println!(
        "seed {seed}: {} -> {}, cost {}, {} chunks ({} tiles disconnected)",
        factory.source,
        factory.destination,
        factory.cost,
        factory.chunks.chunks,
        factory.chunks.disconnected
    );
    print!("{}", factory.render());

    let mut deleted = 0;
    for t in 1..=TICKS {
        deleted += factory.step(&mut rng).deleted;
        if t % PRINT_EVERY == 0 {
            println!(
                "\ntick {t}: {} items on belts, {deleted} delivered",
                factory.sim.len()
            );
            print!("{}", factory.render());
        }
    }

    if let Err(e) = factory.graph.check_consistency(&factory.tiles) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
