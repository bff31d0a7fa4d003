//! Shared scenario for the beltpath demos.
//!
//! Demonstrates: random map generation, A* between a source and a
//! destination, laying a conveyor along the solution, chunk labelling with
//! the belts as forced hops, and the item simulation.

use beltpath_belts::{BeltConfig, BeltError, ConveyorGraph, Simulation, TickReport};
use beltpath_core::{Point, TileGrid, TileRole};
use beltpath_paths::{ChunkConfig, ChunkReport, SolveError, SolveRequest, chunk_tiles, solve};
use rand::{Rng, RngExt};

pub const WIDTH: i32 = 32;
pub const HEIGHT: i32 = 16;
/// Chance of a tile starting out as a wall.
const WALL_DENSITY: f64 = 0.22;

/// Why a scenario could not be set up.
#[derive(Debug)]
pub enum ScenarioError {
    Solve(SolveError),
    Belt(BeltError),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solve(e) => write!(f, "solve failed: {e}"),
            Self::Belt(e) => write!(f, "laying belts failed: {e}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<SolveError> for ScenarioError {
    fn from(e: SolveError) -> Self {
        Self::Solve(e)
    }
}

impl From<BeltError> for ScenarioError {
    fn from(e: BeltError) -> Self {
        Self::Belt(e)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// A map with one conveyor from the left edge to the right edge.
pub struct Factory {
    pub tiles: TileGrid,
    pub graph: ConveyorGraph,
    pub sim: Simulation,
    pub source: Point,
    pub destination: Point,
    pub cost: i32,
    pub chunks: ChunkReport,
}

impl Factory {
    /// Generate walls, solve from source to destination and lay belts along
    /// the path.
    pub fn generate(rng: &mut impl Rng, config: BeltConfig) -> Result<Self, ScenarioError> {
        let source = Point::new(0, HEIGHT / 2);
        let destination = Point::new(WIDTH - 1, HEIGHT / 2);
        let mut tiles = TileGrid::from_fn(WIDTH, HEIGHT, |p| {
            p == source || p == destination || rng.random::<f64>() >= WALL_DENSITY
        });
        tiles.set_role(source, TileRole::Source);
        tiles.set_role(destination, TileRole::Destination);

        let outcome = solve(SolveRequest::from_tiles(&tiles, source, destination, ()));
        let path = outcome.result()?.to_vec();
        let cost = outcome.cost().unwrap_or_default();
        log::info!("solved in {:?}: {} steps, cost {cost}", outcome.elapsed, path.len());
        tiles.mark_solution(&path);

        let mut graph = ConveyorGraph::new(&config);
        graph.lay_path(&mut tiles, &path)?;
        let targets = graph.target_map();
        let chunks = chunk_tiles(&mut tiles, &ChunkConfig::default(), Some(&targets));

        Ok(Self {
            tiles,
            graph,
            sim: Simulation::new(config),
            source,
            destination,
            cost,
            chunks,
        })
    }

    /// One feeder roll followed by one simulation tick.
    pub fn step(&mut self, rng: &mut impl Rng) -> TickReport {
        self.sim.spawn_random_item(&mut self.graph, rng);
        self.sim.tick(&mut self.graph, &self.tiles)
    }

    /// ASCII overlay: walls, belts drawn in their flow direction, and `o`
    /// for belts carrying items.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(((WIDTH + 1) * HEIGHT) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let p = Point::new(x, y);
                out.push(self.glyph(p));
            }
            out.push('\n');
        }
        out
    }

    fn glyph(&self, p: Point) -> char {
        let Some(tile) = self.tiles.get(p) else {
            return ' ';
        };
        if !tile.passable {
            return '#';
        }
        if let Some(belt) = self.graph.belt_at(&self.tiles, p) {
            if !belt.items.is_empty() {
                return 'o';
            }
            // Items travel against the belt direction.
            let flow = -belt.direction;
            return match (flow.x, flow.y) {
                (1, 0) => '>',
                (-1, 0) => '<',
                (0, 1) => 'v',
                _ => '^',
            };
        }
        match tile.role {
            TileRole::Source => 'S',
            TileRole::Destination => 'D',
            _ => '.',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn open_factory() -> Factory {
        // Retry seeds until the random walls leave a route.
        (0..64)
            .find_map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                Factory::generate(&mut rng, BeltConfig::default()).ok()
            })
            .unwrap()
    }

    #[test]
    fn belts_follow_solution() {
        let f = open_factory();
        let on_path = f.tiles.iter().filter(|t| t.in_solution).count();
        assert_eq!(f.graph.belt_count(), on_path);
        assert_eq!(f.graph.conveyor_count(), 1);
        assert!(f.cost >= 10 * (WIDTH - 1));
        f.graph.check_consistency(&f.tiles).unwrap();
    }

    #[test]
    fn render_shows_flow() {
        let f = open_factory();
        let text = f.render();
        assert_eq!(text.lines().count(), HEIGHT as usize);
        assert!(text.lines().all(|l| l.chars().count() == WIDTH as usize));
        let row = text.lines().nth((HEIGHT / 2) as usize).unwrap();
        assert!(row.starts_with('>') || row.starts_with('^') || row.starts_with('v'));
    }

    #[test]
    fn items_flow_to_the_end() {
        let mut f = open_factory();
        let mut rng = StdRng::seed_from_u64(5);
        let mut deleted = 0;
        for _ in 0..400 {
            deleted += f.step(&mut rng).deleted;
        }
        assert!(deleted > 0);
        f.graph.check_consistency(&f.tiles).unwrap();
    }
}
