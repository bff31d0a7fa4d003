/// Simulation parameters shared by the conveyor graph and the item
/// simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeltConfig {
    /// Sub-cells per belt side. Items sit at integer sub-cell coordinates in
    /// `0..resolution` on both axes.
    pub resolution: i32,
    /// [`Simulation::spawn_random_item`](crate::Simulation::spawn_random_item)
    /// does nothing once this many items exist.
    pub max_items: usize,
    /// Probability that one `spawn_random_item` call attempts a spawn.
    pub spawn_chance: f64,
}

impl Default for BeltConfig {
    fn default() -> Self {
        Self {
            resolution: 2,
            max_items: 10_000,
            spawn_chance: 0.991,
        }
    }
}

impl BeltConfig {
    /// Default config with a custom sub-cell resolution (at least 1).
    pub fn new(resolution: i32) -> Self {
        Self {
            resolution: resolution.max(1),
            ..Self::default()
        }
    }
}
