use beltpath_core::Point;

use crate::cell::CellGrid;

/// Minimal pathfinding interface — provides neighbor enumeration.
pub trait Pather {
    /// Append the neighbors of `p` within `grid` into `buf`. The caller
    /// clears `buf` before calling. Holes must not be returned.
    fn neighbors(&self, grid: &CellGrid, p: Point, buf: &mut Vec<Point>);
}

/// Pather with weighted (positive-cost) edges.
pub trait WeightedPather: Pather {
    /// Cost of moving from `from` to `to`. Must be > 0.
    fn cost(&self, from: Point, to: Point) -> i32;
}

/// Full A* pather with an admissible heuristic.
///
/// The estimate is evaluated once per cell when a [`CellGrid`] is built
/// and stored as the cell's H score.
pub trait AstarPather: WeightedPather {
    /// Heuristic estimate of distance from `from` to `to`.
    ///
    /// The search returns a cheapest path only when the estimate never
    /// overestimates the true cost. An overestimating heuristic still finds
    /// a path whenever one exists, but not necessarily the cheapest.
    fn estimate(&self, from: Point, to: Point) -> i32;
}
