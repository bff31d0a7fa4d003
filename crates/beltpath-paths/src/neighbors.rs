use std::collections::HashMap;

use beltpath_core::Point;

use crate::cell::CellGrid;
use crate::distance::{self, ORTHOGONAL_COST};
use crate::traits::{AstarPather, Pather, WeightedPather};

/// Forced next-hop table: from a position, the search may only continue to
/// the listed coordinates.
pub type TargetMap = HashMap<Point, Vec<Point>>;

const DIAGONALS: [Point; 4] = [
    Point::new(1, -1),
    Point::new(1, 1),
    Point::new(-1, 1),
    Point::new(-1, -1),
];

/// The default grid neighbor policy.
///
/// - With an entry in `targets` for the current position and at least one
///   passable target, the neighbors are exactly those targets.
/// - Otherwise the four orthogonal cells, plus the four diagonals when
///   `diagonal` is set. A diagonal needs both flanking orthogonal cells to
///   be passable, so the search never cuts a wall corner.
/// - The destination is always admitted when it is geometrically present,
///   whatever its passability and, for a diagonal step, its flanks.
///
/// The estimate is `10 * manhattan`. That is exact on open 4-connected
/// grids but overestimates once diagonals are allowed, since one 14-cost
/// diagonal step closes 20 of it. Orthogonal solves are optimal; diagonal
/// solves may return a slightly more expensive path.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridPather<'a> {
    pub diagonal: bool,
    pub targets: Option<&'a TargetMap>,
}

impl<'a> GridPather<'a> {
    pub fn new(diagonal: bool, targets: Option<&'a TargetMap>) -> Self {
        Self { diagonal, targets }
    }

    fn forced(&self, grid: &CellGrid, p: Point, buf: &mut Vec<Point>) -> bool {
        let Some(hops) = self.targets.and_then(|t| t.get(&p)) else {
            return false;
        };
        if !hops.iter().any(|&q| grid.is_passable(q)) {
            return false;
        }
        buf.extend(hops.iter().copied().filter(|&q| grid.get(q).is_some()));
        true
    }
}

impl Pather for GridPather<'_> {
    fn neighbors(&self, grid: &CellGrid, p: Point, buf: &mut Vec<Point>) {
        if self.forced(grid, p, buf) {
            return;
        }
        let dest = grid.destination();
        for q in p.neighbors_4() {
            if grid.get(q).is_some_and(|c| c.passable || q == dest) {
                buf.push(q);
            }
        }
        if !self.diagonal {
            return;
        }
        for d in DIAGONALS {
            let q = p + d;
            if grid.get(q).is_none() {
                continue;
            }
            if q == dest {
                buf.push(q);
                continue;
            }
            if grid.is_passable(p.shift(d.x, 0))
                && grid.is_passable(p.shift(0, d.y))
                && grid.is_passable(q)
            {
                buf.push(q);
            }
        }
    }
}

impl WeightedPather for GridPather<'_> {
    fn cost(&self, from: Point, to: Point) -> i32 {
        distance::step_cost(from, to)
    }
}

impl AstarPather for GridPather<'_> {
    fn estimate(&self, from: Point, to: Point) -> i32 {
        ORTHOGONAL_COST * distance::manhattan(from, to)
    }
}
