use std::thread::{self, JoinHandle};
use std::time::Instant;

use beltpath_core::Point;

use crate::cell::{CellGrid, UNVISITED};
use crate::error::SolveError;
use crate::heap::IndexedHeap;
use crate::neighbors::GridPather;
use crate::request::{SolveOutcome, SolveRequest};
use crate::traits::WeightedPather;

/// Run A* over `cells` from its source to its destination.
///
/// Every cell is queued up front keyed by its F score. The loop runs until
/// the destination leaves the queue; a dequeued cell that was never reached
/// ends the search early, since everything left is unreachable too. On
/// return `cells` holds the final G scores, finished flags and predecessors.
///
/// Returns the path from source to destination, both included.
pub fn search<P: WeightedPather>(
    cells: &mut CellGrid,
    pather: &P,
) -> Result<Vec<Point>, SolveError> {
    let source = cells.source();
    let destination = cells.destination();
    let src_idx = cells.slot_of(source);
    let dst_idx = cells.slot_of(destination);
    let (Some(src_idx), Some(dst_idx)) = (src_idx, dst_idx) else {
        return Err(SolveError::InvalidGrid);
    };

    if src_idx == dst_idx {
        if let Some(c) = cells.slot_mut(src_idx) {
            c.finished = true;
        }
        return Ok(vec![source]);
    }

    let mut open = IndexedHeap::with_capacity(cells.capacity());
    for (i, cell) in cells.slots() {
        open.enqueue(i, cell.f())?;
    }

    let mut nbuf = Vec::with_capacity(8);
    while open.contains(dst_idx) {
        if open.is_empty() {
            return Err(SolveError::NoPath);
        }
        let bi = open.dequeue()?;
        let Some(best) = cells.slot(bi) else {
            continue;
        };
        if best.g >= UNVISITED {
            return Err(SolveError::NoPath);
        }
        let (best_pos, best_g) = (best.pos, best.g);

        nbuf.clear();
        pather.neighbors(cells, best_pos, &mut nbuf);

        for &np in nbuf.iter() {
            if np == best_pos {
                continue;
            }
            let Some(ni) = cells.slot_of(np) else {
                continue;
            };
            let candidate = best_g + pather.cost(best_pos, np);
            let Some(n) = cells.slot_mut(ni) else {
                continue;
            };
            if n.finished {
                continue;
            }
            if candidate < n.g || n.predecessor.is_none() {
                n.g = n.g.min(candidate);
                n.predecessor = Some(best_pos);
                let f = n.f();
                open.update_priority(ni, f)?;
            }
        }

        if let Some(c) = cells.slot_mut(bi) {
            c.finished = true;
        }
    }

    // Reconstruct by walking predecessors; a chain longer than the grid
    // means it never reaches the source.
    let limit = cells.capacity();
    let mut path = vec![destination];
    let mut cur = destination;
    while cur != source {
        let pred = cells
            .get(cur)
            .and_then(|c| c.predecessor)
            .ok_or(SolveError::NoPath)?;
        path.push(pred);
        if path.len() > limit {
            return Err(SolveError::NoPath);
        }
        cur = pred;
    }
    path.reverse();
    Ok(path)
}

/// Solve with an arbitrary pather and echo `token` back.
///
/// A missing grid short-circuits with [`SolveError::InvalidGrid`]. The
/// annotated grid is returned whenever one was supplied.
pub fn solve_with<T, P: WeightedPather>(
    cells: Option<CellGrid>,
    pather: &P,
    token: T,
) -> SolveOutcome<T> {
    let start = Instant::now();
    let Some(mut cells) = cells else {
        return SolveOutcome::failed(SolveError::InvalidGrid, None, start.elapsed(), token);
    };
    let result = search(&mut cells, pather);
    let elapsed = start.elapsed();
    match result {
        Ok(path) => {
            log::debug!(
                "solved {} -> {} in {:?}: {} steps, {} cells scored",
                cells.source(),
                cells.destination(),
                elapsed,
                path.len().saturating_sub(1),
                cells.scored_count()
            );
            SolveOutcome {
                path,
                cells: Some(cells),
                elapsed,
                token,
                error: None,
            }
        }
        Err(e) => {
            log::debug!(
                "no path {} -> {} after {:?}: {e}",
                cells.source(),
                cells.destination(),
                elapsed
            );
            SolveOutcome::failed(e, Some(cells), elapsed, token)
        }
    }
}

/// Solve a request with the default [`GridPather`].
pub fn solve<T>(request: SolveRequest<T>) -> SolveOutcome<T> {
    let SolveRequest {
        cells,
        diagonal,
        targets,
        token,
    } = request;
    let pather = GridPather::new(diagonal, targets.as_ref());
    solve_with(cells, &pather, token)
}

/// Run [`solve`] on its own thread.
///
/// Each request owns its grid, so concurrent solves share no state.
pub fn spawn_solve<T: Send + 'static>(request: SolveRequest<T>) -> JoinHandle<SolveOutcome<T>> {
    thread::spawn(move || solve(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::path_cost;
    use crate::neighbors::TargetMap;
    use crate::traits::Pather;
    use beltpath_core::{Range, TileGrid};
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    fn request(tiles: &TileGrid, from: Point, to: Point, diagonal: bool) -> SolveRequest<u32> {
        SolveRequest::from_tiles(tiles, from, to, 0).with_diagonal(diagonal)
    }

    #[test]
    fn open_grid_without_diagonals() {
        let tiles = TileGrid::new(10, 10);
        let out = solve(request(&tiles, Point::new(1, 1), Point::new(5, 5), false));
        assert_eq!(out.error, None);
        assert_eq!(out.path.len(), 9);
        assert_eq!(path_cost(&out.path), 80);
        assert_eq!(out.path.first(), Some(&Point::new(1, 1)));
        assert_eq!(out.path.last(), Some(&Point::new(5, 5)));
        assert_eq!(out.cost(), Some(80));
    }

    #[test]
    fn open_grid_with_diagonals() {
        let tiles = TileGrid::new(10, 10);
        let out = solve(request(&tiles, Point::new(1, 1), Point::new(5, 5), true));
        assert_eq!(out.path.len(), 5);
        assert_eq!(path_cost(&out.path), 56);
    }

    #[test]
    fn wall_separating_quadrants_means_no_path() {
        let tiles = TileGrid::parse(
            "
            ....#.....
            ....#.....
            ....#.....
            ....#.....
            ....#.....
            ....#.....",
        )
        .unwrap();
        for diagonal in [false, true] {
            let out = solve(request(&tiles, Point::new(1, 1), Point::new(8, 4), diagonal));
            assert!(out.path.is_empty());
            assert_eq!(out.error, Some(SolveError::NoPath));
            assert!(out.cells.is_some());
        }
    }

    #[test]
    fn missing_grid_is_invalid() {
        let out = solve(SolveRequest::new(None, "stale?"));
        assert!(out.path.is_empty());
        assert!(out.cells.is_none());
        assert_eq!(out.error, Some(SolveError::InvalidGrid));
        assert_eq!(out.token, "stale?");
    }

    #[test]
    fn endpoint_outside_grid_is_invalid() {
        let tiles = TileGrid::new(4, 4);
        let out = solve(request(&tiles, Point::new(0, 0), Point::new(9, 9), false));
        assert_eq!(out.error, Some(SolveError::InvalidGrid));
    }

    #[test]
    fn source_equals_destination() {
        let tiles = TileGrid::new(4, 4);
        let out = solve(request(&tiles, Point::new(2, 2), Point::new(2, 2), false));
        assert_eq!(out.path, vec![Point::new(2, 2)]);
        assert_eq!(out.cost(), Some(0));
    }

    #[test]
    fn detour_around_wall() {
        let tiles = TileGrid::parse(
            "
            .....
            .###.
            .....",
        )
        .unwrap();
        let out = solve(request(&tiles, Point::new(0, 1), Point::new(4, 1), false));
        // Around the wall: up/down one, across four, back one.
        assert_eq!(path_cost(&out.path), 60);
        for p in &out.path {
            assert!(tiles.is_passable(*p));
        }
    }

    #[test]
    fn no_corner_cutting() {
        let tiles = TileGrid::parse(
            "
            .#.
            ...
            ...",
        )
        .unwrap();
        let out = solve(request(&tiles, Point::new(0, 0), Point::new(2, 2), true));
        // (0,0) -> (1,1) would clip the wall at (1,0).
        assert_eq!(path_cost(&out.path), 34);
        assert_eq!(out.path[1], Point::new(0, 1));
    }

    #[test]
    fn diagonal_onto_destination_ignores_flanks() {
        let tiles = TileGrid::parse(
            "
            .#.
            #..
            ...",
        )
        .unwrap();
        let out = solve(request(&tiles, Point::new(1, 1), Point::new(0, 0), true));
        assert_eq!(out.path, vec![Point::new(1, 1), Point::new(0, 0)]);
    }

    #[test]
    fn impassable_destination_is_still_reachable() {
        let mut tiles = TileGrid::new(5, 1);
        tiles.set_passable(Point::new(4, 0), false);
        let out = solve(request(&tiles, Point::new(0, 0), Point::new(4, 0), false));
        assert_eq!(out.path.len(), 5);
    }

    #[test]
    fn annotated_grid_finishes_source_and_path() {
        let tiles = TileGrid::new(6, 6);
        let out = solve(request(&tiles, Point::new(0, 0), Point::new(5, 0), false));
        let cells = out.cells.as_ref().unwrap();
        assert!(cells.get(Point::new(0, 0)).unwrap().finished);
        for w in out.path.windows(2) {
            assert_eq!(cells.get(w[1]).unwrap().predecessor, Some(w[0]));
        }
        // Far corner is never expanded on an open grid.
        assert!(!cells.get(Point::new(0, 5)).unwrap().finished);
    }

    #[test]
    fn forced_targets_redirect_search() {
        let tiles = TileGrid::parse(
            "
            ..#..
            ..#..
            ..#..",
        )
        .unwrap();
        // A belt-style hop across the wall from (1,1) to (3,1).
        let mut targets = TargetMap::new();
        targets.insert(Point::new(1, 1), vec![Point::new(3, 1)]);
        let out = solve(
            request(&tiles, Point::new(0, 1), Point::new(4, 1), false).with_targets(targets),
        );
        assert_eq!(
            out.path,
            vec![
                Point::new(0, 1),
                Point::new(1, 1),
                Point::new(3, 1),
                Point::new(4, 1)
            ]
        );
    }

    #[test]
    fn holes_block_like_walls() {
        let pather = GridPather::default();
        let cells = CellGrid::from_fn(
            Range::with_size(3, 3),
            Point::new(0, 0),
            Point::new(2, 0),
            &pather,
            |p| if p.x == 1 && p.y < 2 { None } else { Some(true) },
        );
        let out = solve_with(Some(cells), &pather, ());
        assert_eq!(path_cost(&out.path), 60);
    }

    #[test]
    fn spawned_solves_are_independent() {
        let tiles = TileGrid::new(20, 20);
        let handles: Vec<_> = (0..4)
            .map(|i| spawn_solve(request(&tiles, Point::new(0, 0), Point::new(19, i * 5), false)))
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let out = h.join().unwrap();
            assert_eq!(out.path.last(), Some(&Point::new(19, i as i32 * 5)));
            assert_eq!(path_cost(&out.path), 10 * (19 + i as i32 * 5));
        }
    }

    /// (pos, g, finished, predecessor) of every cell.
    type Snapshot = Vec<(Point, i32, bool, Option<Point>)>;

    fn snapshot(grid: &CellGrid) -> Snapshot {
        grid.iter()
            .map(|c| (c.pos, c.g, c.finished, c.predecessor))
            .collect()
    }

    /// Grid policy that records the whole grid each time a cell is expanded.
    struct Recording<'a> {
        inner: GridPather<'a>,
        seen: RefCell<Vec<Snapshot>>,
    }

    impl Pather for Recording<'_> {
        fn neighbors(&self, grid: &CellGrid, p: Point, buf: &mut Vec<Point>) {
            self.seen.borrow_mut().push(snapshot(grid));
            self.inner.neighbors(grid, p, buf);
        }
    }

    impl WeightedPather for Recording<'_> {
        fn cost(&self, from: Point, to: Point) -> i32 {
            self.inner.cost(from, to)
        }
    }

    #[test]
    fn scores_only_drop_and_finished_cells_stay_put() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut lowered = 0;
        for round in 0..60 {
            let diagonal = round % 2 == 0;
            let tiles = TileGrid::from_fn(12, 10, |_| rng.random_range(0..100u32) >= 25);
            let from = Point::new(rng.random_range(0..12), rng.random_range(0..10));
            let to = Point::new(rng.random_range(0..12), rng.random_range(0..10));
            let inner = GridPather::new(diagonal, None);
            let cells = CellGrid::from_tiles(&tiles, from, to, &inner);
            let pather = Recording {
                inner,
                seen: RefCell::new(Vec::new()),
            };
            let out = solve_with(Some(cells), &pather, ());
            let mut seen = pather.seen.into_inner();
            seen.push(snapshot(out.cells.as_ref().unwrap()));

            for w in seen.windows(2) {
                for (before, after) in w[0].iter().zip(&w[1]) {
                    assert_eq!(before.0, after.0);
                    assert!(after.1 <= before.1, "g rose at {}", before.0);
                    if before.2 {
                        assert_eq!(before, after, "finished cell {} changed", before.0);
                    }
                    if after.1 < before.1 && before.1 < UNVISITED {
                        lowered += 1;
                    }
                }
            }
        }
        // Some cell was first reached the long way and then improved.
        assert!(lowered > 0);
    }

    /// Breadth-first reference for 4-connected unit-cost grids.
    fn bfs_cost(tiles: &TileGrid, from: Point, to: Point) -> Option<i32> {
        let mut dist = vec![None; tiles.len()];
        let b = tiles.bounds();
        let mut queue = VecDeque::new();
        dist[b.index_of(from)?] = Some(0);
        queue.push_back(from);
        while let Some(p) = queue.pop_front() {
            let d = dist[b.index_of(p)?]?;
            if p == to {
                return Some(d * 10);
            }
            for q in p.neighbors_4() {
                if let Some(qi) = b.index_of(q) {
                    if (tiles.is_passable(q) || q == to) && dist[qi].is_none() {
                        dist[qi] = Some(d + 1);
                        queue.push_back(q);
                    }
                }
            }
        }
        None
    }

    #[test]
    fn random_maps_match_reference_and_resolve_identically() {
        let mut rng = StdRng::seed_from_u64(1234);
        for _ in 0..40 {
            let tiles = TileGrid::from_fn(16, 12, |_| rng.random_range(0..100u32) >= 30);
            let from = Point::new(rng.random_range(0..16), rng.random_range(0..12));
            let to = Point::new(rng.random_range(0..16), rng.random_range(0..12));
            if !tiles.is_passable(from) {
                continue;
            }
            let expected = bfs_cost(&tiles, from, to);
            let first = solve(request(&tiles, from, to, false));
            let second = solve(request(&tiles, from, to, false));
            match expected {
                Some(cost) => {
                    assert_eq!(path_cost(&first.path), cost);
                    assert_eq!(path_cost(&second.path), cost);
                }
                None => {
                    assert!(first.path.is_empty());
                    assert!(second.path.is_empty());
                }
            }
        }
    }
}
