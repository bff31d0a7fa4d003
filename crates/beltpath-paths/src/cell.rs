//! Per-solve search nodes: [`Cell`] and [`CellGrid`].
//!
//! A `CellGrid` is built fresh for every solve, moved into the solver and
//! handed back to the caller inside the outcome so the final G/H/F scores
//! can be drawn as an overlay. Coordinates without a cell ("holes") are
//! treated as impassable by every lookup.

use beltpath_core::{Point, Range, TileGrid};

use crate::traits::AstarPather;

/// G score of a cell the search has not reached.
///
/// Half of `i32::MAX`, so adding step costs and heuristics never overflows.
pub const UNVISITED: i32 = i32::MAX / 2;

/// A search node.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub id: usize,
    pub pos: Point,
    pub passable: bool,
    /// Cost from the source.
    pub g: i32,
    /// Heuristic estimate to the destination.
    pub h: i32,
    pub finished: bool,
    pub predecessor: Option<Point>,
    pub chunk: Option<u32>,
}

impl Cell {
    /// Total estimated cost, G + H.
    #[inline]
    pub fn f(&self) -> i32 {
        self.g.saturating_add(self.h)
    }

    /// Whether the search assigned this cell a finite cost.
    #[inline]
    pub fn is_reached(&self) -> bool {
        self.g < UNVISITED
    }
}

/// A rectangle of [`Cell`]s with optional holes, plus the endpoints the
/// scores were computed for.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellGrid {
    bounds: Range,
    cells: Vec<Option<Cell>>,
    source: Point,
    destination: Point,
}

impl CellGrid {
    /// Build a grid over `bounds`.
    ///
    /// `passable` returns `None` for holes. H scores come from
    /// `pather.estimate(p, destination)`; G is [`UNVISITED`] everywhere
    /// except the source, which starts at 0.
    pub fn from_fn<P: AstarPather>(
        bounds: Range,
        source: Point,
        destination: Point,
        pather: &P,
        passable: impl Fn(Point) -> Option<bool>,
    ) -> Self {
        let cells = bounds
            .iter()
            .enumerate()
            .map(|(id, p)| {
                passable(p).map(|passable| Cell {
                    id,
                    pos: p,
                    passable,
                    g: if p == source { 0 } else { UNVISITED },
                    h: pather.estimate(p, destination),
                    finished: false,
                    predecessor: None,
                    chunk: None,
                })
            })
            .collect();
        Self {
            bounds,
            cells,
            source,
            destination,
        }
    }

    /// Snapshot a [`TileGrid`]: every tile becomes a cell carrying the
    /// tile's id, passability and chunk.
    pub fn from_tiles<P: AstarPather>(
        tiles: &TileGrid,
        source: Point,
        destination: Point,
        pather: &P,
    ) -> Self {
        let mut grid = Self::from_fn(tiles.bounds(), source, destination, pather, |p| {
            tiles.get(p).map(|t| t.passable)
        });
        for cell in grid.cells.iter_mut().flatten() {
            if let Some(t) = tiles.get(cell.pos) {
                cell.id = t.id;
                cell.chunk = t.chunk;
            }
        }
        grid
    }

    /// The rectangle this grid covers.
    #[inline]
    pub fn bounds(&self) -> Range {
        self.bounds
    }

    #[inline]
    pub fn source(&self) -> Point {
        self.source
    }

    #[inline]
    pub fn destination(&self) -> Point {
        self.destination
    }

    /// Number of slots, holes included. Also the solver's heap capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells actually present.
    pub fn len(&self) -> usize {
        self.cells.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, p: Point) -> Option<&Cell> {
        self.bounds.index_of(p).and_then(|i| self.cells[i].as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, p: Point) -> Option<&mut Cell> {
        self.bounds.index_of(p).and_then(|i| self.cells[i].as_mut())
    }

    /// Passability of `p`; holes and outside points are impassable.
    #[inline]
    pub fn is_passable(&self, p: Point) -> bool {
        self.get(p).is_some_and(|c| c.passable)
    }

    /// Slot index of the cell at `p`, or `None` for holes/outside.
    #[inline]
    pub(crate) fn slot_of(&self, p: Point) -> Option<usize> {
        let i = self.bounds.index_of(p)?;
        self.cells[i].as_ref().map(|_| i)
    }

    #[inline]
    pub(crate) fn slot(&self, i: usize) -> Option<&Cell> {
        self.cells.get(i).and_then(Option::as_ref)
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, i: usize) -> Option<&mut Cell> {
        self.cells.get_mut(i).and_then(Option::as_mut)
    }

    /// Iterate over present cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten()
    }

    /// Iterate over slots (holes as `None`) with their slot index.
    pub(crate) fn slots(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i, c)))
    }

    /// Number of cells the search assigned a finite cost.
    pub fn scored_count(&self) -> usize {
        self.iter().filter(|c| c.is_reached()).count()
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use crate::GridPather;

    #[test]
    fn annotated_grid_round_trip() {
        let pather = GridPather::default();
        let mut g = CellGrid::from_fn(
            Range::with_size(3, 2),
            Point::new(0, 0),
            Point::new(2, 1),
            &pather,
            |p| (p != Point::new(1, 1)).then_some(true),
        );
        g.get_mut(Point::new(1, 0)).unwrap().predecessor = Some(Point::new(0, 0));
        let json = serde_json::to_string(&g).unwrap();
        let back: CellGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back.destination(), Point::new(2, 1));
        assert!(back.get(Point::new(1, 1)).is_none());
        assert_eq!(back.get(Point::new(1, 0)), g.get(Point::new(1, 0)));
    }
}
