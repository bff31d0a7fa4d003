//! Chunk labelling.
//!
//! The grid is cut into fixed squares and every passable tile of a square
//! gets the square's id, provided the solver can reach it from the square's
//! seed without leaving the square. Everything else is left unchunked.

use beltpath_core::{Point, Range, TileGrid};

use crate::cell::CellGrid;
use crate::neighbors::{GridPather, TargetMap};
use crate::solver::search;

/// Chunking parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkConfig {
    /// Side length of a chunk, in tiles.
    pub size: i32,
    pub diagonal: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 8,
            diagonal: false,
        }
    }
}

/// Summary of a [`chunk_tiles`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Number of geometric chunks, empty ones included.
    pub chunks: usize,
    /// Passable tiles that received a chunk id.
    pub assigned: usize,
    /// Passable tiles unreachable from their chunk's seed.
    pub disconnected: usize,
}

/// Label every tile of `tiles` with its chunk id.
///
/// Chunk ids follow [`Range::chunks`] order. The seed of a chunk is its first
/// passable tile in row-major order. Impassable and disconnected tiles get
/// `None`.
pub fn chunk_tiles(
    tiles: &mut TileGrid,
    config: &ChunkConfig,
    targets: Option<&TargetMap>,
) -> ChunkReport {
    let pather = GridPather::new(config.diagonal, targets);
    let chunks = tiles.bounds().chunks(config.size);
    let mut report = ChunkReport {
        chunks: chunks.len(),
        ..ChunkReport::default()
    };

    for t in tiles.iter_mut() {
        t.chunk = None;
    }

    for (id, &area) in chunks.iter().enumerate() {
        let connected = connected_in(tiles, area, &pather);
        let passable = area.iter().filter(|&p| tiles.is_passable(p)).count();
        for &p in &connected {
            if let Some(t) = tiles.get_mut(p) {
                t.chunk = Some(id as u32);
            }
        }
        report.assigned += connected.len();
        report.disconnected += passable - connected.len();
    }

    log::debug!(
        "chunked {}x{} grid into {} chunks: {} assigned, {} disconnected",
        tiles.width(),
        tiles.height(),
        report.chunks,
        report.assigned,
        report.disconnected
    );
    report
}

/// Passable tiles of `area` reachable from its seed, the seed included.
fn connected_in(tiles: &TileGrid, area: Range, pather: &GridPather<'_>) -> Vec<Point> {
    let Some(seed) = area.iter().find(|&p| tiles.is_passable(p)) else {
        return Vec::new();
    };
    let mut reached = vec![false; area.len()];
    let mark = |p: Point, reached: &mut Vec<bool>| {
        if let Some(i) = area.index_of(p) {
            reached[i] = true;
        }
    };
    mark(seed, &mut reached);

    for p in area.iter() {
        let Some(i) = area.index_of(p) else {
            continue;
        };
        if reached[i] || !tiles.is_passable(p) {
            continue;
        }
        let mut cells = CellGrid::from_fn(area, seed, p, pather, |q| {
            tiles.get(q).map(|t| t.passable)
        });
        // Every passable tile on a found path shares the seed's component.
        if let Ok(path) = search(&mut cells, pather) {
            for q in path {
                if tiles.is_passable(q) {
                    mark(q, &mut reached);
                }
            }
        }
    }

    area.iter()
        .filter(|&p| area.index_of(p).is_some_and(|i| reached[i]))
        .collect()
}
