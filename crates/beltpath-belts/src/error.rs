use std::fmt;

use beltpath_core::{BeltId, Point};

use crate::graph::ConveyorId;

/// Errors returned by conveyor graph and simulation operations.
///
/// All of them leave the graph untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeltError {
    /// The position is outside the tile grid.
    OutOfBounds(Point),
    /// Belts can only be placed on passable tiles.
    Impassable(Point),
    /// The tile already holds a belt.
    Occupied(Point),
    /// The tile holds no belt.
    NoBelt(Point),
    /// Directions must be cardinal unit vectors.
    InvalidDirection(Point),
    /// Paths must have at least two 4-connected steps.
    InvalidPath,
    /// A sub-cell coordinate outside `0..resolution`.
    SubCellOutOfRange(Point),
    /// Another item already sits at this sub-cell.
    SubCellOccupied { pos: Point, sub: Point },
}

impl fmt::Display for BeltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds(p) => write!(f, "belts: {p} is outside the grid"),
            Self::Impassable(p) => write!(f, "belts: tile {p} is not passable"),
            Self::Occupied(p) => write!(f, "belts: tile {p} already holds a belt"),
            Self::NoBelt(p) => write!(f, "belts: no belt at {p}"),
            Self::InvalidDirection(d) => write!(f, "belts: {d} is not a cardinal direction"),
            Self::InvalidPath => f.write_str("belts: path is too short or not 4-connected"),
            Self::SubCellOutOfRange(s) => write!(f, "belts: sub-cell {s} out of range"),
            Self::SubCellOccupied { pos, sub } => {
                write!(f, "belts: sub-cell {sub} of {pos} is occupied")
            }
        }
    }
}

impl std::error::Error for BeltError {}

/// A broken graph invariant, as reported by
/// [`ConveyorGraph::check_consistency`](crate::ConveyorGraph::check_consistency).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphInconsistency {
    /// A tile and a belt disagree about which owns which.
    TileOwnership { pos: Point, belt: BeltId },
    /// A belt sits on an impassable tile.
    BeltOnWall { pos: Point, belt: BeltId },
    /// A belt and its conveyor disagree about membership.
    Membership { belt: BeltId, conveyor: ConveyorId },
    /// An active conveyor without belts.
    EmptyConveyor(ConveyorId),
    /// An inbound entry that does not target the tile listing it.
    DanglingInbound { pos: Point, belt: BeltId },
    /// A `next` link that does not match the belt's target tile.
    NextMismatch(BeltId),
    /// Following `next` from this belt never terminates.
    Cycle(BeltId),
    /// A conveyor's item cache differs from its belts' items.
    ItemCache(ConveyorId),
}

impl fmt::Display for GraphInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TileOwnership { pos, belt } => {
                write!(f, "graph: tile {pos} and {belt} disagree on ownership")
            }
            Self::BeltOnWall { pos, belt } => write!(f, "graph: {belt} sits on wall tile {pos}"),
            Self::Membership { belt, conveyor } => {
                write!(f, "graph: {belt} and {conveyor} disagree on membership")
            }
            Self::EmptyConveyor(c) => write!(f, "graph: {c} has no belts"),
            Self::DanglingInbound { pos, belt } => {
                write!(f, "graph: tile {pos} lists {belt} as inbound but it feeds elsewhere")
            }
            Self::NextMismatch(b) => write!(f, "graph: next link of {b} does not match its target"),
            Self::Cycle(b) => write!(f, "graph: following next from {b} loops"),
            Self::ItemCache(c) => write!(f, "graph: item cache of {c} is stale"),
        }
    }
}

impl std::error::Error for GraphInconsistency {}
