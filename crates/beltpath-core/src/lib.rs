//! **beltpath-core** — geometry and the persistent tile model.
//!
//! This crate provides the types shared by the pathfinder and the conveyor
//! simulation: [`Point`] and [`Range`] for addressing grids, and
//! [`TileGrid`] for the long-lived map the other crates read and mutate.

pub mod geom;
pub mod tile;

pub use geom::{Point, Range, RangeIter};
pub use tile::{BeltId, Tile, TileGrid, TileGridError, TileRole};
