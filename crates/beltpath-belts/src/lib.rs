//! Conveyor belts for beltpath.
//!
//! Belts sit on [`TileGrid`](beltpath_core::TileGrid) tiles and link into
//! [`Conveyor`]s: maximal runs that share an animation phase and an item
//! list. The [`ConveyorGraph`] keeps the wiring acyclic while belts are
//! placed, rotated, or laid along a solved path. A [`Simulation`] moves
//! items one sub-cell per tick, following each belt's lane and handing
//! items sideways at sorter belts.
//!
//! Directions point away from the tile a belt feeds: a belt at `p` facing
//! `d` feeds `p - d`.

mod config;
pub mod direction;
mod error;
mod graph;
mod item;
mod sim;

pub use config::BeltConfig;
pub use direction::{PHASE_COUNT, ROTATION, lane, next_direction};
pub use error::{BeltError, GraphInconsistency};
pub use graph::{Conveyor, ConveyorGraph, ConveyorId, ConveyorTile};
pub use item::{Item, ItemId};
pub use sim::{Simulation, TickReport};
