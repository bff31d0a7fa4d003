//! Grid pathfinding for beltpath.
//!
//! This crate provides:
//!
//! - **[`IndexedHeap`]**, a fixed-capacity indexed min-heap with in-place
//!   priority updates and FIFO tie-breaking
//! - **A\*** over a per-solve [`CellGrid`] ([`solve`], [`solve_with`],
//!   [`spawn_solve`]), returning the path together with the annotated grid
//! - **Chunk labelling** of a [`TileGrid`](beltpath_core::TileGrid) by
//!   reachability inside fixed squares ([`chunk_tiles`])
//! - **Freshness tickets** ([`TicketCounter`]) so callers can drop outcomes
//!   of superseded solves
//!
//! # Trait hierarchy
//!
//! | Trait | Provides |
//! |---|---|
//! | [`Pather`] | neighbor enumeration |
//! | [`WeightedPather`] : [`Pather`] | step cost |
//! | [`AstarPather`] : [`WeightedPather`] | heuristic, used for H scores |
//!
//! [`GridPather`] is the default policy: 10 per orthogonal step, 14 per
//! diagonal step, no corner cutting, and an optional forced next-hop table.

mod cell;
mod chunk;
mod distance;
mod error;
mod heap;
mod neighbors;
mod request;
mod solver;
mod traits;

pub use cell::{Cell, CellGrid, UNVISITED};
pub use chunk::{ChunkConfig, ChunkReport, chunk_tiles};
pub use distance::{DIAGONAL_COST, ORTHOGONAL_COST, manhattan, path_cost, step_cost};
pub use error::{HeapError, SolveError};
pub use heap::IndexedHeap;
pub use neighbors::{GridPather, TargetMap};
pub use request::{SolveOutcome, SolveRequest, Ticket, TicketCounter};
pub use solver::{search, solve, solve_with, spawn_solve};
pub use traits::{AstarPather, Pather, WeightedPather};
