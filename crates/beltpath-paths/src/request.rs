//! Solve requests and outcomes, plus the ticket counter used to discard
//! stale results.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use beltpath_core::{Point, TileGrid};

use crate::cell::CellGrid;
use crate::error::SolveError;
use crate::neighbors::{GridPather, TargetMap};

/// Everything a single solve needs. The grid is owned, so a request can be
/// moved onto a worker thread.
#[derive(Clone, Debug)]
pub struct SolveRequest<T> {
    pub cells: Option<CellGrid>,
    pub diagonal: bool,
    pub targets: Option<TargetMap>,
    /// Opaque value echoed back in the outcome.
    pub token: T,
}

impl<T> SolveRequest<T> {
    /// A request over an explicit grid, orthogonal moves only.
    pub fn new(cells: Option<CellGrid>, token: T) -> Self {
        Self {
            cells,
            diagonal: false,
            targets: None,
            token,
        }
    }

    /// Snapshot `tiles` into a fresh [`CellGrid`] for `source -> destination`.
    pub fn from_tiles(tiles: &TileGrid, source: Point, destination: Point, token: T) -> Self {
        let pather = GridPather::default();
        let cells = CellGrid::from_tiles(tiles, source, destination, &pather);
        Self::new(Some(cells), token)
    }

    pub fn with_diagonal(mut self, diagonal: bool) -> Self {
        self.diagonal = diagonal;
        self
    }

    /// Restrict the search to forced next hops where `targets` has an entry.
    pub fn with_targets(mut self, targets: TargetMap) -> Self {
        self.targets = Some(targets);
        self
    }
}

/// Result of a solve.
///
/// `path` is empty whenever `error` is set. `cells` is the annotated grid
/// when one was supplied, whether or not a path was found.
#[derive(Clone, Debug)]
pub struct SolveOutcome<T> {
    pub path: Vec<Point>,
    pub cells: Option<CellGrid>,
    pub elapsed: Duration,
    pub token: T,
    pub error: Option<SolveError>,
}

impl<T> SolveOutcome<T> {
    pub fn failed(error: SolveError, cells: Option<CellGrid>, elapsed: Duration, token: T) -> Self {
        Self {
            path: Vec::new(),
            cells,
            elapsed,
            token,
            error: Some(error),
        }
    }

    #[inline]
    pub fn is_solved(&self) -> bool {
        self.error.is_none()
    }

    /// The path, or the reason there is none.
    pub fn result(&self) -> Result<&[Point], SolveError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(&self.path),
        }
    }

    /// Final G score of the destination, for a solved outcome.
    pub fn cost(&self) -> Option<i32> {
        if !self.is_solved() {
            return None;
        }
        let cells = self.cells.as_ref()?;
        cells.get(cells.destination()).map(|c| c.g)
    }
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Identifies one issued solve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticket(pub u64);

/// Issues increasing [`Ticket`]s and remembers the latest one.
///
/// Clones share the counter, so a worker can check whether its result is
/// still wanted before publishing it.
#[derive(Clone, Debug, Default)]
pub struct TicketCounter {
    latest: Arc<AtomicU64>,
}

impl TicketCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, superseding all earlier ones.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued ticket, if any.
    pub fn latest(&self) -> Option<Ticket> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            n => Some(Ticket(n)),
        }
    }

    /// Whether `ticket` is the most recent one. Outcomes carrying an older
    /// ticket should be dropped.
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }
}
