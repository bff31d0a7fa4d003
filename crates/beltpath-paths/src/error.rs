use std::fmt;

/// Errors reported by [`IndexedHeap`](crate::IndexedHeap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// `dequeue` on an empty heap.
    Empty,
    /// The handle is already queued.
    AlreadyQueued(usize),
    /// The handle is not queued.
    NotQueued(usize),
    /// The handle is outside `0..capacity`.
    OutOfCapacity { handle: usize, capacity: usize },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("heap: dequeue on empty queue"),
            Self::AlreadyQueued(h) => write!(f, "heap: handle {h} is already queued"),
            Self::NotQueued(h) => write!(f, "heap: handle {h} is not queued"),
            Self::OutOfCapacity { handle, capacity } => {
                write!(f, "heap: handle {handle} exceeds capacity {capacity}")
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// Why a solve produced no path.
///
/// Neither case is fatal: callers skip rendering and may request a new
/// solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveError {
    /// No grid was supplied, or the source/destination is not a cell of it.
    InvalidGrid,
    /// The destination cannot be reached from the source.
    NoPath,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGrid => f.write_str("solve: missing or degenerate grid"),
            Self::NoPath => f.write_str("solve: destination unreachable"),
        }
    }
}

impl std::error::Error for SolveError {}

// Only reachable from a corrupted search state.
impl From<HeapError> for SolveError {
    fn from(_: HeapError) -> Self {
        Self::NoPath
    }
}
