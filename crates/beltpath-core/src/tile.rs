//! The persistent tile model: [`Tile`], [`TileRole`] and [`TileGrid`].
//!
//! Tiles outlive individual path solves. They carry passability, the role a
//! tile plays for the caller, its chunk id and its belt relations. Belts
//! themselves live in an arena owned by the conveyor graph; a tile only
//! holds [`BeltId`] handles into it.

use std::fmt;

use crate::geom::{Point, Range};

/// Handle of a belt segment in the conveyor graph's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeltId(pub u32);

impl BeltId {
    /// Arena index of this handle.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BeltId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "belt#{}", self.0)
    }
}

/// What a tile is currently used for.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TileRole {
    #[default]
    Nothing,
    Source,
    Destination,
    Conveyor,
}

/// A persistent grid location.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub id: usize,
    pub pos: Point,
    pub passable: bool,
    pub role: TileRole,
    /// Connectivity group, `None` when unchunked or disconnected.
    pub chunk: Option<u32>,
    /// Belt placed on this tile, if any.
    pub belt: Option<BeltId>,
    /// Belts whose downstream target is this tile. Relation only.
    pub inbound: Vec<BeltId>,
    pub in_solution: bool,
}

impl Tile {
    fn new(id: usize, pos: Point, passable: bool) -> Self {
        Self {
            id,
            pos,
            passable,
            role: TileRole::Nothing,
            chunk: None,
            belt: None,
            inbound: Vec::new(),
            in_solution: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TileGrid
// ---------------------------------------------------------------------------

/// Dense, row-major storage of [`Tile`]s anchored at the origin.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileGrid {
    bounds: Range,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Create a grid of fully passable tiles.
    pub fn new(width: i32, height: i32) -> Self {
        Self::from_fn(width, height, |_| true)
    }

    /// Create a grid whose passability is given by `passable`.
    pub fn from_fn(width: i32, height: i32, mut passable: impl FnMut(Point) -> bool) -> Self {
        let bounds = Range::with_size(width, height);
        let tiles = bounds
            .iter()
            .enumerate()
            .map(|(id, p)| Tile::new(id, p, passable(p)))
            .collect();
        Self { bounds, tiles }
    }

    /// Parse an ASCII map: `.` is floor, `#` is wall, one line per row.
    ///
    /// Surrounding whitespace of the whole string is trimmed, as are
    /// leading spaces of each line, so indented literals work in tests.
    pub fn parse(s: &str) -> Result<Self, TileGridError> {
        let rows: Vec<&str> = s.trim().lines().map(str::trim_start).collect();
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |r| r.chars().count()) as i32;
        let mut walls = Vec::with_capacity((width * height).max(0) as usize);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as i32 != width {
                return Err(TileGridError::InconsistentWidth { line: y });
            }
            for (x, ch) in row.chars().enumerate() {
                match ch {
                    '.' => walls.push(false),
                    '#' => walls.push(true),
                    _ => {
                        return Err(TileGridError::InvalidChar {
                            ch,
                            pos: Point::new(x as i32, y as i32),
                        });
                    }
                }
            }
        }
        let bounds = Range::with_size(width, height);
        Ok(Self::from_fn(width, height, |p| {
            bounds.index_of(p).is_some_and(|i| !walls[i])
        }))
    }

    /// The grid rectangle.
    #[inline]
    pub fn bounds(&self) -> Range {
        self.bounds
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.bounds.width()
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bounds.height()
    }

    /// Number of tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    #[inline]
    pub fn get(&self, p: Point) -> Option<&Tile> {
        self.bounds.index_of(p).map(|i| &self.tiles[i])
    }

    #[inline]
    pub fn get_mut(&mut self, p: Point) -> Option<&mut Tile> {
        self.bounds.index_of(p).map(move |i| &mut self.tiles[i])
    }

    /// Passability of `p`; anything outside the grid is impassable.
    #[inline]
    pub fn is_passable(&self, p: Point) -> bool {
        self.get(p).is_some_and(|t| t.passable)
    }

    /// Belt placed at `p`, if any.
    #[inline]
    pub fn belt_at(&self, p: Point) -> Option<BeltId> {
        self.get(p).and_then(|t| t.belt)
    }

    /// Set passability. Returns `false` if `p` is outside the grid, or if
    /// the change would put a wall under a belt.
    pub fn set_passable(&mut self, p: Point, passable: bool) -> bool {
        match self.get_mut(p) {
            Some(t) if passable || t.belt.is_none() => {
                t.passable = passable;
                true
            }
            _ => false,
        }
    }

    /// Toggle passability of a tile, returning the new value.
    ///
    /// Conveyor tiles cannot be flipped. A tile that becomes a wall loses
    /// its source/destination role.
    pub fn flip(&mut self, p: Point) -> Option<bool> {
        let t = self.get_mut(p)?;
        if t.role == TileRole::Conveyor {
            return None;
        }
        t.passable = !t.passable;
        if !t.passable {
            t.role = TileRole::Nothing;
        }
        Some(t.passable)
    }

    /// Set the role of a tile. Returns `false` if `p` is outside the grid.
    pub fn set_role(&mut self, p: Point, role: TileRole) -> bool {
        match self.get_mut(p) {
            Some(t) => {
                t.role = role;
                true
            }
            None => false,
        }
    }

    /// Flag every tile on `path` as part of the current solution.
    pub fn mark_solution(&mut self, path: &[Point]) {
        for &p in path {
            if let Some(t) = self.get_mut(p) {
                t.in_solution = true;
            }
        }
    }

    /// Clear all solution flags.
    pub fn clear_solution(&mut self) {
        for t in &mut self.tiles {
            t.in_solution = false;
        }
    }

    /// Iterate over tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Mutable row-major iteration.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }
}

/// Errors that can occur when parsing an ASCII tile map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileGridError {
    /// A row's width differs from the first row.
    InconsistentWidth { line: usize },
    /// A character other than `.` or `#` was found.
    InvalidChar { ch: char, pos: Point },
}

impl fmt::Display for TileGridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentWidth { line } => {
                write!(f, "tile map: line {line} has inconsistent width")
            }
            Self::InvalidChar { ch, pos } => {
                write!(f, "tile map: invalid character \u{201c}{ch}\u{201d} at {pos}")
            }
        }
    }
}

impl std::error::Error for TileGridError {}
