//! The conveyor graph.
//!
//! Belts ([`ConveyorTile`]s) live in an append-only arena addressed by
//! [`BeltId`]; conveyors group belts into logical runs. Tiles of the
//! [`TileGrid`] hold the belt placed on them and the belts that feed them
//! (the inbound list). Every operation takes the tile grid explicitly and
//! keeps both sides in step:
//!
//! - a tile's inbound list holds exactly the belts whose target is that
//!   tile, minus those whose wiring was refused because it would close a
//!   loop;
//! - `next` of a belt is the belt on its target tile, if wired;
//! - every belt is a member of exactly one active conveyor, and no active
//!   conveyor is empty;
//! - following `next` from any belt terminates.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use beltpath_core::{BeltId, Point, TileGrid, TileRole};
use beltpath_paths::TargetMap;

use crate::config::BeltConfig;
use crate::direction::{self, PHASE_COUNT, ROTATION};
use crate::error::{BeltError, GraphInconsistency};
use crate::item::ItemId;

/// Handle of a conveyor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConveyorId(pub u32);

impl fmt::Display for ConveyorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conveyor#{}", self.0)
    }
}

/// One belt segment.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConveyorTile {
    pub id: BeltId,
    pub pos: Point,
    /// Cardinal unit vector, or zero for an unwired end.
    pub direction: Point,
    /// Derived from `direction`, see [`direction::lane`].
    pub lane: Point,
    pub conveyor: ConveyorId,
    pub next: Option<BeltId>,
    pub sorter: bool,
    pub items: Vec<ItemId>,
}

impl ConveyorTile {
    /// The tile this belt feeds into.
    #[inline]
    pub fn target(&self) -> Point {
        self.pos - self.direction
    }
}

/// A logical belt run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conveyor {
    pub id: ConveyorId,
    /// Members in the order they joined.
    pub belts: Vec<BeltId>,
    /// Animation phase in `0..PHASE_COUNT`.
    pub tick: u8,
    /// Items on any of this conveyor's belts.
    pub items: Vec<ItemId>,
}

impl Conveyor {
    fn new(id: ConveyorId) -> Self {
        Self {
            id,
            belts: Vec::new(),
            tick: 0,
            items: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.belts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.belts.is_empty()
    }

    pub fn contains(&self, belt: BeltId) -> bool {
        self.belts.contains(&belt)
    }
}

/// Belts and conveyors over a [`TileGrid`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConveyorGraph {
    resolution: i32,
    belts: Vec<ConveyorTile>,
    conveyors: BTreeMap<ConveyorId, Conveyor>,
    next_conveyor: u32,
}

impl ConveyorGraph {
    pub fn new(config: &BeltConfig) -> Self {
        Self {
            resolution: config.resolution.max(1),
            belts: Vec::new(),
            conveyors: BTreeMap::new(),
            next_conveyor: 0,
        }
    }

    /// Sub-cells per belt side.
    #[inline]
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    #[inline]
    pub fn belt(&self, id: BeltId) -> Option<&ConveyorTile> {
        self.belts.get(id.index())
    }

    /// The belt placed on the tile at `pos`.
    pub fn belt_at(&self, tiles: &TileGrid, pos: Point) -> Option<&ConveyorTile> {
        tiles.belt_at(pos).and_then(|id| self.belt(id))
    }

    pub fn belts(&self) -> impl Iterator<Item = &ConveyorTile> {
        self.belts.iter()
    }

    #[inline]
    pub fn belt_count(&self) -> usize {
        self.belts.len()
    }

    #[inline]
    pub fn conveyor(&self, id: ConveyorId) -> Option<&Conveyor> {
        self.conveyors.get(&id)
    }

    /// Active conveyors in id order.
    pub fn conveyors(&self) -> impl Iterator<Item = &Conveyor> {
        self.conveyors.values()
    }

    #[inline]
    pub fn conveyor_count(&self) -> usize {
        self.conveyors.len()
    }

    /// Belts reached by following `next` from `from`, `from` excluded.
    ///
    /// The walk stops at the first revisit, so it terminates even on a
    /// corrupted graph.
    pub fn downstream(&self, from: BeltId) -> Vec<BeltId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([from]);
        let mut cur = self.belt(from).and_then(|b| b.next);
        while let Some(id) = cur {
            if !seen.insert(id) {
                break;
            }
            out.push(id);
            cur = self.belt(id).and_then(|b| b.next);
        }
        out
    }

    /// Whether `goal` is `from` or lies downstream of it.
    fn reaches(&self, from: BeltId, goal: BeltId) -> bool {
        from == goal || self.downstream(from).contains(&goal)
    }

    /// Whether wiring a belt into `target` would loop back into one of
    /// `feeders`, the belts feeding the wired belt's tile.
    fn closes_loop(&self, target: BeltId, feeders: &[BeltId]) -> bool {
        feeders.iter().any(|&f| self.reaches(target, f))
    }

    fn conveyor_of(&self, belt: BeltId) -> Option<ConveyorId> {
        self.belt(belt).map(|b| b.conveyor)
    }

    fn new_conveyor(&mut self) -> ConveyorId {
        let id = ConveyorId(self.next_conveyor);
        self.next_conveyor += 1;
        self.conveyors.insert(id, Conveyor::new(id));
        id
    }

    /// Move every belt and item of `from` into `into` and drop `from`.
    fn absorb(&mut self, into: ConveyorId, from: ConveyorId) {
        if into == from || !self.conveyors.contains_key(&into) {
            return;
        }
        let Some(src) = self.conveyors.remove(&from) else {
            return;
        };
        for &b in &src.belts {
            if let Some(belt) = self.belts.get_mut(b.index()) {
                belt.conveyor = into;
            }
        }
        log::debug!("{into} absorbs {from} ({} belts)", src.belts.len());
        if let Some(dst) = self.conveyors.get_mut(&into) {
            dst.belts.extend(src.belts);
            dst.items.extend(src.items);
        }
    }

    /// Move `belts` (all members of `from`) and their items into `into`.
    fn transfer(&mut self, from: ConveyorId, into: ConveyorId, belts: &[BeltId]) {
        let mut moved_items = Vec::new();
        for &b in belts {
            if let Some(belt) = self.belts.get_mut(b.index()) {
                belt.conveyor = into;
                moved_items.extend(belt.items.iter().copied());
            }
        }
        if let Some(src) = self.conveyors.get_mut(&from) {
            src.belts.retain(|b| !belts.contains(b));
            src.items.retain(|i| !moved_items.contains(i));
        }
        if let Some(dst) = self.conveyors.get_mut(&into) {
            dst.belts.extend_from_slice(belts);
            dst.items.extend(moved_items);
        }
    }

    /// `belt` and every same-conveyor belt feeding into it, transitively.
    fn upstream(&self, tiles: &TileGrid, belt: BeltId, conveyor: ConveyorId) -> Vec<BeltId> {
        let mut out = vec![belt];
        let mut seen = HashSet::from([belt]);
        let mut queue = VecDeque::from([belt]);
        while let Some(b) = queue.pop_front() {
            let Some(pos) = self.belt(b).map(|b| b.pos) else {
                continue;
            };
            let Some(tile) = tiles.get(pos) else {
                continue;
            };
            for &u in &tile.inbound {
                if self.conveyor_of(u) == Some(conveyor) && seen.insert(u) {
                    out.push(u);
                    queue.push_back(u);
                }
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Place a belt at `pos` facing `direction`.
    ///
    /// The belt feeds the tile at `pos - direction`. It joins the conveyor of
    /// the earliest-attached belt feeding `pos` if there is one, otherwise the
    /// conveyor of the belt it feeds, otherwise a new conveyor. When both
    /// exist the two conveyors merge. Wiring into a belt whose downstream
    /// run leads back to `pos` is refused.
    pub fn place(
        &mut self,
        tiles: &mut TileGrid,
        pos: Point,
        direction: Point,
    ) -> Result<BeltId, BeltError> {
        if !ROTATION.contains(&direction) {
            return Err(BeltError::InvalidDirection(direction));
        }
        let tile = tiles.get(pos).ok_or(BeltError::OutOfBounds(pos))?;
        if !tile.passable {
            return Err(BeltError::Impassable(pos));
        }
        if tile.belt.is_some() {
            return Err(BeltError::Occupied(pos));
        }
        let inbound = tile.inbound.clone();

        let target_pos = pos - direction;
        let target_belt = tiles.belt_at(target_pos);
        let target = target_belt.filter(|&t| !self.closes_loop(t, &inbound));
        if let (Some(t), None) = (target_belt, target) {
            log::warn!("not wiring new belt at {pos} into {t}: it would close a loop");
        }

        let joined = inbound
            .first()
            .and_then(|&b| self.conveyor_of(b))
            .or_else(|| target.and_then(|t| self.conveyor_of(t)));
        let conveyor = match joined {
            Some(c) => c,
            None => self.new_conveyor(),
        };

        let id = BeltId(self.belts.len() as u32);
        self.belts.push(ConveyorTile {
            id,
            pos,
            direction,
            lane: direction::lane(direction, self.resolution),
            conveyor,
            next: target,
            sorter: false,
            items: Vec::new(),
        });
        if let Some(c) = self.conveyors.get_mut(&conveyor) {
            c.belts.push(id);
        }
        for &b in &inbound {
            if let Some(belt) = self.belts.get_mut(b.index()) {
                belt.next = Some(id);
            }
        }
        if !inbound.is_empty() {
            if let Some(tc) = target.and_then(|t| self.conveyor_of(t)) {
                self.absorb(conveyor, tc);
            }
        }

        if let Some(t) = tiles.get_mut(pos) {
            t.belt = Some(id);
            t.role = TileRole::Conveyor;
        }
        if target_belt.is_none() || target.is_some() {
            if let Some(t) = tiles.get_mut(target_pos) {
                t.inbound.push(id);
            }
        }

        log::debug!(
            "placed {id} at {pos} facing {direction} in {conveyor} ({} inbound, feeds {})",
            inbound.len(),
            target.map_or_else(|| "nothing".to_string(), |t| t.to_string())
        );
        Ok(id)
    }

    /// Rotate the belt at `pos` to the next cardinal direction and rewire
    /// it. Returns the new direction.
    ///
    /// The belt and everything upstream of it on its conveyor split off into
    /// a new conveyor unless that is the whole conveyor. If the new target
    /// tile has a belt with no other feeders, the rotated run merges into its
    /// conveyor.
    pub fn rotate(&mut self, tiles: &mut TileGrid, pos: Point) -> Result<Point, BeltError> {
        let id = tiles.belt_at(pos).ok_or(BeltError::NoBelt(pos))?;
        let Some(belt) = self.belts.get_mut(id.index()) else {
            return Err(BeltError::NoBelt(pos));
        };
        let old_target = belt.target();
        let conveyor = belt.conveyor;
        let direction = direction::next_direction(belt.direction);
        belt.next = None;
        if let Some(t) = tiles.get_mut(old_target) {
            t.inbound.retain(|&b| b != id);
        }

        let upstream = self.upstream(tiles, id, conveyor);
        let total = self.conveyor(conveyor).map_or(0, Conveyor::len);
        if upstream.len() < total {
            let split = self.new_conveyor();
            self.transfer(conveyor, split, &upstream);
            log::debug!(
                "split {} belts off {conveyor} into {split} at {pos}",
                upstream.len()
            );
        }

        let resolution = self.resolution;
        if let Some(belt) = self.belts.get_mut(id.index()) {
            belt.direction = direction;
            belt.lane = direction::lane(direction, resolution);
        }

        let target_pos = pos - direction;
        let Some((target_belt, unfed)) = tiles
            .get(target_pos)
            .map(|t| (t.belt, t.inbound.is_empty()))
        else {
            log::debug!("rotated {id} at {pos} to {direction}, facing off-grid");
            return Ok(direction);
        };
        match target_belt {
            Some(t) if self.reaches(t, id) => {
                log::warn!("not wiring {id} into {t}: it would close a loop");
            }
            Some(t) => {
                if let Some(belt) = self.belts.get_mut(id.index()) {
                    belt.next = Some(t);
                }
                if unfed {
                    if let (Some(into), Some(from)) = (self.conveyor_of(t), self.conveyor_of(id)) {
                        self.absorb(into, from);
                    }
                }
                if let Some(tile) = tiles.get_mut(target_pos) {
                    tile.inbound.push(id);
                }
            }
            None => {
                if let Some(tile) = tiles.get_mut(target_pos) {
                    tile.inbound.push(id);
                }
            }
        }
        log::debug!("rotated {id} at {pos} to {direction}");
        Ok(direction)
    }

    /// Flag or unflag the belt at `pos` as a sorter.
    pub fn set_sorter(
        &mut self,
        tiles: &TileGrid,
        pos: Point,
        sorter: bool,
    ) -> Result<(), BeltError> {
        let id = tiles.belt_at(pos).ok_or(BeltError::NoBelt(pos))?;
        let belt = self
            .belts
            .get_mut(id.index())
            .ok_or(BeltError::NoBelt(pos))?;
        belt.sorter = sorter;
        Ok(())
    }

    /// Lay belts along a 4-connected path so items flow from its first
    /// coordinate to its last.
    ///
    /// The last belt keeps the direction of the final step. If the last
    /// coordinate already holds a belt, the new run feeds into it instead.
    /// Every coordinate is validated before anything is placed. Returns the
    /// new belts in path order.
    pub fn lay_path(
        &mut self,
        tiles: &mut TileGrid,
        path: &[Point],
    ) -> Result<Vec<BeltId>, BeltError> {
        if path.len() < 2 || path.windows(2).any(|w| !(w[0] - w[1]).is_cardinal()) {
            return Err(BeltError::InvalidPath);
        }
        let mut seen = HashSet::new();
        if !path.iter().all(|p| seen.insert(*p)) {
            return Err(BeltError::InvalidPath);
        }
        let last = path.len() - 1;
        let join_last = tiles.belt_at(path[last]).is_some();
        for (i, &p) in path.iter().enumerate() {
            if i == last && join_last {
                continue;
            }
            let tile = tiles.get(p).ok_or(BeltError::OutOfBounds(p))?;
            if !tile.passable {
                return Err(BeltError::Impassable(p));
            }
            if tile.belt.is_some() {
                return Err(BeltError::Occupied(p));
            }
        }

        let mut placed = Vec::with_capacity(path.len());
        for i in 0..path.len() {
            if i == last && join_last {
                continue;
            }
            let direction = if i == last {
                path[i - 1] - path[i]
            } else {
                path[i] - path[i + 1]
            };
            placed.push(self.place(tiles, path[i], direction)?);
        }
        log::debug!("laid {} belts from {} to {}", placed.len(), path[0], path[last]);
        Ok(placed)
    }

    /// Forced next hops for the solver: each wired belt's position maps to
    /// the position of its `next` belt.
    pub fn target_map(&self) -> TargetMap {
        self.belts
            .iter()
            .filter_map(|b| {
                let next = self.belt(b.next?)?;
                Some((b.pos, vec![next.pos]))
            })
            .collect()
    }

    /// Advance every conveyor's animation phase.
    pub fn advance_phase(&mut self) {
        for c in self.conveyors.values_mut() {
            c.tick = (c.tick + 1) % PHASE_COUNT;
        }
    }

    // -----------------------------------------------------------------------
    // Item bookkeeping
    // -----------------------------------------------------------------------

    pub(crate) fn attach_item(&mut self, belt: BeltId, item: ItemId) {
        let Some(b) = self.belts.get_mut(belt.index()) else {
            return;
        };
        b.items.push(item);
        let conveyor = b.conveyor;
        if let Some(c) = self.conveyors.get_mut(&conveyor) {
            c.items.push(item);
        }
    }

    pub(crate) fn detach_item(&mut self, belt: BeltId, item: ItemId) {
        let Some(b) = self.belts.get_mut(belt.index()) else {
            return;
        };
        b.items.retain(|&i| i != item);
        let conveyor = b.conveyor;
        if let Some(c) = self.conveyors.get_mut(&conveyor) {
            c.items.retain(|&i| i != item);
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Verify every graph invariant against `tiles`.
    pub fn check_consistency(&self, tiles: &TileGrid) -> Result<(), GraphInconsistency> {
        for tile in tiles.iter() {
            if let Some(b) = tile.belt {
                if self.belt(b).is_none_or(|belt| belt.pos != tile.pos) {
                    return Err(GraphInconsistency::TileOwnership { pos: tile.pos, belt: b });
                }
                if !tile.passable {
                    return Err(GraphInconsistency::BeltOnWall { pos: tile.pos, belt: b });
                }
            }
            for &b in &tile.inbound {
                let ok = self
                    .belt(b)
                    .is_some_and(|belt| belt.target() == tile.pos && belt.next == tile.belt);
                if !ok {
                    return Err(GraphInconsistency::DanglingInbound { pos: tile.pos, belt: b });
                }
            }
        }

        let mut members = HashSet::new();
        for c in self.conveyors.values() {
            if c.is_empty() {
                return Err(GraphInconsistency::EmptyConveyor(c.id));
            }
            if let Some(&b) = c.belts.iter().find(|&&b| !members.insert(b)) {
                return Err(GraphInconsistency::Membership { belt: b, conveyor: c.id });
            }
            let mut cached = c.items.clone();
            let mut actual = Vec::new();
            for &b in &c.belts {
                let Some(belt) = self.belt(b).filter(|belt| belt.conveyor == c.id) else {
                    return Err(GraphInconsistency::Membership { belt: b, conveyor: c.id });
                };
                actual.extend(belt.items.iter().copied());
            }
            cached.sort();
            actual.sort();
            if cached != actual {
                return Err(GraphInconsistency::ItemCache(c.id));
            }
        }

        for belt in &self.belts {
            if tiles.belt_at(belt.pos) != Some(belt.id) {
                return Err(GraphInconsistency::TileOwnership { pos: belt.pos, belt: belt.id });
            }
            if self.conveyor(belt.conveyor).is_none_or(|c| !c.contains(belt.id)) {
                return Err(GraphInconsistency::Membership {
                    belt: belt.id,
                    conveyor: belt.conveyor,
                });
            }
            if let Some(target) = tiles.get(belt.target()) {
                let listed = target.inbound.contains(&belt.id);
                let ok = match (belt.next, target.belt) {
                    (Some(n), Some(t)) => n == t && listed,
                    (Some(_), None) => false,
                    (None, Some(_)) => !listed,
                    (None, None) => listed || belt.direction.is_zero(),
                };
                if !ok {
                    return Err(GraphInconsistency::NextMismatch(belt.id));
                }
            } else if belt.next.is_some() {
                return Err(GraphInconsistency::NextMismatch(belt.id));
            }
            if self.loops(belt.id) {
                return Err(GraphInconsistency::Cycle(belt.id));
            }
        }
        Ok(())
    }

    /// Whether the `next` chain from `from` ever revisits a belt.
    fn loops(&self, from: BeltId) -> bool {
        let walk = self.downstream(from);
        let end = walk.last().copied().unwrap_or(from);
        self.belt(end).and_then(|b| b.next).is_some()
    }
}
