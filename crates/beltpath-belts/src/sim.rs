//! Tick-driven item movement.
//!
//! Every tick advances the conveyor phases and then moves each item once,
//! in spawn order. An item moves by subtracting its inertia from its
//! sub-cell position; leaving the sub-grid wraps it to the opposite edge of
//! the next belt. Collisions are resolved first come, first served: an item
//! whose destination sub-cell is taken waits for the next tick.

use std::collections::BTreeMap;

use beltpath_core::{BeltId, Point, TileGrid};
use rand::{Rng, RngExt};

use crate::config::BeltConfig;
use crate::direction::{on_lane, on_outer_lane};
use crate::error::BeltError;
use crate::graph::{ConveyorGraph, ConveyorTile};
use crate::item::{Item, ItemId};

/// What happened during one [`Simulation::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub moved: usize,
    /// Items that stayed put because their destination was occupied.
    pub blocked: usize,
    /// Items removed at a dead end.
    pub deleted: usize,
}

/// A candidate move.
#[derive(Clone, Copy, Debug)]
struct Step {
    sub: Point,
    belt: Option<BeltId>,
    inertia: Point,
}

/// Project `sub` by `-inertia` on an `n`-wide sub-grid. Staying inside keeps
/// the item on `here`; leaving wraps it onto `over`.
fn project(sub: Point, inertia: Point, n: i32, here: BeltId, over: Option<BeltId>) -> Step {
    let p = sub - inertia;
    let (sub, belt) = if p.x < 0 {
        (Point::new(n - 1, p.y), over)
    } else if p.x >= n {
        (Point::new(0, p.y), over)
    } else if p.y < 0 {
        (Point::new(p.x, n - 1), over)
    } else if p.y >= n {
        (Point::new(p.x, 0), over)
    } else {
        (p, Some(here))
    };
    Step { sub, belt, inertia }
}

/// The move an item makes by following its belt.
///
/// Items keep their previous inertia until they reach their track: the
/// inside track for left-side items, the outside one otherwise.
fn standard_step(item: &Item, belt: &ConveyorTile, n: i32) -> Step {
    let turned = if item.left {
        on_lane(item.sub, belt.lane)
    } else {
        on_outer_lane(item.sub, belt.lane, n)
    };
    let inertia = if turned { belt.direction } else { item.inertia };
    project(item.sub, inertia, n, belt.id, belt.next)
}

/// Items on the belts, plus the rules that move them.
#[derive(Clone, Debug, Default)]
pub struct Simulation {
    config: BeltConfig,
    items: BTreeMap<ItemId, Item>,
    next_id: u64,
}

impl Simulation {
    pub fn new(config: BeltConfig) -> Self {
        Self {
            config,
            items: BTreeMap::new(),
            next_id: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &BeltConfig {
        &self.config
    }

    #[inline]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Items in spawn order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether an item other than `except` sits at `sub` on `belt`.
    fn occupied(
        &self,
        graph: &ConveyorGraph,
        belt: BeltId,
        sub: Point,
        except: Option<ItemId>,
    ) -> bool {
        graph.belt(belt).is_some_and(|b| {
            b.items
                .iter()
                .filter(|&&i| Some(i) != except)
                .filter_map(|i| self.items.get(i))
                .any(|i| i.sub == sub)
        })
    }

    fn insert(&mut self, graph: &mut ConveyorGraph, belt: &ConveyorTile, sub: Point) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        let left = on_lane(sub, belt.lane);
        self.items.insert(
            id,
            Item {
                id,
                sub,
                belt: belt.id,
                inertia: belt.direction,
                left,
                original_left: left,
            },
        );
        graph.attach_item(belt.id, id);
        log::trace!("spawned {id} on {} at {sub}", belt.id);
        id
    }

    fn remove(&mut self, graph: &mut ConveyorGraph, id: ItemId, belt: BeltId) {
        graph.detach_item(belt, id);
        self.items.remove(&id);
        log::trace!("deleted {id} at the end of {belt}");
    }

    /// Put an item on the belt at `pos`, at sub-cell `sub`.
    pub fn spawn_item(
        &mut self,
        graph: &mut ConveyorGraph,
        tiles: &TileGrid,
        pos: Point,
        sub: Point,
    ) -> Result<ItemId, BeltError> {
        let belt = graph.belt_at(tiles, pos).ok_or(BeltError::NoBelt(pos))?.clone();
        let n = graph.resolution();
        if !(0..n).contains(&sub.x) || !(0..n).contains(&sub.y) {
            return Err(BeltError::SubCellOutOfRange(sub));
        }
        if self.occupied(graph, belt.id, sub, None) {
            return Err(BeltError::SubCellOccupied { pos, sub });
        }
        Ok(self.insert(graph, &belt, sub))
    }

    /// Maybe drop an item onto the first belt of a random conveyor.
    ///
    /// Nothing happens when the roll fails, the item cap is reached, or the
    /// chosen belt is occupied or leads nowhere. The item lands in a random
    /// corner sub-cell.
    pub fn spawn_random_item(
        &mut self,
        graph: &mut ConveyorGraph,
        rng: &mut impl Rng,
    ) -> Option<ItemId> {
        if graph.conveyor_count() == 0 || self.items.len() >= self.config.max_items {
            return None;
        }
        let roll: f64 = rng.random();
        if roll > self.config.spawn_chance {
            return None;
        }
        let pick = rng.random_range(0..graph.conveyor_count());
        let first = *graph.conveyors().nth(pick)?.belts.first()?;
        let belt = graph.belt(first)?.clone();
        if !belt.items.is_empty() || belt.next.is_none() {
            return None;
        }
        let n = graph.resolution();
        let x = if rng.random_bool(0.5) { 0 } else { n - 1 };
        let y = if rng.random_bool(0.5) { 0 } else { n - 1 };
        Some(self.insert(graph, &belt, Point::new(x, y)))
    }

    /// The sideways hand-off from a sorter belt onto the single adjacent
    /// belt of another conveyor, if there is exactly one and the landing
    /// sub-cell is free.
    fn sorter_step(
        &self,
        graph: &ConveyorGraph,
        tiles: &TileGrid,
        item: &Item,
        belt: &ConveyorTile,
        n: i32,
    ) -> Option<Step> {
        if !belt.sorter {
            return None;
        }
        let mut foreign = belt
            .pos
            .neighbors_4()
            .into_iter()
            .filter_map(|q| graph.belt_at(tiles, q))
            .filter(|nb| nb.conveyor != belt.conveyor);
        let target = foreign.next()?;
        if foreign.next().is_some() {
            return None;
        }
        let step = project(item.sub, belt.pos - target.pos, n, belt.id, Some(target.id));
        if self.occupied(graph, step.belt?, step.sub, Some(item.id)) {
            return None;
        }
        log::trace!("sorter {} hands {} to {}", belt.id, item.id, target.id);
        Some(step)
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, graph: &mut ConveyorGraph, tiles: &TileGrid) -> TickReport {
        graph.advance_phase();
        let n = graph.resolution();
        let mut report = TickReport::default();

        let ids: Vec<ItemId> = self.items.keys().copied().collect();
        for id in ids {
            let Some(item) = self.items.get(&id).cloned() else {
                continue;
            };
            let Some(belt) = graph.belt(item.belt) else {
                self.remove(graph, id, item.belt);
                report.deleted += 1;
                continue;
            };
            let step = self
                .sorter_step(graph, tiles, &item, belt, n)
                .unwrap_or_else(|| standard_step(&item, belt, n));

            let dest = step
                .belt
                .and_then(|b| graph.belt(b))
                .filter(|b| !b.direction.is_zero())
                .map(|b| (b.id, b.pos, b.lane));
            let Some((dest, dest_pos, dest_lane)) = dest else {
                self.remove(graph, id, item.belt);
                report.deleted += 1;
                continue;
            };

            if let Some(it) = self.items.get_mut(&id) {
                it.inertia = step.inertia;
            }
            if self.occupied(graph, dest, step.sub, Some(id)) {
                report.blocked += 1;
                continue;
            }

            let changed = dest != item.belt;
            if changed {
                graph.detach_item(item.belt, id);
                graph.attach_item(dest, id);
            }
            let merge = changed && tiles.get(dest_pos).is_some_and(|t| t.inbound.len() > 1);
            if let Some(it) = self.items.get_mut(&id) {
                it.sub = step.sub;
                it.belt = dest;
                if merge {
                    it.left = on_lane(step.sub, dest_lane);
                }
            }
            report.moved += 1;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const RIGHT: Point = Point::new(1, 0);
    const DOWN: Point = Point::new(0, 1);
    const UP: Point = Point::new(0, -1);

    fn spawn(
        sim: &mut Simulation,
        g: &mut ConveyorGraph,
        tiles: &TileGrid,
        pos: (i32, i32),
        sub: (i32, i32),
    ) -> ItemId {
        let (pos, sub) = (Point::new(pos.0, pos.1), Point::new(sub.0, sub.1));
        sim.spawn_item(g, tiles, pos, sub).unwrap()
    }

    fn setup(w: i32, h: i32) -> (TileGrid, ConveyorGraph, Simulation) {
        let config = BeltConfig::default();
        (
            TileGrid::new(w, h),
            ConveyorGraph::new(&config),
            Simulation::new(config),
        )
    }

    #[test]
    fn item_steps_against_belt_direction_and_wraps() {
        let (mut tiles, mut g, mut sim) = setup(5, 5);
        let first = g.place(&mut tiles, Point::new(2, 2), DOWN).unwrap();
        let second = g.place(&mut tiles, Point::new(2, 1), DOWN).unwrap();
        let id = spawn(&mut sim, &mut g, &tiles, (2, 2), (0, 1));

        let r = sim.tick(&mut g, &tiles);
        assert_eq!(r.moved, 1);
        assert_eq!(sim.item(id).unwrap().sub, Point::new(0, 0));
        assert_eq!(sim.item(id).unwrap().belt, first);

        sim.tick(&mut g, &tiles);
        let item = sim.item(id).unwrap();
        assert_eq!(item.sub, Point::new(0, 1));
        assert_eq!(item.belt, second);
        assert_eq!(g.belt(second).unwrap().items, vec![id]);
        assert!(g.belt(first).unwrap().items.is_empty());
        g.check_consistency(&tiles).unwrap();
    }

    #[test]
    fn dead_end_deletes_item() {
        let (mut tiles, mut g, mut sim) = setup(3, 3);
        g.place(&mut tiles, Point::new(1, 1), RIGHT).unwrap();
        spawn(&mut sim, &mut g, &tiles, (1, 1), (0, 1));
        let r = sim.tick(&mut g, &tiles);
        assert_eq!(r.deleted, 1);
        assert!(sim.is_empty());
        assert!(g.conveyors().all(|c| c.items.is_empty()));
    }

    #[test]
    fn occupied_sub_cell_blocks() {
        let (mut tiles, mut g, mut sim) = setup(4, 2);
        g.place(&mut tiles, Point::new(0, 0), RIGHT).unwrap();
        g.place(&mut tiles, Point::new(1, 0), RIGHT).unwrap();
        // The rear item moves first and runs into the front one.
        let rear = spawn(&mut sim, &mut g, &tiles, (1, 0), (1, 1));
        let front = spawn(&mut sim, &mut g, &tiles, (1, 0), (0, 1));
        let r = sim.tick(&mut g, &tiles);
        assert_eq!(r, TickReport { moved: 1, blocked: 1, deleted: 0 });
        assert_eq!(sim.item(rear).unwrap().sub, Point::new(1, 1));
        assert_eq!(sim.item(front).unwrap().sub, Point::new(1, 1));
        assert_ne!(sim.item(rear).unwrap().belt, sim.item(front).unwrap().belt);
    }

    #[test]
    fn spawn_rejects_bad_positions() {
        let (mut tiles, mut g, mut sim) = setup(3, 3);
        g.place(&mut tiles, Point::new(1, 1), RIGHT).unwrap();
        assert_eq!(
            sim.spawn_item(&mut g, &tiles, Point::new(0, 0), Point::ZERO),
            Err(BeltError::NoBelt(Point::new(0, 0)))
        );
        assert_eq!(
            sim.spawn_item(&mut g, &tiles, Point::new(1, 1), Point::new(2, 0)),
            Err(BeltError::SubCellOutOfRange(Point::new(2, 0)))
        );
        spawn(&mut sim, &mut g, &tiles, (1, 1), (0, 0));
        assert!(matches!(
            sim.spawn_item(&mut g, &tiles, Point::new(1, 1), Point::ZERO),
            Err(BeltError::SubCellOccupied { .. })
        ));
        assert_eq!(sim.len(), 1);
    }

    #[test]
    fn sides_follow_lanes() {
        let (mut tiles, mut g, mut sim) = setup(3, 3);
        g.place(&mut tiles, Point::new(1, 1), RIGHT).unwrap();
        let inside = spawn(&mut sim, &mut g, &tiles, (1, 1), (0, 1));
        let outside = spawn(&mut sim, &mut g, &tiles, (1, 1), (0, 0));
        assert!(sim.item(inside).unwrap().left);
        assert!(!sim.item(outside).unwrap().left);
    }

    #[test]
    fn merge_point_recomputes_side() {
        let (mut tiles, mut g, mut sim) = setup(5, 5);
        g.place(&mut tiles, Point::new(3, 2), RIGHT).unwrap();
        g.place(&mut tiles, Point::new(2, 3), DOWN).unwrap();
        let center = g.place(&mut tiles, Point::new(2, 2), RIGHT).unwrap();
        let id = spawn(&mut sim, &mut g, &tiles, (2, 3), (1, 0));
        assert!(!sim.item(id).unwrap().left);

        sim.tick(&mut g, &tiles);
        let item = sim.item(id).unwrap();
        assert_eq!(item.belt, center);
        assert_eq!(item.sub, Point::new(1, 1));
        assert!(item.left);
        assert!(!item.original_left);
        g.check_consistency(&tiles).unwrap();
    }

    #[test]
    fn sorter_hands_items_sideways() {
        let (mut tiles, mut g, mut sim) = setup(5, 5);
        for x in 1..4 {
            g.place(&mut tiles, Point::new(x, 1), RIGHT).unwrap();
        }
        let side = g.place(&mut tiles, Point::new(2, 2), UP).unwrap();
        g.set_sorter(&tiles, Point::new(2, 1), true).unwrap();
        let id = spawn(&mut sim, &mut g, &tiles, (2, 1), (0, 1));

        sim.tick(&mut g, &tiles);
        let item = sim.item(id).unwrap();
        assert_eq!(item.belt, side);
        assert_eq!(item.sub, Point::new(0, 0));
        assert_eq!(item.inertia, Point::new(0, -1));
        g.check_consistency(&tiles).unwrap();
    }

    #[test]
    fn blocked_sorter_falls_back_to_belt() {
        let (mut tiles, mut g, mut sim) = setup(5, 5);
        for x in 1..4 {
            g.place(&mut tiles, Point::new(x, 1), RIGHT).unwrap();
        }
        g.place(&mut tiles, Point::new(2, 2), UP).unwrap();
        g.set_sorter(&tiles, Point::new(2, 1), true).unwrap();
        let id = spawn(&mut sim, &mut g, &tiles, (2, 1), (0, 1));
        spawn(&mut sim, &mut g, &tiles, (2, 2), (0, 0));

        sim.tick(&mut g, &tiles);
        let item = sim.item(id).unwrap();
        assert_eq!(item.belt, g.belt_at(&tiles, Point::new(1, 1)).unwrap().id);
        assert_eq!(item.sub, Point::new(1, 1));
    }

    #[test]
    fn sorter_with_two_foreign_neighbors_keeps_belt_direction() {
        let (mut tiles, mut g, mut sim) = setup(5, 5);
        for x in 1..4 {
            g.place(&mut tiles, Point::new(x, 2), RIGHT).unwrap();
        }
        // Two separate conveyors beside the sorter, neither wired to it.
        g.place(&mut tiles, Point::new(2, 1), RIGHT).unwrap();
        g.place(&mut tiles, Point::new(2, 3), RIGHT).unwrap();
        assert_eq!(g.conveyor_count(), 3);
        g.set_sorter(&tiles, Point::new(2, 2), true).unwrap();
        let id = spawn(&mut sim, &mut g, &tiles, (2, 2), (0, 1));

        sim.tick(&mut g, &tiles);
        let item = sim.item(id).unwrap();
        assert_eq!(item.belt, g.belt_at(&tiles, Point::new(1, 2)).unwrap().id);
        assert_eq!(item.sub, Point::new(1, 1));
        assert_eq!(item.inertia, RIGHT);
        g.check_consistency(&tiles).unwrap();
    }

    #[test]
    fn random_spawns_respect_config() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = BeltConfig {
            max_items: 1,
            spawn_chance: 1.0,
            ..BeltConfig::default()
        };
        let mut tiles = TileGrid::new(6, 3);
        let mut g = ConveyorGraph::new(&config);
        let mut sim = Simulation::new(config);
        assert_eq!(sim.spawn_random_item(&mut g, &mut rng), None);

        let path: Vec<Point> = (0..5).map(|x| Point::new(x, 1)).collect();
        let ids = g.lay_path(&mut tiles, &path).unwrap();
        let id = sim.spawn_random_item(&mut g, &mut rng).unwrap();
        let item = sim.item(id).unwrap();
        assert_eq!(item.belt, ids[0]);
        assert!([0, 1].contains(&item.sub.x) && [0, 1].contains(&item.sub.y));
        assert_eq!(sim.spawn_random_item(&mut g, &mut rng), None);

        let mut never = Simulation::new(BeltConfig {
            spawn_chance: -1.0,
            ..BeltConfig::default()
        });
        assert_eq!(never.spawn_random_item(&mut g, &mut rng), None);
    }

    #[test]
    fn items_are_conserved_except_at_dead_ends() {
        let mut rng = StdRng::seed_from_u64(11);
        let (mut tiles, mut g, mut sim) = setup(8, 8);
        // A U-turn over the top rows, a branch feeding into it and a
        // separate dead-end conveyor next to a sorter.
        let mut path: Vec<Point> = (0..8).map(|x| Point::new(x, 0)).collect();
        path.push(Point::new(7, 1));
        path.extend((0..8).rev().map(|x| Point::new(x, 2)));
        g.lay_path(&mut tiles, &path).unwrap();
        g.place(&mut tiles, Point::new(3, 4), DOWN).unwrap();
        g.place(&mut tiles, Point::new(3, 3), DOWN).unwrap();
        g.place(&mut tiles, Point::new(5, 3), UP).unwrap();
        g.place(&mut tiles, Point::new(5, 4), UP).unwrap();
        g.set_sorter(&tiles, Point::new(5, 2), true).unwrap();
        assert_eq!(g.conveyor_count(), 2);

        for _ in 0..200 {
            if rng.random_range(0..4u32) == 0 {
                let p = Point::new(rng.random_range(0..8), rng.random_range(0..5));
                let sub = Point::new(rng.random_range(0..2), rng.random_range(0..2));
                let _ = sim.spawn_item(&mut g, &tiles, p, sub);
            }
            let before = sim.len();
            let r = sim.tick(&mut g, &tiles);
            assert_eq!(sim.len(), before - r.deleted);
            assert_eq!(r.moved + r.blocked + r.deleted, before);
            g.check_consistency(&tiles).unwrap();

            let mut spots: Vec<(BeltId, Point)> = sim.items().map(|i| (i.belt, i.sub)).collect();
            spots.sort();
            spots.dedup();
            assert_eq!(spots.len(), sim.len());
            let on_belts: usize = g.belts().map(|b| b.items.len()).sum();
            assert_eq!(on_belts, sim.len());
        }
    }
}
