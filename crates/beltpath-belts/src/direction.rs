//! Belt directions and lanes.
//!
//! A belt's direction points *away* from the tile it feeds: the target of a
//! belt at `p` with direction `d` is `p - d`, and items on it move by `-d`.

use beltpath_core::Point;

/// Number of animation phases a conveyor cycles through.
pub const PHASE_COUNT: u8 = 8;

/// The four cardinal directions in rotation order.
pub const ROTATION: [Point; 4] = [
    Point::new(1, 0),
    Point::new(0, 1),
    Point::new(-1, 0),
    Point::new(0, -1),
];

/// The direction after one clockwise rotation step. Anything that is not a
/// cardinal unit vector, zero included, rotates to `(1, 0)`.
pub fn next_direction(dir: Point) -> Point {
    match ROTATION.iter().position(|&d| d == dir) {
        Some(i) => ROTATION[(i + 1) % ROTATION.len()],
        None => ROTATION[0],
    }
}

/// Perpendicular sub-cell offsets marking the inside track of a belt with
/// direction `dir` and `n` sub-cells per side. `-1` means "no constraint on
/// this axis".
pub fn lane(dir: Point, n: i32) -> Point {
    if dir.x > 0 {
        Point::new(-1, n - 1)
    } else if dir.x < 0 {
        Point::new(-1, 0)
    } else if dir.y > 0 {
        Point::new(0, -1)
    } else if dir.y < 0 {
        Point::new(n - 1, -1)
    } else {
        Point::new(-1, -1)
    }
}

/// Whether `sub` lies on the inside track of `lane`.
#[inline]
pub fn on_lane(sub: Point, lane: Point) -> bool {
    sub.x == lane.x || sub.y == lane.y
}

/// Whether `sub` lies on the outside track of `lane`.
#[inline]
pub fn on_outer_lane(sub: Point, lane: Point, n: i32) -> bool {
    sub.x == n - lane.x - 1 || sub.y == n - lane.y - 1
}
