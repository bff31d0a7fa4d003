use beltpath_core::Point;

/// Cost of one orthogonal step.
pub const ORTHOGONAL_COST: i32 = 10;

/// Cost of one diagonal step (≈ 10·√2, kept integral).
pub const DIAGONAL_COST: i32 = 14;

/// Manhattan (L1) distance between two points.
#[inline]
pub fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Cost of a single step from `a` to `b`: orthogonal when the two points
/// are Manhattan-adjacent, diagonal otherwise.
#[inline]
pub fn step_cost(a: Point, b: Point) -> i32 {
    if manhattan(a, b) > 1 {
        DIAGONAL_COST
    } else {
        ORTHOGONAL_COST
    }
}

/// Summed step cost along a path.
pub fn path_cost(path: &[Point]) -> i32 {
    path.windows(2).map(|w| step_cost(w[0], w[1])).sum()
}
