use std::fmt;

use beltpath_core::{BeltId, Point};

/// Handle of an item. Ids are issued in spawn order and never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// An item riding the belts.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: ItemId,
    /// Sub-cell position on the current belt, each axis in `0..resolution`.
    pub sub: Point,
    pub belt: BeltId,
    /// Last movement vector; subtracted from `sub` on every step.
    pub inertia: Point,
    /// Whether the item travels on the inside track.
    pub left: bool,
    /// `left` as it was at spawn.
    pub original_left: bool,
}
