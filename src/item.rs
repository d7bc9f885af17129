//! The item identity and the capability trait `T` must provide.

use glam::Vec3;
use std::num::NonZeroU32;

/// A 32-bit monotonically increasing, never-reused item identity.
///
/// Assigned by the grid at insert time and written back into the
/// caller's item record (see [`SpatialItem::set_spatial_hashing_index`])
/// so later `remove`/`move_item` calls don't need to re-search for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(NonZeroU32);

impl ItemId {
    #[inline]
    pub(crate) fn new(raw: u32) -> Self {
        Self(NonZeroU32::new(raw).expect("item id counter must never emit zero"))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capabilities an item payload `T` must provide so the grid can place,
/// re-place, and identify it without the caller re-supplying bounds on
/// every call.
///
/// Equality and hashing are used by the orchestrator, not by the core
/// itself — they're required here only so `T: Eq + Hash` callers
/// (component stores keyed by item) can use this trait's bound
/// directly instead of stacking a second one.
pub trait SpatialItem: Eq + std::hash::Hash {
    /// World-space centre of the item's bounds.
    fn center(&self) -> Vec3;

    /// World-space full extents (size, not half-extents) of the item's bounds.
    fn size(&self) -> Vec3;

    /// Current `ItemId`, or `None` if the item has never been inserted.
    fn spatial_hashing_index(&self) -> Option<ItemId>;

    /// Called by the grid immediately after assigning an id.
    fn set_spatial_hashing_index(&mut self, id: ItemId);
}
