//! Concurrent writer: a cloneable, shared-write facade over the three
//! tables a [`crate::grid::SpatialHash`] owns (§4.E).
//!
//! The source shares one mutable struct across worker threads behind a
//! raw pointer, guarded only by an external convention ("the safety
//! handle"). Here the tables already live behind `Arc<DashMap<...>>`,
//! so `ConcurrentWriter` is just a bundle of `Arc` clones, a cloned
//! `Arc<AtomicU32>` for the id counter, and a copy of the fixed world
//! geometry — ownership and `Send`/`Sync` auto-traits do the
//! enforcement the safety handle did dynamically. World bounds and
//! cell size never change after construction (§1 non-goals: no
//! dynamic world bounds), so copying them into the handle at
//! `to_concurrent()` time is exact for the handle's whole lifetime.

use crate::aabb::Aabb;
use crate::error::SpatialGridError;
use crate::grid::{insert_id_into_bucket, BoundsMap, BucketMap, ItemMap};
use crate::item::{ItemId, SpatialItem};
use glam::{IVec3, Vec3};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared-write handle. Supports only `try_add`/`add_fast` — no
/// removes, no queries, no resizes (§4.E, §5).
#[derive(Clone)]
pub struct ConcurrentWriter<T: SpatialItem> {
    pub(crate) buckets: Arc<BucketMap>,
    pub(crate) id_to_bounds: Arc<BoundsMap>,
    pub(crate) id_to_item: Arc<ItemMap<T>>,
    pub(crate) next_id: Arc<AtomicU32>,
    pub(crate) capacity_budget: Arc<AtomicUsize>,
    pub(crate) world_bounds: Aabb,
    pub(crate) cell_size: Vec3,
}

impl<T: SpatialItem + Clone> ConcurrentWriter<T> {
    /// Atomically increment the id counter, write the new id into
    /// `item`, reserve headroom from the capacity budget the owning
    /// grid set via `prepare_free_place`, and append into every
    /// overlapping cell bucket.
    ///
    /// Returns `false` (without touching any table) when the capacity
    /// budget is exhausted — the caller must finish the current tick,
    /// grow capacity on the exclusive handle, and retry.
    pub fn try_add(&self, item: &mut T) -> bool {
        if !Self::try_reserve_one(&self.capacity_budget) {
            return false;
        }

        let raw = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = ItemId::new(raw);
        item.set_spatial_hashing_index(id);

        let bounds = self.clamped_bounds_for(item.center(), item.size());
        self.id_to_bounds.insert(id, bounds);
        self.id_to_item.insert(id, item.clone());
        self.insert_into_buckets(id, &bounds);
        true
    }

    /// Same as `try_add`, but surfaces capacity exhaustion as a
    /// `SpatialGridError::CapacityExhausted` instead of a bare `bool`,
    /// for callers that would rather propagate with `?` than branch on
    /// a boolean (§7, §11). `requested` is always `1`: one reservation
    /// per call; `available` is the budget observed at the failed
    /// compare-exchange, which is always `0` since `try_reserve_one`
    /// only fails once the budget is drained.
    pub fn try_add_checked(&self, item: &mut T) -> std::result::Result<(), SpatialGridError> {
        if self.try_add(item) {
            Ok(())
        } else {
            Err(SpatialGridError::CapacityExhausted {
                requested: 1,
                available: self.capacity_budget.load(Ordering::Relaxed),
            })
        }
    }

    /// Re-place an item under its existing id, recomputing bounds from
    /// its current `center()`/`size()`. Used as the parallel second
    /// half of a move whose first half was a serial `remove_fast` on
    /// the exclusive handle (§4.F): the id counter and capacity budget
    /// are untouched, only the reverse tables and buckets change.
    pub fn add_fast(&self, item: &mut T) {
        let id = match item.spatial_hashing_index() {
            Some(id) => id,
            None => {
                debug_assert!(
                    false,
                    "add_fast requires an item with an existing id (illegal Absent -> Present(fast) transition)"
                );
                return;
            }
        };
        let bounds = self.clamped_bounds_for(item.center(), item.size());
        self.id_to_bounds.insert(id, bounds);
        self.id_to_item.insert(id, item.clone());
        self.insert_into_buckets(id, &bounds);
    }

    #[inline]
    fn clamped_bounds_for(&self, center: Vec3, full_size: Vec3) -> Aabb {
        let mut bounds = Aabb::from_center_extents(center, full_size * 0.5);
        bounds.clamp(&self.world_bounds);
        bounds
    }

    fn insert_into_buckets(&self, id: ItemId, bounds: &Aabb) {
        let start = crate::math::floor_to_i3((bounds.min() - self.world_bounds.min()) / self.cell_size);
        let end = crate::math::ceil_to_i3((bounds.max() - self.world_bounds.min()) / self.cell_size);
        for x in start.x..end.x {
            for y in start.y..end.y {
                for z in start.z..end.z {
                    insert_id_into_bucket(&self.buckets, IVec3::new(x, y, z), id);
                }
            }
        }
    }

    fn try_reserve_one(budget: &AtomicUsize) -> bool {
        let mut current = budget.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            match budget.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}
