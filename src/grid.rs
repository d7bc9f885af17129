//! The grid index core: the three coherent tables, and the operations
//! that keep them coherent under exclusive-mode mutation (§4.D).
//!
//! Storage for all three tables lives behind `Arc<DashMap<...>>` rather
//! than plain `HashMap`s. The source shares one mutable struct across
//! threads behind a raw pointer and an external safety convention; here
//! the tables are concurrency-safe by construction, so the owning
//! handle (this struct) and the cloneable writer handle
//! ([`crate::concurrent::ConcurrentWriter`]) can both reach the same
//! storage without unsafe code. Exclusivity between "queries running"
//! and "a concurrent writer fanning out `try_add`" is a documented
//! discipline (§5), the same way the spec's "resizes forbidden in
//! shared-write" is — the type system doesn't need to enforce it
//! because nothing here is memory-unsafe if it's violated, but the
//! *results* are only meaningful under the documented discipline.

use crate::aabb::{transform_bounds, Aabb};
use crate::error::{Result, SpatialGridError};
use crate::item::{ItemId, SpatialItem};
use crate::math::hash_cell;
use crate::voxel_ray::{self, VisitResult, VoxelGrid};
use dashmap::DashMap;
use glam::{IVec3, Quat, Vec3};
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) type BucketMap = DashMap<u32, Vec<ItemId>, FxBuildHasher>;
pub(crate) type BoundsMap = DashMap<ItemId, Aabb, FxBuildHasher>;
pub(crate) type ItemMap<T> = DashMap<ItemId, T, FxBuildHasher>;

/// Uniform-grid spatial index. See module docs and spec §3/§4.D.
pub struct SpatialHash<T: SpatialItem> {
    world_bounds: Aabb,
    cell_size: Vec3,
    cell_count: IVec3,

    pub(crate) buckets: Arc<BucketMap>,
    pub(crate) id_to_bounds: Arc<BoundsMap>,
    pub(crate) id_to_item: Arc<ItemMap<T>>,
    pub(crate) next_id: Arc<AtomicU32>,
    pub(crate) capacity_budget: Arc<AtomicUsize>,

    // Scratch sets reused by `move_item`, sized to the larger of the
    // item's old/new cell ranges across calls.
    move_scratch_old: FxHashSet<IVec3>,
    move_scratch_new: FxHashSet<IVec3>,

    // Ray-cast scratch. Writing here is why `ray_cast` takes `&mut
    // self` and is documented exclusive-mode only (§5).
    ray_origin: Vec3,
    ray_direction: Vec3,
    has_hit: bool,
    hit_id: Option<ItemId>,
}

impl<T: SpatialItem + Clone> SpatialHash<T> {
    /// Construct an empty grid. Fails when `initial_size < 1` or any
    /// component of `cell_size`/`world_bounds`'s size is not strictly
    /// positive.
    pub fn new(world_bounds: Aabb, cell_size: Vec3, initial_size: usize) -> Result<Self> {
        if initial_size < 1 {
            return Err(SpatialGridError::ConfigError {
                reason: format!("initial_size must be >= 1, got {initial_size}"),
            });
        }
        if cell_size.x <= 0.0 || cell_size.y <= 0.0 || cell_size.z <= 0.0 {
            return Err(SpatialGridError::ConfigError {
                reason: format!("cell_size must be strictly positive componentwise, got {cell_size:?}"),
            });
        }
        let size = world_bounds.size();
        if size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0 {
            return Err(SpatialGridError::ConfigError {
                reason: format!("world_bounds must have strictly positive extents, got size {size:?}"),
            });
        }

        let cell_count = world_bounds.cell_count(cell_size);
        let cap = initial_size.next_power_of_two();

        Ok(Self {
            world_bounds,
            cell_size,
            cell_count,
            buckets: Arc::new(BucketMap::with_capacity_and_hasher(cap, FxBuildHasher)),
            id_to_bounds: Arc::new(BoundsMap::with_capacity_and_hasher(cap, FxBuildHasher)),
            id_to_item: Arc::new(ItemMap::<T>::with_capacity_and_hasher(cap, FxBuildHasher)),
            next_id: Arc::new(AtomicU32::new(0)),
            capacity_budget: Arc::new(AtomicUsize::new(0)),
            move_scratch_old: FxHashSet::default(),
            move_scratch_new: FxHashSet::default(),
            ray_origin: Vec3::ZERO,
            ray_direction: Vec3::ZERO,
            has_hit: false,
            hit_id: None,
        })
    }

    #[inline]
    fn clamped_bounds_for(&self, center: Vec3, full_size: Vec3) -> Aabb {
        let mut bounds = Aabb::from_center_extents(center, full_size * 0.5);
        bounds.clamp(&self.world_bounds);
        bounds
    }

    #[inline]
    fn cell_range(&self, bounds: &Aabb) -> (IVec3, IVec3) {
        let start = crate::math::floor_to_i3((bounds.min() - self.world_bounds.min()) / self.cell_size);
        let end = crate::math::ceil_to_i3((bounds.max() - self.world_bounds.min()) / self.cell_size);
        (start, end)
    }

    fn for_each_cell(start: IVec3, end: IVec3, mut f: impl FnMut(IVec3)) {
        // x outermost, then y, then z — §4.D.3, load-bearing for test order.
        for x in start.x..end.x {
            for y in start.y..end.y {
                for z in start.z..end.z {
                    f(IVec3::new(x, y, z));
                }
            }
        }
    }

    fn insert_into_buckets(&self, id: ItemId, bounds: &Aabb) {
        let (start, end) = self.cell_range(bounds);
        Self::for_each_cell(start, end, |cell| {
            insert_id_into_bucket(&self.buckets, cell, id);
        });
    }

    fn remove_from_buckets(&self, id: ItemId, bounds: &Aabb) {
        let (start, end) = self.cell_range(bounds);
        Self::for_each_cell(start, end, |cell| {
            remove_id_from_bucket(&self.buckets, cell, id);
        });
    }

    fn allocate_id(&self) -> ItemId {
        // Pre-increment: the counter starts at 0, so the first id is 1.
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        ItemId::new(raw)
    }

    /// Clamp bounds, assign a fresh id, write it back into `item`,
    /// record the tables, and insert into every cell in `[start,end)`.
    pub fn add(&self, item: &mut T) -> ItemId {
        let bounds = self.clamped_bounds_for(item.center(), item.size());
        let id = self.allocate_id();
        item.set_spatial_hashing_index(id);
        self.id_to_bounds.insert(id, bounds);
        self.id_to_item.insert(id, item.clone());
        self.insert_into_buckets(id, &bounds);
        id
    }

    /// Same as `add`, but uses the id already present in `item` and
    /// overwrites existing reverse-table entries. Used exclusively as
    /// the second half of a move whose first half was `remove_fast`.
    pub fn add_fast(&self, item: &mut T) -> ItemId {
        let id = match item.spatial_hashing_index() {
            Some(id) => id,
            None => {
                debug_assert!(
                    false,
                    "add_fast called on an item with no prior id: illegal Absent -> Present(fast) transition"
                );
                return self.add(item);
            }
        };
        let bounds = self.clamped_bounds_for(item.center(), item.size());
        self.id_to_bounds.insert(id, bounds);
        self.id_to_item.insert(id, item.clone());
        self.insert_into_buckets(id, &bounds);
        id
    }

    /// Remove an item entirely: reverse tables and every bucket entry.
    pub fn remove(&self, id: ItemId) -> Result<()> {
        let bounds = self
            .id_to_bounds
            .remove(&id)
            .map(|(_, b)| b)
            .ok_or(SpatialGridError::UnknownId { id: id.get() })?;
        self.id_to_item.remove(&id);
        self.remove_from_buckets(id, &bounds);
        Ok(())
    }

    /// Remove only from `buckets`; reverse tables are left intact so a
    /// subsequent `add_fast` can still read the cached bounds.
    pub fn remove_fast(&self, id: ItemId) -> Result<()> {
        let bounds = *self
            .id_to_bounds
            .get(&id)
            .ok_or(SpatialGridError::UnknownId { id: id.get() })?;
        self.remove_from_buckets(id, &bounds);
        Ok(())
    }

    /// Move an item to its current `center()`/`size()`, touching only
    /// the cells in the symmetric difference of its old and new ranges.
    ///
    /// Follows the older, correct two-pass variant (§9 open question):
    /// iterate old cells to remove what's no longer covered, then
    /// iterate new cells to add what's newly covered. Cells in the
    /// intersection are never touched.
    pub fn move_item(&mut self, item: &mut T) -> Result<()> {
        let id = item
            .spatial_hashing_index()
            .ok_or(SpatialGridError::UnknownId { id: 0 })?;
        let old_bounds = *self
            .id_to_bounds
            .get(&id)
            .ok_or(SpatialGridError::UnknownId { id: id.get() })?;
        let new_bounds = self.clamped_bounds_for(item.center(), item.size());

        let (old_start, old_end) = self.cell_range(&old_bounds);
        let (new_start, new_end) = self.cell_range(&new_bounds);

        self.move_scratch_old.clear();
        self.move_scratch_new.clear();
        Self::for_each_cell(old_start, old_end, |cell| {
            self.move_scratch_old.insert(cell);
        });
        Self::for_each_cell(new_start, new_end, |cell| {
            self.move_scratch_new.insert(cell);
        });

        let leaving: Vec<IVec3> = self
            .move_scratch_old
            .iter()
            .filter(|c| !self.move_scratch_new.contains(*c))
            .copied()
            .collect();
        let entering: Vec<IVec3> = self
            .move_scratch_new
            .iter()
            .filter(|c| !self.move_scratch_old.contains(*c))
            .copied()
            .collect();

        for cell in leaving {
            remove_id_from_bucket(&self.buckets, cell, id);
        }
        for cell in entering {
            insert_id_into_bucket(&self.buckets, cell, id);
        }

        self.id_to_bounds.insert(id, new_bounds);
        self.id_to_item.insert(id, item.clone());
        Ok(())
    }

    /// Empty all three tables. The id counter is not reset (§9 open
    /// question: the source only clears one table twice; all three
    /// belong here).
    pub fn clear(&self) {
        self.buckets.clear();
        self.id_to_bounds.clear();
        self.id_to_item.clear();
    }

    /// Grow table capacities so each can accept `n` more entries
    /// without rehashing, and reset the shared-write capacity budget
    /// `try_add` draws from. Must be called before deriving a
    /// [`crate::concurrent::ConcurrentWriter`] for parallel insertion.
    pub fn prepare_free_place(&mut self, n: usize) {
        let target = n.max(1).next_power_of_two();
        self.buckets.reserve(target);
        self.id_to_bounds.reserve(target);
        self.id_to_item.reserve(target);
        self.capacity_budget.store(n, Ordering::SeqCst);
    }

    pub fn get(&self, id: ItemId) -> Option<T> {
        self.id_to_item.get(&id).map(|r| r.clone())
    }

    pub fn item_count(&self) -> usize {
        self.id_to_item.len()
    }

    pub fn bucket_item_count(&self) -> usize {
        self.buckets.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    pub fn cell_count(&self) -> IVec3 {
        self.cell_count
    }

    /// True once the ray has exited the far side of the world — the
    /// *low* side (negative coordinates) is not a stop condition: a ray
    /// starting outside the world on the low side must keep walking
    /// until it either enters `[0, cell_count)` or overshoots the high
    /// side (§4.D.2, "cells whose coordinates exceed cell_count... the
    /// ray has exited the world").
    fn exceeds_world(&self, cell: IVec3) -> bool {
        cell.x >= self.cell_count.x || cell.y >= self.cell_count.y || cell.z >= self.cell_count.z
    }

    /// Emit every item whose id appears in `cell`'s bucket, deduplicated.
    pub fn query_cell(&self, cell: IVec3, out: &mut Vec<T>) {
        let mut seen = FxHashSet::default();
        if let Some(ids) = self.buckets.get(&hash_cell(cell)) {
            for &id in ids.value() {
                if seen.insert(id) {
                    if let Some(item) = self.id_to_item.get(&id) {
                        out.push(item.clone());
                    }
                }
            }
        }
    }

    /// Clamp `bounds` to the world, union the buckets of every cell in
    /// its range, then post-filter by true bounds intersection — the
    /// cell-hash match is necessary but not sufficient.
    pub fn query_aabb(&self, bounds: Aabb, out: &mut Vec<T>) {
        let mut clamped = bounds;
        clamped.clamp(&self.world_bounds);
        let (start, end) = self.cell_range(&clamped);

        let mut candidates = FxHashSet::default();
        Self::for_each_cell(start, end, |cell| {
            if let Some(ids) = self.buckets.get(&hash_cell(cell)) {
                candidates.extend(ids.value().iter().copied());
            }
        });

        for id in candidates {
            if let Some(item_bounds) = self.id_to_bounds.get(&id) {
                if item_bounds.intersects(&clamped) {
                    if let Some(item) = self.id_to_item.get(&id) {
                        out.push(item.clone());
                    }
                }
            }
        }
    }

    /// Same cell traversal as `query_aabb`, but the candidate filter is
    /// the three-short-rays-per-cell heuristic against the OBB (§9 —
    /// an accepted approximation, not a conservative test). The final
    /// post-filter is the same AABB intersection against the OBB's
    /// conservative world-aligned enclosure.
    pub fn query_obb(&self, obb: Aabb, rotation: Quat, out: &mut Vec<T>) {
        let world_aabb = {
            let mut b = transform_bounds(&obb, rotation);
            b.clamp(&self.world_bounds);
            b
        };
        let (start, end) = self.cell_range(&world_aabb);
        let expanded_obb = obb.expand_vec(self.cell_size);

        let mut candidates = FxHashSet::default();
        Self::for_each_cell(start, end, |cell| {
            if self.cell_survives_obb_test(cell, &expanded_obb, rotation) {
                if let Some(ids) = self.buckets.get(&hash_cell(cell)) {
                    candidates.extend(ids.value().iter().copied());
                }
            }
        });

        for id in candidates {
            if let Some(item_bounds) = self.id_to_bounds.get(&id) {
                if item_bounds.intersects(&world_aabb) {
                    if let Some(item) = self.id_to_item.get(&id) {
                        out.push(item.clone());
                    }
                }
            }
        }
    }

    fn cell_survives_obb_test(&self, cell: IVec3, expanded_obb: &Aabb, rotation: Quat) -> bool {
        let p = self.point_of(cell, true);
        let half = self.cell_size * 0.5;
        let mut entry = Vec3::ZERO;
        let rays = [
            (p - Vec3::new(half.x, 0.0, 0.0), Vec3::X, self.cell_size.x),
            (p - Vec3::new(0.0, half.y, 0.0), Vec3::Y, self.cell_size.y),
            (p - Vec3::new(0.0, 0.0, half.z), Vec3::Z, self.cell_size.z),
        ];
        rays.iter()
            .any(|(origin, dir, len)| expanded_obb.clip_ray_obb(*origin, *dir, *len, rotation, &mut entry))
    }

    /// Same traversal as `query_aabb`, emitting cell indices instead of items.
    pub fn query_cells_aabb(&self, bounds: Aabb, out_cells: &mut Vec<IVec3>) {
        let mut clamped = bounds;
        clamped.clamp(&self.world_bounds);
        let (start, end) = self.cell_range(&clamped);
        Self::for_each_cell(start, end, |cell| out_cells.push(cell));
    }

    /// Same traversal as `query_obb`, emitting cell indices instead of
    /// items — for callers that need the exact candidate set rather
    /// than `query_obb`'s heuristic-filtered item list.
    pub fn query_cells_obb(&self, obb: Aabb, rotation: Quat, out_cells: &mut Vec<IVec3>) {
        let world_aabb = {
            let mut b = transform_bounds(&obb, rotation);
            b.clamp(&self.world_bounds);
            b
        };
        let (start, end) = self.cell_range(&world_aabb);
        let expanded_obb = obb.expand_vec(self.cell_size);
        Self::for_each_cell(start, end, |cell| {
            if self.cell_survives_obb_test(cell, &expanded_obb, rotation) {
                out_cells.push(cell);
            }
        });
    }

    /// Cast a ray and report the first item it enters, if any. Writes
    /// to internal scratch (`ray_origin`, `ray_direction`, `has_hit`,
    /// `hit_id`) — exclusive-mode only (§5).
    pub fn ray_cast(&mut self, origin: Vec3, dir: Vec3, length: f32, hit: &mut T) -> bool {
        self.ray_origin = origin;
        self.ray_direction = dir;

        let grid_ref: &SpatialHash<T> = self;
        let mut found: Option<ItemId> = None;

        voxel_ray::walk(grid_ref, origin, dir, length, |cell| {
            if grid_ref.exceeds_world(cell) {
                return VisitResult::Stop;
            }
            if cell.x < 0 || cell.y < 0 || cell.z < 0 {
                // Below the world on this axis: no bucket lives here, but
                // keep walking — the ray may still enter the world later.
                return VisitResult::Continue;
            }
            if let Some(ids) = grid_ref.buckets.get(&hash_cell(cell)) {
                for &id in ids.value() {
                    if let Some(bounds) = grid_ref.id_to_bounds.get(&id) {
                        if bounds.clip_ray(origin, dir, length).is_some() {
                            found = Some(id);
                            return VisitResult::Stop;
                        }
                    }
                }
            }
            VisitResult::Continue
        });

        self.has_hit = found.is_some();
        self.hit_id = found;

        match found.and_then(|id| self.id_to_item.get(&id).map(|r| r.clone())) {
            Some(item) => {
                *hit = item;
                true
            }
            None => false,
        }
    }

    /// Derive a cloneable shared-writer handle for parallel insertion.
    /// Call `prepare_free_place` first: the handle cannot resize.
    pub fn to_concurrent(&self) -> crate::concurrent::ConcurrentWriter<T> {
        crate::concurrent::ConcurrentWriter {
            buckets: Arc::clone(&self.buckets),
            id_to_bounds: Arc::clone(&self.id_to_bounds),
            id_to_item: Arc::clone(&self.id_to_item),
            next_id: Arc::clone(&self.next_id),
            capacity_budget: Arc::clone(&self.capacity_budget),
            world_bounds: self.world_bounds,
            cell_size: self.cell_size,
        }
    }
}

impl<T: SpatialItem> VoxelGrid for SpatialHash<T> {
    fn cell_of(&self, point: Vec3) -> IVec3 {
        crate::math::floor_to_i3((point - self.world_bounds.min()) / self.cell_size)
    }

    fn point_of(&self, cell: IVec3, centered: bool) -> Vec3 {
        let base = self.world_bounds.min() + cell.as_vec3() * self.cell_size;
        if centered {
            base + self.cell_size * 0.5
        } else {
            base
        }
    }

    fn cell_size(&self) -> Vec3 {
        self.cell_size
    }
}

pub(crate) fn insert_id_into_bucket(buckets: &BucketMap, cell: IVec3, id: ItemId) {
    buckets.entry(hash_cell(cell)).or_insert_with(Vec::new).push(id);
}

pub(crate) fn remove_id_from_bucket(buckets: &BucketMap, cell: IVec3, id: ItemId) {
    let key = hash_cell(cell);
    let mut now_empty = false;
    if let Some(mut entry) = buckets.get_mut(&key) {
        if let Some(pos) = entry.iter().position(|&v| v == id) {
            entry.swap_remove(pos);
            now_empty = entry.is_empty();
        } else {
            debug_assert!(
                false,
                "invariant violation: item {id} missing from bucket at cell {cell:?}"
            );
        }
    } else {
        debug_assert!(
            false,
            "invariant violation: no bucket at cell {cell:?} for item {id}"
        );
    }
    if now_empty {
        buckets.remove(&key);
    }
}
