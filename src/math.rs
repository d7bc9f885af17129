//! Small-vector math: the int3/float3 helpers the grid builds on.
//!
//! `glam::Vec3` and `glam::IVec3` are the concrete float3/int3 types;
//! this module only adds the handful of free functions the rest of the
//! crate needs and that `glam` doesn't expose directly (componentwise
//! floor/ceil-to-int, product, and a stable cell hash).
//!
//! Equality and hashing here are bit-identity on components. Callers
//! must not feed `NaN` through these paths — `glam::Vec3` doesn't
//! implement `Eq`/`Hash` for exactly that reason, so cell coordinates
//! are always converted to `IVec3` before they're used as map keys.

use glam::{IVec3, Vec3};

/// Componentwise floor, converted to integer cell coordinates.
#[inline]
pub fn floor_to_i3(v: Vec3) -> IVec3 {
    IVec3::new(v.x.floor() as i32, v.y.floor() as i32, v.z.floor() as i32)
}

/// Componentwise ceil, converted to integer cell coordinates.
#[inline]
pub fn ceil_to_i3(v: Vec3) -> IVec3 {
    IVec3::new(v.x.ceil() as i32, v.y.ceil() as i32, v.z.ceil() as i32)
}

/// Sum of components.
#[inline]
pub fn sum(v: IVec3) -> i64 {
    v.x as i64 + v.y as i64 + v.z as i64
}

/// Product of components (used for cell-count sizing).
#[inline]
pub fn product(v: IVec3) -> i64 {
    v.x as i64 * v.y as i64 * v.z as i64
}

/// Manhattan distance between two cells, as used to bound the voxel walk.
#[inline]
pub fn manhattan_distance(a: IVec3, b: IVec3) -> i64 {
    (a.x as i64 - b.x as i64).abs()
        + (a.y as i64 - b.y as i64).abs()
        + (a.z as i64 - b.z as i64).abs()
}

/// Well-mixed 32-bit hash of an integer cell coordinate.
///
/// Collisions across distinct cells are acceptable by design (spec
/// §3 "Cell hashing"): queries re-filter by true bounds intersection,
/// so this only needs to be cheap and well-distributed, not injective.
#[inline]
pub fn hash_cell(cell: IVec3) -> u32 {
    // 32-bit variant of the xxhash/murmur avalanche mix, folding in
    // each axis with a distinct odd multiplier so that adjacent cells
    // along any single axis don't collide in the low bits.
    let mut h = 0x9e3779b9u32;
    h ^= (cell.x as u32).wrapping_mul(0x85eb_ca6b);
    h = h.wrapping_mul(0xc2b2_ae35).rotate_left(13);
    h ^= (cell.y as u32).wrapping_mul(0x27d4_eb2f);
    h = h.wrapping_mul(0x1656_67b1).rotate_left(13);
    h ^= (cell.z as u32).wrapping_mul(0x1656_67b1);
    h = h.wrapping_mul(0x85eb_ca6b).rotate_left(16);
    h ^ (h >> 15)
}
