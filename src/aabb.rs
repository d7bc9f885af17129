//! Axis-aligned bounding box primitive: centre + half-extents, plus the
//! ray-clipping and OBB-enclosure math the grid's pruning depends on.
//!
//! This is not utility code. `query_aabb` and `query_obb` are only
//! correct because the post-filter here (`intersects`) is exact, and
//! `ray_cast` is only correct because `clip_ray` agrees with the voxel
//! walk about which cell a hit first lands in.

use glam::{Quat, Vec3};

/// Centre/extents AABB. `extents` are half-sizes, matching `glam`'s own
/// `Aabb3d`-style convention and the teacher's `half_extents()` naming.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Aabb {
    /// Construct from centre and half-extents directly.
    #[inline]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    /// Construct from world min/max corners.
    #[inline]
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let mut b = Self {
            center: Vec3::ZERO,
            extents: Vec3::ZERO,
        };
        b.set_min_max(min, max);
        b
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.extents * 2.0
    }

    /// `extents=(b-a)/2; center=a+extents`.
    #[inline]
    pub fn set_min_max(&mut self, a: Vec3, b: Vec3) {
        self.extents = (b - a) * 0.5;
        self.center = a + self.extents;
    }

    /// Enlarge to cover the given point.
    pub fn encapsulate_point(&mut self, p: Vec3) {
        let min = self.min().min(p);
        let max = self.max().max(p);
        self.set_min_max(min, max);
    }

    /// Enlarge to cover the given box.
    pub fn encapsulate(&mut self, other: &Aabb) {
        let min = self.min().min(other.min());
        let max = self.max().max(other.max());
        self.set_min_max(min, max);
    }

    /// Clamp this box's min/max componentwise into `world`.
    pub fn clamp(&mut self, world: &Aabb) {
        let wmin = world.min();
        let wmax = world.max();
        let min = self.min().clamp(wmin, wmax);
        let max = self.max().clamp(wmin, wmax);
        self.set_min_max(min, max);
    }

    /// Enlarge extents by a uniform amount (per side, i.e. extents grows by `f`).
    #[inline]
    pub fn expand(&self, f: f32) -> Self {
        Self {
            center: self.center,
            extents: self.extents + Vec3::splat(f),
        }
    }

    /// Enlarge extents componentwise.
    #[inline]
    pub fn expand_vec(&self, v: Vec3) -> Self {
        Self {
            center: self.center,
            extents: self.extents + v,
        }
    }

    /// `all(min<=b.max) && all(max>=b.min)`.
    #[inline]
    pub fn intersects(&self, b: &Aabb) -> bool {
        let (amin, amax) = (self.min(), self.max());
        let (bmin, bmax) = (b.min(), b.max());
        amin.x <= bmax.x
            && amax.x >= bmin.x
            && amin.y <= bmax.y
            && amax.y >= bmin.y
            && amin.z <= bmax.z
            && amax.z >= bmin.z
    }

    /// `ceil((max-min)/cell)` — how many cells this box's extent spans.
    pub fn cell_count(&self, cell: Vec3) -> glam::IVec3 {
        crate::math::ceil_to_i3(self.size() / cell)
    }

    /// 3-slab AABB-ray clip. `origin + dir*length` is the ray segment;
    /// `dir` need not be normalised. Returns the entry point when the
    /// segment intersects this box, `None` otherwise.
    ///
    /// Degenerate axes (a zero direction component) are handled without
    /// special-casing the division: `t_low`/`t_high` both come out to
    /// `+inf`/`-inf` appropriately only if we guard the zero case, so we
    /// do guard it explicitly — dividing by zero in IEEE-754 still gives
    /// a usable `+inf`/`-inf`, but `0.0/0.0` (origin exactly on the slab)
    /// gives `NaN`, which must not poison the min/max below.
    pub fn clip_ray(&self, origin: Vec3, dir: Vec3, length: f32) -> Option<Vec3> {
        let (bmin, bmax) = (self.min(), self.max());
        let end = origin + dir * length;

        let mut t_low = 0.0f32;
        let mut t_high = 1.0f32;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis] * length;
            let lo = bmin[axis];
            let hi = bmax[axis];

            if d.abs() < 1e-8 {
                // Segment doesn't move along this axis: it must already
                // lie within the slab, or it misses entirely.
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv_d = 1.0 / d;
            let mut t0 = (lo - o) * inv_d;
            let mut t1 = (hi - o) * inv_d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_low = t_low.max(t0);
            t_high = t_high.min(t1);
            if t_low > t_high {
                return None;
            }
        }

        Some(origin + (end - origin) * t_low)
    }

    /// OBB-ray clip: transform `origin`/`dir` into the box's local frame
    /// (inverse rotation about the box centre), delegate to `clip_ray`,
    /// then rotate the entry point back into world space.
    pub fn clip_ray_obb(
        &self,
        origin: Vec3,
        dir: Vec3,
        length: f32,
        rotation: Quat,
        entry: &mut Vec3,
    ) -> bool {
        let inv_rot = rotation.inverse();
        let local_origin = inv_rot * (origin - self.center) + self.center;
        let local_dir = inv_rot * dir;

        match self.clip_ray(local_origin, local_dir, length) {
            Some(local_entry) => {
                *entry = rotation * (local_entry - self.center) + self.center;
                true
            }
            None => false,
        }
    }
}

/// Conservative world-aligned enclosure of an oriented box: centre is
/// preserved, size is `|R * size|` componentwise. This may be larger
/// than the tight AABB of the rotated box — callers (notably
/// `query_obb`'s cell-range derivation) rely on exactly this slack.
pub fn transform_bounds(obb: &Aabb, rotation: Quat) -> Aabb {
    let rotated_size = rotation * obb.size();
    let extents = rotated_size.abs() * 0.5;
    Aabb::from_center_extents(obb.center, extents)
}
