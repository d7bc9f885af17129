//! Amanatides-Woo 3-D voxel traversal.
//!
//! Cost is O(cells crossed), independent of ray length — this is what
//! lets `ray_cast` and `query_obb`'s cell enumeration stay cheap over a
//! grid with tens of thousands of occupied cells.

use crate::math::manhattan_distance;
use glam::{IVec3, Vec3};

const DIR_EPSILON: f32 = 1e-5;

/// What a cell visitor decides after being shown one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    /// Keep walking.
    Continue,
    /// Stop the walk now (e.g. a ray-cast found its first hit).
    Stop,
}

/// The grid geometry a `VoxelRay` walk needs from its caller.
pub trait VoxelGrid {
    /// The integer cell a world point falls into.
    fn cell_of(&self, point: Vec3) -> IVec3;
    /// The world point of a cell corner (`centered = false`) or cell
    /// centre (`centered = true`).
    fn point_of(&self, cell: IVec3, centered: bool) -> Vec3;
    /// World-space cell size.
    fn cell_size(&self) -> Vec3;
}

/// Visits cells along a ray, in 3-D DDA order, invoking `on_cell` once
/// per cell until it says `Stop` or the walk runs out of budget.
///
/// `origin`/`dir` are world-space; `dir` need not be normalised, but the
/// traversal's step budget (`1 + manhattan_distance(start, end)`) is
/// only tight when `dir` is a unit vector times `length`, matching the
/// contract callers (`ray_cast`, `query_cells_obb`'s short probing rays)
/// use it under.
pub fn walk<G: VoxelGrid>(
    grid: &G,
    origin: Vec3,
    dir: Vec3,
    length: f32,
    mut on_cell: impl FnMut(IVec3) -> VisitResult,
) {
    if dir.x.is_nan() || dir.y.is_nan() || dir.z.is_nan() || origin.x.is_nan() {
        return;
    }

    let start_cell = grid.cell_of(origin);
    let end_cell = grid.cell_of(origin + dir * length);
    let voxel_distance = 1 + manhattan_distance(start_cell, end_cell);

    let cell_size = grid.cell_size();
    let step = IVec3::new(
        sign_positive_or_zero(dir.x),
        sign_positive_or_zero(dir.y),
        sign_positive_or_zero(dir.z),
    );

    let mut t_max = Vec3::new(
        axis_t_max(grid, origin, dir, cell_size.x, start_cell.x, step.x, 0),
        axis_t_max(grid, origin, dir, cell_size.y, start_cell.y, step.y, 1),
        axis_t_max(grid, origin, dir, cell_size.z, start_cell.z, step.z, 2),
    );
    let t_delta = Vec3::new(
        axis_t_delta(dir.x, cell_size.x),
        axis_t_delta(dir.y, cell_size.y),
        axis_t_delta(dir.z, cell_size.z),
    );

    let mut cell = start_cell;
    let mut visited = 0i64;

    loop {
        if on_cell(cell) == VisitResult::Stop {
            return;
        }
        visited += 1;
        if visited >= voxel_distance {
            return;
        }

        // Ties broken x < y < z.
        let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            0
        } else if t_max.y <= t_max.z {
            1
        } else {
            2
        };

        match axis {
            0 => {
                cell.x += step.x;
                t_max.x += t_delta.x;
            }
            1 => {
                cell.y += step.y;
                t_max.y += t_delta.y;
            }
            _ => {
                cell.z += step.z;
                t_max.z += t_delta.z;
            }
        }
    }
}

#[inline]
fn sign_positive_or_zero(d: f32) -> i32 {
    if d < 0.0 {
        -1
    } else {
        1
    }
}

#[inline]
fn axis_t_max<G: VoxelGrid>(
    grid: &G,
    origin: Vec3,
    dir: Vec3,
    _cell_size_axis: f32,
    start_cell_axis: i32,
    step_axis: i32,
    axis: usize,
) -> f32 {
    let d = dir[axis];
    if d.abs() < DIR_EPSILON {
        return f32::INFINITY;
    }
    let next_cell_axis = if step_axis < 0 {
        start_cell_axis
    } else {
        start_cell_axis + 1
    };
    // Only the axis under consideration is meaningful here; the other two
    // components are arbitrary since `point_of` is axis-separable for the
    // corner query (every `VoxelGrid` in this crate computes each axis of
    // a corner independently of the others).
    let corner = match axis {
        0 => IVec3::new(next_cell_axis, 0, 0),
        1 => IVec3::new(0, next_cell_axis, 0),
        _ => IVec3::new(0, 0, next_cell_axis),
    };
    let boundary = grid.point_of(corner, false);
    let next_boundary_axis = boundary[axis];
    (next_boundary_axis - origin[axis]) / d
}

#[inline]
fn axis_t_delta(d: f32, cell_size_axis: f32) -> f32 {
    if d.abs() < DIR_EPSILON {
        f32::INFINITY
    } else {
        (cell_size_axis * sign_positive_or_zero(d) as f32) / d
    }
}
