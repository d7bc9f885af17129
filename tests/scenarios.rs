//! Literal scenarios from the grid's testable-properties document:
//! world centre (15,15,15) size (30,30,30), cell (1,1,1).

use astraweave_spatial_grid::{Aabb, ItemId, SpatialHash, SpatialItem};
use glam::Vec3;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Box3 {
    center: [i32; 3], // stored *10 to keep hashing exact for halves; see new()
    size: [i32; 3],
    id: Option<ItemId>,
}

impl Box3 {
    fn new(center: Vec3, size: Vec3) -> Self {
        Box3 {
            center: [
                (center.x * 10.0).round() as i32,
                (center.y * 10.0).round() as i32,
                (center.z * 10.0).round() as i32,
            ],
            size: [
                (size.x * 10.0).round() as i32,
                (size.y * 10.0).round() as i32,
                (size.z * 10.0).round() as i32,
            ],
            id: None,
        }
    }
}

impl SpatialItem for Box3 {
    fn center(&self) -> Vec3 {
        Vec3::new(
            self.center[0] as f32 / 10.0,
            self.center[1] as f32 / 10.0,
            self.center[2] as f32 / 10.0,
        )
    }
    fn size(&self) -> Vec3 {
        Vec3::new(
            self.size[0] as f32 / 10.0,
            self.size[1] as f32 / 10.0,
            self.size[2] as f32 / 10.0,
        )
    }
    fn spatial_hashing_index(&self) -> Option<ItemId> {
        self.id
    }
    fn set_spatial_hashing_index(&mut self, id: ItemId) {
        self.id = Some(id);
    }
}

fn world() -> Aabb {
    Aabb::from_center_extents(Vec3::splat(15.0), Vec3::splat(15.0))
}

#[test]
fn scenario_1_single_cell_insert() {
    let grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 16).unwrap();
    let mut item = Box3::new(Vec3::splat(5.5), Vec3::ONE);
    grid.add(&mut item);
    assert_eq!(grid.item_count(), 1);
    assert_eq!(grid.bucket_item_count(), 1);
}

#[test]
fn scenario_2_multi_cell_insert() {
    let grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 64).unwrap();
    let mut item = Box3::new(Vec3::splat(5.5), Vec3::splat(1.1));
    grid.add(&mut item);
    assert_eq!(grid.item_count(), 1);
    assert_eq!(grid.bucket_item_count(), 27);
}

#[test]
fn scenario_3_over_world_insert() {
    let grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 1024).unwrap();
    let mut item = Box3::new(Vec3::splat(15.0), Vec3::splat(40.0));
    grid.add(&mut item);
    assert_eq!(grid.item_count(), 1);
    assert_eq!(grid.bucket_item_count(), 30 * 30 * 30);
}

#[test]
fn scenario_4_remove() {
    let grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 64).unwrap();
    let mut item = Box3::new(Vec3::splat(5.5), Vec3::splat(1.1));
    let id = grid.add(&mut item);
    grid.remove(id).unwrap();
    assert_eq!(grid.item_count(), 0);
    assert_eq!(grid.bucket_item_count(), 0);
}

#[test]
fn scenario_5_aabb_query_single_cell_roundtrip() {
    let grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 64).unwrap();
    let mut item = Box3::new(Vec3::splat(5.5), Vec3::splat(1.1));
    grid.add(&mut item);

    // centre (5.5,5.5,5.5) size (1.1,1.1,1.1) -> clamped bounds [4.95, 6.05],
    // so [start,end) is [4,7) -- cells 4,5,6 (the 3x3x3=27 of scenario 2).
    let start = [4i32, 4, 4];
    for x in start[0]..start[0] + 3 {
        for y in start[1]..start[1] + 3 {
            for z in start[2]..start[2] + 3 {
                let cell_centre = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
                let query = Aabb::from_center_extents(cell_centre, Vec3::splat(0.475));
                let mut out = Vec::new();
                grid.query_aabb(query, &mut out);
                assert_eq!(out.len(), 1, "cell ({x},{y},{z}) should find exactly the one item");
            }
        }
    }
}

#[test]
fn scenario_6_oversized_aabb_query() {
    let grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 64).unwrap();
    let mut item = Box3::new(Vec3::splat(5.5), Vec3::splat(1.1));
    grid.add(&mut item);

    let query = Aabb::from_center_extents(Vec3::splat(15.0), Vec3::splat(25.0));
    let mut out = Vec::new();
    grid.query_aabb(query, &mut out);
    assert_eq!(out.len(), 1);
}

#[test]
fn scenario_7_ray_hit_and_miss() {
    let mut grid = SpatialHash::<Box3>::new(world(), Vec3::ONE, 64).unwrap();
    let mut item = Box3::new(Vec3::ZERO, Vec3::ONE);
    grid.add(&mut item);

    let mut hit = Box3::new(Vec3::ZERO, Vec3::ZERO);
    let did_hit = grid.ray_cast(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 10.0, &mut hit);
    assert!(did_hit, "ray of length 10 should hit the unit cube at the origin");

    let mut miss = Box3::new(Vec3::ZERO, Vec3::ZERO);
    let did_miss = grid.ray_cast(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 3.0, &mut miss);
    assert!(!did_miss, "ray of length 3 is too short to reach the cube");
}
