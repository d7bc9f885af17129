//! Uniform-grid spatial index for bounded items moving through a fixed
//! 3-D world: insert/remove/move, AABB/OBB containment queries, and
//! Amanatides-Woo ray traversal, plus a cloneable handle for fanning
//! inserts out across worker threads.
//!
//! The index is a bucketed multimap from integer cell coordinate to
//! item id (`spatial_hash`-style broad phase), not a tree: lookups are
//! O(1) hash access per cell rather than O(log n) descent, at the cost
//! of needing a sane `cell_size` relative to item size.

pub mod aabb;
pub mod concurrent;
pub mod error;
pub mod grid;
mod math;
pub mod item;
pub mod voxel_ray;

pub use aabb::{transform_bounds, Aabb};
pub use concurrent::ConcurrentWriter;
pub use error::{Result, SpatialGridError};
pub use grid::SpatialHash;
pub use item::{ItemId, SpatialItem};
pub use voxel_ray::{VisitResult, VoxelGrid};
