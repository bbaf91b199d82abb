//! Spatial partitioning data structures
//!
//! Bounding volumes, the view frustum and the indices renderers cull with.

mod bounds;
mod dynamic_tree;
mod spatial_query;

use serde::{Deserialize, Serialize};

pub use bounds::{AABB, Frustum, Plane};
pub use dynamic_tree::{DynamicTree, DynamicTreeConfig};
pub use spatial_query::{LinearIndex, SpatialIndex};

use crate::core::CullingConfig;

/// How renderers find the entities a camera can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CullStrategy {
    /// Test every entity against the frustum
    #[default]
    Linear,
    /// Walk a balanced AABB tree, skipping whole subtrees
    BalancedTree,
}

/// Build the index selected by the culling settings
pub fn create_index(config: &CullingConfig) -> Box<dyn SpatialIndex> {
    match config.strategy {
        CullStrategy::Linear => Box::new(LinearIndex::new()),
        CullStrategy::BalancedTree => Box::new(DynamicTree::new(DynamicTreeConfig {
            margin: config.tree_margin,
        })),
    }
}
