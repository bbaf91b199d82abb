//! Dynamic AABB tree
//!
//! A binary bounding volume hierarchy that is rebalanced with tree rotations
//! as proxies are inserted and removed. Leaves store a padded ("fat") box so
//! that small movements do not touch the tree at all, plus the exact box that
//! frustum queries test against.
//!
//! Entities with degenerate bounds bypass the tree: culling never rejects
//! them, so they are kept in a side list and returned by every query.

use std::any::Any;
use std::collections::HashMap;

use super::{AABB, Frustum, SpatialIndex};
use crate::ecs::Entity;

const NULL_NODE: usize = usize::MAX;

/// Configuration for tree behavior
#[derive(Debug, Clone)]
pub struct DynamicTreeConfig {
    /// Padding added around leaf boxes
    pub margin: f32,
}

impl Default for DynamicTreeConfig {
    fn default() -> Self {
        Self { margin: 0.5 }
    }
}

/// Single node in the hierarchy
#[derive(Debug, Clone)]
struct TreeNode {
    /// Fat box for leaves, union of children for branches
    aabb: AABB,
    /// Exact box, leaves only
    tight: AABB,
    /// Parent link, or next free node while on the free list
    parent: usize,
    child1: usize,
    child2: usize,
    /// Leaf = 0, free = -1
    height: i32,
    entity: Option<Entity>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            aabb: AABB::zero(),
            tight: AABB::zero(),
            parent: NULL_NODE,
            child1: NULL_NODE,
            child2: NULL_NODE,
            height: -1,
            entity: None,
        }
    }
}

/// Balanced AABB tree implementing [`SpatialIndex`]
#[derive(Debug)]
pub struct DynamicTree {
    config: DynamicTreeConfig,
    nodes: Vec<TreeNode>,
    root: usize,
    free_list: usize,
    proxies: HashMap<Entity, usize>,
    unbounded: Vec<(Entity, AABB)>,
}

impl DynamicTree {
    /// Create an empty tree
    pub fn new(config: DynamicTreeConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
            proxies: HashMap::new(),
            unbounded: Vec::new(),
        }
    }

    /// Height of the tree, 0 for a single leaf
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root].height
        }
    }

    /// Reinsert a proxy whose exact bounds left its fat box.
    ///
    /// Returns true when the tree was restructured.
    pub fn move_proxy(&mut self, entity: Entity, bounds: AABB) -> bool {
        let Some(&node) = self.proxies.get(&entity) else {
            self.insert(entity, bounds);
            return true;
        };
        if bounds.is_degenerate() {
            self.remove(entity);
            self.insert(entity, bounds);
            return true;
        }
        if self.nodes[node].aabb.contains(&bounds) {
            self.nodes[node].tight = bounds;
            return false;
        }
        self.remove_leaf(node);
        self.nodes[node].aabb = bounds.grown(self.config.margin);
        self.nodes[node].tight = bounds;
        self.insert_leaf(node);
        true
    }

    fn allocate_node(&mut self) -> usize {
        if self.free_list != NULL_NODE {
            let node = self.free_list;
            self.free_list = self.nodes[node].parent;
            self.nodes[node] = TreeNode {
                height: 0,
                ..TreeNode::default()
            };
            node
        } else {
            self.nodes.push(TreeNode {
                height: 0,
                ..TreeNode::default()
            });
            self.nodes.len() - 1
        }
    }

    fn free_node(&mut self, node: usize) {
        self.nodes[node] = TreeNode {
            parent: self.free_list,
            ..TreeNode::default()
        };
        self.free_list = node;
    }

    fn insert_leaf(&mut self, leaf: usize) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf].parent = NULL_NODE;
            return;
        }

        // find the cheapest sibling by surface area heuristic
        let leaf_aabb = self.nodes[leaf].aabb;
        let mut index = self.root;
        while !self.nodes[index].is_leaf() {
            let node = &self.nodes[index];
            let area = node.aabb.surface_area();
            let combined_area = node.aabb.merged(&leaf_aabb).surface_area();

            let cost = 2.0 * combined_area;
            let inheritance_cost = 2.0 * (combined_area - area);

            let child_cost = |child: usize| {
                let child = &self.nodes[child];
                let merged = child.aabb.merged(&leaf_aabb).surface_area();
                if child.is_leaf() {
                    merged + inheritance_cost
                } else {
                    merged - child.aabb.surface_area() + inheritance_cost
                }
            };
            let cost1 = child_cost(node.child1);
            let cost2 = child_cost(node.child2);

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { node.child1 } else { node.child2 };
        }
        let sibling = index;

        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate_node();
        self.nodes[new_parent].parent = old_parent;
        self.nodes[new_parent].aabb = leaf_aabb.merged(&self.nodes[sibling].aabb);
        self.nodes[new_parent].height = self.nodes[sibling].height + 1;

        if old_parent != NULL_NODE {
            if self.nodes[old_parent].child1 == sibling {
                self.nodes[old_parent].child1 = new_parent;
            } else {
                self.nodes[old_parent].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }
        self.nodes[new_parent].child1 = sibling;
        self.nodes[new_parent].child2 = leaf;
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;

        self.refit_from(self.nodes[leaf].parent);
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf].parent;
        let grand_parent = self.nodes[parent].parent;
        let sibling = if self.nodes[parent].child1 == leaf {
            self.nodes[parent].child2
        } else {
            self.nodes[parent].child1
        };

        if grand_parent != NULL_NODE {
            if self.nodes[grand_parent].child1 == parent {
                self.nodes[grand_parent].child1 = sibling;
            } else {
                self.nodes[grand_parent].child2 = sibling;
            }
            self.nodes[sibling].parent = grand_parent;
            self.free_node(parent);
            self.refit_from(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    // walk to the root fixing heights and boxes, rotating where unbalanced
    fn refit_from(&mut self, start: usize) {
        let mut index = start;
        while index != NULL_NODE {
            index = self.balance(index);
            let child1 = self.nodes[index].child1;
            let child2 = self.nodes[index].child2;
            self.nodes[index].height = 1 + self.nodes[child1].height.max(self.nodes[child2].height);
            self.nodes[index].aabb = self.nodes[child1].aabb.merged(&self.nodes[child2].aabb);
            index = self.nodes[index].parent;
        }
    }

    /// Rotate `a` if its children's heights differ by more than one.
    /// Returns the node now occupying `a`'s place.
    fn balance(&mut self, a: usize) -> usize {
        if self.nodes[a].is_leaf() || self.nodes[a].height < 2 {
            return a;
        }
        let b = self.nodes[a].child1;
        let c = self.nodes[a].child2;
        let balance = self.nodes[c].height - self.nodes[b].height;

        if balance > 1 {
            self.rotate_up(a, c, b, true)
        } else if balance < -1 {
            self.rotate_up(a, b, c, false)
        } else {
            a
        }
    }

    // promote `up` (a child of `a`) into `a`'s place; `other` is `a`'s other child
    fn rotate_up(&mut self, a: usize, up: usize, other: usize, up_is_child2: bool) -> usize {
        let f = self.nodes[up].child1;
        let g = self.nodes[up].child2;

        self.nodes[up].child1 = a;
        self.nodes[up].parent = self.nodes[a].parent;
        self.nodes[a].parent = up;

        let up_parent = self.nodes[up].parent;
        if up_parent != NULL_NODE {
            if self.nodes[up_parent].child1 == a {
                self.nodes[up_parent].child1 = up;
            } else {
                self.nodes[up_parent].child2 = up;
            }
        } else {
            self.root = up;
        }

        // the taller grandchild stays with `up`, the shorter moves under `a`
        let (keep, give) = if self.nodes[f].height > self.nodes[g].height { (f, g) } else { (g, f) };
        self.nodes[up].child2 = keep;
        if up_is_child2 {
            self.nodes[a].child2 = give;
        } else {
            self.nodes[a].child1 = give;
        }
        self.nodes[give].parent = a;

        self.nodes[a].aabb = self.nodes[other].aabb.merged(&self.nodes[give].aabb);
        self.nodes[up].aabb = self.nodes[a].aabb.merged(&self.nodes[keep].aabb);
        self.nodes[a].height = 1 + self.nodes[other].height.max(self.nodes[give].height);
        self.nodes[up].height = 1 + self.nodes[a].height.max(self.nodes[keep].height);
        up
    }

    fn query_node(&self, index: usize, frustum: &Frustum, out: &mut Vec<Entity>) {
        let node = &self.nodes[index];
        if !frustum.intersects_aabb(&node.aabb) {
            return;
        }
        if node.is_leaf() {
            if let Some(entity) = node.entity {
                if frustum.intersects_aabb(&node.tight) {
                    out.push(entity);
                }
            }
        } else {
            self.query_node(node.child1, frustum, out);
            self.query_node(node.child2, frustum, out);
        }
    }

    #[cfg(test)]
    fn validate(&self) {
        if self.root == NULL_NODE {
            return;
        }
        assert_eq!(self.nodes[self.root].parent, NULL_NODE);
        let mut stack = vec![self.root];
        let mut leaves = 0;
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                assert_eq!(node.height, 0);
                leaves += 1;
                continue;
            }
            let (c1, c2) = (node.child1, node.child2);
            assert_eq!(self.nodes[c1].parent, index);
            assert_eq!(self.nodes[c2].parent, index);
            assert_eq!(node.height, 1 + self.nodes[c1].height.max(self.nodes[c2].height));
            assert!(node.aabb.contains(&self.nodes[c1].aabb));
            assert!(node.aabb.contains(&self.nodes[c2].aabb));
            stack.push(c1);
            stack.push(c2);
        }
        assert_eq!(leaves, self.proxies.len());
    }
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new(DynamicTreeConfig::default())
    }
}

impl SpatialIndex for DynamicTree {
    fn insert(&mut self, entity: Entity, bounds: AABB) {
        if self.proxies.contains_key(&entity) || self.unbounded.iter().any(|(e, _)| *e == entity) {
            self.remove(entity);
        }
        if bounds.is_degenerate() {
            self.unbounded.push((entity, bounds));
            return;
        }
        let leaf = self.allocate_node();
        self.nodes[leaf].aabb = bounds.grown(self.config.margin);
        self.nodes[leaf].tight = bounds;
        self.nodes[leaf].entity = Some(entity);
        self.insert_leaf(leaf);
        self.proxies.insert(entity, leaf);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        if let Some(leaf) = self.proxies.remove(&entity) {
            self.remove_leaf(leaf);
            self.free_node(leaf);
            return true;
        }
        if let Some(position) = self.unbounded.iter().position(|(e, _)| *e == entity) {
            self.unbounded.swap_remove(position);
            return true;
        }
        false
    }

    fn update(&mut self, entity: Entity, bounds: AABB) {
        if self.proxies.contains_key(&entity) && !bounds.is_degenerate() {
            self.move_proxy(entity, bounds);
        } else {
            self.insert(entity, bounds);
        }
    }

    fn bounds(&self, entity: Entity) -> Option<AABB> {
        if let Some(&leaf) = self.proxies.get(&entity) {
            return Some(self.nodes[leaf].tight);
        }
        self.unbounded.iter().find(|(e, _)| *e == entity).map(|(_, b)| *b)
    }

    fn query_frustum(&self, frustum: &Frustum, out: &mut Vec<Entity>) {
        if self.root != NULL_NODE {
            self.query_node(self.root, frustum, out);
        }
        out.extend(self.unbounded.iter().map(|(entity, _)| *entity));
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.root = NULL_NODE;
        self.free_list = NULL_NODE;
        self.proxies.clear();
        self.unbounded.clear();
    }

    fn entity_count(&self) -> usize {
        self.proxies.len() + self.unbounded.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{utils, Mat4, Mat4Ext, Quat, Vec3};
    use crate::spatial::LinearIndex;

    fn cube(center: Vec3) -> AABB {
        AABB::from_center_extents(center, Vec3::repeat(0.5))
    }

    fn frustum() -> Frustum {
        let proj = Mat4::perspective(utils::deg_to_rad(60.0), 1.5, 0.1, 40.0);
        let view = Mat4::view_from(&Vec3::new(0.0, 0.0, 5.0), &Quat::identity());
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn test_stays_balanced_for_sorted_input() {
        let mut tree = DynamicTree::default();
        for i in 0..1024 {
            tree.insert(Entity::new(i, 0), cube(Vec3::new(i as f32 * 2.0, 0.0, 0.0)));
        }
        tree.validate();
        // a degenerate list would be 1023 deep
        assert!(tree.height() <= 32, "height {}", tree.height());
    }

    #[test]
    fn test_small_moves_stay_in_fat_box() {
        let mut tree = DynamicTree::new(DynamicTreeConfig { margin: 1.0 });
        let e = Entity::new(0, 0);
        tree.insert(e, cube(Vec3::zeros()));
        assert!(!tree.move_proxy(e, cube(Vec3::new(0.25, 0.0, 0.0))));
        assert!(tree.move_proxy(e, cube(Vec3::new(10.0, 0.0, 0.0))));
        assert_eq!(tree.bounds(e), Some(cube(Vec3::new(10.0, 0.0, 0.0))));
        tree.validate();
    }

    #[test]
    fn test_remove_and_reuse_nodes() {
        let mut tree = DynamicTree::default();
        for i in 0..64 {
            tree.insert(Entity::new(i, 0), cube(Vec3::new(i as f32, (i % 7) as f32, 0.0)));
        }
        for i in (0..64).step_by(2) {
            assert!(tree.remove(Entity::new(i, 0)));
        }
        tree.validate();
        assert_eq!(tree.entity_count(), 32);
        for i in 64..96 {
            tree.insert(Entity::new(i, 0), cube(Vec3::new(0.0, i as f32, 0.0)));
        }
        tree.validate();
        assert_eq!(tree.entity_count(), 64);
    }

    #[test]
    fn test_matches_linear_scan() {
        let mut tree = DynamicTree::default();
        let mut linear = LinearIndex::new();
        for i in 0..500u32 {
            let x = ((i * 37) % 61) as f32 - 30.0;
            let y = ((i * 11) % 23) as f32 - 11.0;
            let z = ((i * 53) % 71) as f32 - 60.0;
            let bounds = cube(Vec3::new(x, y, z));
            tree.insert(Entity::new(i, 0), bounds);
            linear.insert(Entity::new(i, 0), bounds);
        }
        let point = AABB::new(Vec3::new(0.0, 0.0, 90.0), Vec3::new(0.0, 0.0, 90.0));
        tree.insert(Entity::new(999, 0), point);
        linear.insert(Entity::new(999, 0), point);

        let (mut a, mut b) = (Vec::new(), Vec::new());
        tree.query_frustum(&frustum(), &mut a);
        linear.query_frustum(&frustum(), &mut b);
        a.sort();
        b.sort();
        assert!(!a.is_empty());
        assert!(a.len() < 501);
        assert_eq!(a, b);
        assert!(a.contains(&Entity::new(999, 0)));
    }
}
