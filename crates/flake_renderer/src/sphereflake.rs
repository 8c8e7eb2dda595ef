//! Procedural sphereflake generation.
//!
//! Each sphere carries nine children a third of its radius: six around its
//! equator and three tilted toward its north pole. Children are oriented
//! along the direction they were placed in, so every level is rotated
//! relative to its parent.
//!
//! Nodes are written depth-first in preorder into a pre-sized array. A
//! subtree of `n` nodes is the node itself followed by nine equally sized
//! child subtrees of `(n - 1) / 9` nodes each.

use flake_math::{DVec3, LocalBasis, Sphere};

/// Children attached around the equator of every sphere.
pub const EQUATOR_CHILDREN: u32 = 6;

/// Children attached near the north pole of every sphere.
pub const NORTH_CHILDREN: u32 = 3;

/// Total children per sphere.
pub const CHILDREN_PER_SPHERE: u32 = EQUATOR_CHILDREN + NORTH_CHILDREN;

/// Polar angle (from the local up axis) of the equator children, in degrees.
const EQUATOR_POLAR: f64 = 90.0;

/// Polar angle of the north children, in degrees.
const NORTH_POLAR: f64 = 30.0;

/// Azimuth offset of the first north child, in degrees.
const NORTH_AZIMUTH_OFFSET: f64 = 30.0;

/// A child's radius is its parent's divided by this.
const CHILD_RADIUS_DIVISOR: f64 = 3.0;

/// A bound sphere's radius is the object radius times this.
pub const BOUND_RADIUS_SCALE: f64 = 2.0;

/// Radius of the root sphere.
pub const ROOT_RADIUS: f64 = 1.0;

/// One entry of the flattened sphereflake hierarchy.
///
/// The bound sphere and the object sphere share one center, so only the
/// center and the object radius are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BvhNode {
    center: DVec3,
    radius: f64,
    next_sibling_inc: u32,
}

impl BvhNode {
    fn new(center: DVec3, radius: f64, subtree_size: u32) -> Self {
        Self {
            center,
            radius,
            next_sibling_inc: subtree_size,
        }
    }

    /// Shared center of the bound and object spheres.
    #[inline]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Conservative volume enclosing this sphere and all its descendants.
    #[inline]
    pub fn bound_sphere(&self) -> Sphere {
        Sphere::new(self.center, BOUND_RADIUS_SCALE * self.radius)
    }

    /// The renderable sphere.
    #[inline]
    pub fn sphere(&self) -> Sphere {
        Sphere::new(self.center, self.radius)
    }

    /// Number of array slots taken by this node's subtree, itself included.
    ///
    /// Adding it to the node's index gives the index of its next sibling.
    #[inline]
    pub fn next_sibling_inc(&self) -> u32 {
        self.next_sibling_inc
    }

    /// Whether the node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.next_sibling_inc == 1
    }

    #[inline]
    pub(crate) fn set_center(&mut self, center: DVec3) {
        self.center = center;
    }
}

/// Number of spheres in a sphereflake with `levels` levels.
///
/// Follows `count(n) = 10 * count(n - 1) - 9 * count(n - 2)` with
/// `count(0) = 0` and `count(1) = 1`. Returns `None` when the count does not
/// fit in a `u32` node index.
pub fn sphere_count(levels: u32) -> Option<u32> {
    if levels == 0 {
        return Some(0);
    }

    let (mut prev, mut current) = (0u64, 1u64);
    for _ in 1..levels {
        let next = 10 * current - 9 * prev;
        if next > u64::from(u32::MAX) {
            return None;
        }
        prev = current;
        current = next;
    }
    u32::try_from(current).ok()
}

/// Fill `nodes` with a `levels`-level sphereflake rooted at the origin.
///
/// `nodes.len()` must equal `sphere_count(levels)`.
pub(crate) fn generate(nodes: &mut [BvhNode], levels: u32) {
    debug_assert_eq!(Some(nodes.len() as u32), sphere_count(levels));
    if nodes.is_empty() {
        return;
    }

    let size = nodes.len() as u32;
    let mut generator = Generator { nodes, levels };
    generator.create(0, 0, size, DVec3::ZERO, DVec3::Y, ROOT_RADIUS);
}

struct Generator<'a> {
    nodes: &'a mut [BvhNode],
    levels: u32,
}

impl Generator<'_> {
    fn create(
        &mut self,
        level: u32,
        idx: usize,
        subtree_size: u32,
        center: DVec3,
        up: DVec3,
        radius: f64,
    ) {
        // Children one past the last level are still visited and stop here
        if level >= self.levels {
            return;
        }

        let basis = LocalBasis::from_up(up);
        self.nodes[idx] = BvhNode::new(center, radius, subtree_size);

        let child_size = (subtree_size - 1) / CHILDREN_PER_SPHERE;
        let child_radius = radius / CHILD_RADIUS_DIVISOR;

        for i in 0..CHILDREN_PER_SPHERE {
            let (polar, azimuth) = if i < EQUATOR_CHILDREN {
                (EQUATOR_POLAR, f64::from(i * (360 / EQUATOR_CHILDREN)))
            } else {
                let k = i - EQUATOR_CHILDREN;
                (
                    NORTH_POLAR,
                    f64::from(k * (360 / NORTH_CHILDREN)) + NORTH_AZIMUTH_OFFSET,
                )
            };

            let direction = basis.direction(polar, azimuth);
            let child_center = center + direction * (radius + child_radius);
            let child_idx = idx + 1 + (i * child_size) as usize;

            self.create(
                level + 1,
                child_idx,
                child_size,
                child_center,
                direction,
                child_radius,
            );
        }
    }
}
