//! Flat sphere hierarchy for the sphereflake.
//!
//! The hierarchy lives in one contiguous array in depth-first preorder.
//! Instead of child pointers every node stores the size of its subtree, so a
//! traversal that misses a bound sphere jumps straight past everything
//! inside it.

use std::collections::TryReserveError;
use std::time::Instant;

use flake_math::{DMat4, DMat4Ext, Intersection, Ray};
use thiserror::Error;

use crate::parallel::ParallelRunner;
use crate::sphereflake::{self, BvhNode};

/// Errors that can occur while building the hierarchy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("failed to build with {levels} levels: sphere count does not fit a u32 index")]
    TooManyLevels { levels: u32 },

    #[error("failed to build with {levels} levels: could not allocate {count} spheres")]
    Allocation { levels: u32, count: u32 },
}

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Sphereflake geometry as an index-addressed bounding volume hierarchy.
#[derive(Debug, Clone, Default)]
pub struct FractalBvh {
    nodes: Vec<BvhNode>,
    levels: u32,
}

impl FractalBvh {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hierarchy with `levels` levels.
    pub fn with_levels(levels: u32) -> BuildResult<Self> {
        let mut bvh = Self::new();
        bvh.build_structure(levels)?;
        Ok(bvh)
    }

    /// Number of spheres a structure with `levels` levels holds.
    pub fn sphere_count_for_levels(levels: u32) -> Option<u32> {
        sphereflake::sphere_count(levels)
    }

    /// Rebuild the hierarchy with `levels` levels, replacing the old one.
    ///
    /// Returns the new sphere count. Zero levels gives an empty structure.
    /// On failure the structure is left empty rather than partially built.
    pub fn build_structure(&mut self, levels: u32) -> BuildResult<u32> {
        self.build_structure_with(levels, |nodes, count| nodes.try_reserve_exact(count))
    }

    /// Rebuild with `reserve` providing the node array's storage.
    fn build_structure_with<R>(&mut self, levels: u32, reserve: R) -> BuildResult<u32>
    where
        R: FnOnce(&mut Vec<BvhNode>, usize) -> Result<(), TryReserveError>,
    {
        self.clear();

        let count = sphereflake::sphere_count(levels).ok_or_else(|| {
            log::warn!("Sphere count for {} levels overflows the node index", levels);
            BuildError::TooManyLevels { levels }
        })?;

        log::info!("Building a structure with {} spheres ({} levels)", count, levels);
        if count == 0 {
            return Ok(0);
        }

        let mut nodes = Vec::new();
        if reserve(&mut nodes, count as usize).is_err() {
            log::warn!("Failed to allocate memory for {} spheres", count);
            return Err(BuildError::Allocation { levels, count });
        }
        nodes.resize(count as usize, BvhNode::default());

        let start = Instant::now();
        sphereflake::generate(&mut nodes, levels);
        log::debug!("Generated {} spheres in {:?}", count, start.elapsed());

        self.nodes = nodes;
        self.levels = levels;
        Ok(count)
    }

    /// Drop all spheres and release the array.
    pub fn clear(&mut self) {
        self.nodes = Vec::new();
        self.levels = 0;
    }

    /// Level count of the current structure.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Number of spheres in the current structure.
    pub fn sphere_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Check if the structure holds no spheres.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The flattened hierarchy in preorder.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Find the nearest sphere hit along `ray`.
    ///
    /// Parents as well as children can be the nearest surface, so every node
    /// whose bound sphere is hit has its own sphere tested before moving on.
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let mut nearest: Option<Intersection> = None;
        let mut min_t = f64::MAX;

        let mut idx = 0;
        while idx < self.nodes.len() {
            let node = &self.nodes[idx];

            if node.bound_sphere().intersects(ray).is_none() {
                // Nothing inside the bound can be hit
                idx += node.next_sibling_inc() as usize;
                continue;
            }

            let sphere = node.sphere();
            if let Some(t) = sphere.intersects(ray) {
                if t < min_t {
                    min_t = t;
                    let point = ray.at(t);
                    nearest = Some(Intersection {
                        t,
                        point,
                        surface_normal: sphere.normal_at(point),
                    });
                }
            }

            // Step into the first child, or on to the next sibling for leaves
            idx += 1;
        }

        nearest
    }

    /// Apply `matrix` to every sphere center on rayon's worker threads.
    pub fn transform(&mut self, matrix: &DMat4) {
        self.transform_with(&ParallelRunner::new(), matrix);
    }

    /// Apply `matrix` to every sphere center, split by `runner`.
    ///
    /// Radii and the subtree layout are left untouched.
    pub fn transform_with(&mut self, runner: &ParallelRunner, matrix: &DMat4) {
        let start = Instant::now();

        runner.run_on_slice(&mut self.nodes, |_, chunk| {
            for node in chunk {
                node.set_center(matrix.transform_homogeneous(node.center()));
            }
        });

        log::debug!(
            "Transformed {} spheres in {:?}",
            self.nodes.len(),
            start.elapsed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flake_math::{DVec3, Sphere};

    const EPS: f64 = 1e-9;

    /// Reference answer: test every sphere without any pruning.
    fn brute_force(bvh: &FractalBvh, ray: &Ray) -> Option<f64> {
        bvh.nodes()
            .iter()
            .filter_map(|node| node.sphere().intersects(ray))
            .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.min(t))))
    }

    #[test]
    fn test_build_counts() {
        let mut bvh = FractalBvh::new();

        assert_eq!(bvh.build_structure(1), Ok(1));
        assert_eq!(bvh.build_structure(3), Ok(91));
        assert_eq!(bvh.sphere_count(), 91);
        assert_eq!(bvh.levels(), 3);
    }

    #[test]
    fn test_build_zero_levels_is_empty() {
        let mut bvh = FractalBvh::with_levels(2).unwrap();

        assert_eq!(bvh.build_structure(0), Ok(0));
        assert!(bvh.is_empty());
        assert_eq!(bvh.levels(), 0);
    }

    #[test]
    fn test_build_failure_leaves_structure_empty() {
        let mut bvh = FractalBvh::with_levels(2).unwrap();

        let err = bvh.build_structure(40).unwrap_err();
        assert_eq!(err, BuildError::TooManyLevels { levels: 40 });
        assert!(err.to_string().contains("failed to build with 40 levels"));
        assert!(bvh.is_empty());
        assert_eq!(bvh.sphere_count(), 0);
    }

    #[test]
    fn test_allocation_failure_leaves_structure_empty() {
        let mut bvh = FractalBvh::with_levels(2).unwrap();

        // Asking for usize::MAX nodes always fails to reserve
        let err = bvh
            .build_structure_with(11, |nodes, _| nodes.try_reserve_exact(usize::MAX))
            .unwrap_err();

        assert_eq!(err, BuildError::Allocation { levels: 11, count: 3_922_632_451 });
        assert!(err.to_string().contains("failed to build with 11 levels"));
        assert!(bvh.is_empty());
        assert_eq!(bvh.levels(), 0);
        assert_eq!(bvh.sphere_count(), 0);

        // A later rebuild with room to spare succeeds
        assert_eq!(bvh.build_structure(2), Ok(10));
    }

    #[test]
    fn test_single_sphere_at_origin() {
        let bvh = FractalBvh::with_levels(1).unwrap();
        let node = bvh.nodes()[0];

        assert_eq!(node.sphere(), Sphere::new(DVec3::ZERO, 1.0));
        assert_eq!(node.next_sibling_inc(), 1);
    }

    #[test]
    fn test_intersect_single_sphere() {
        let bvh = FractalBvh::with_levels(1).unwrap();
        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);

        let hit = bvh.intersect(&ray).expect("ray through the origin must hit");
        assert!((hit.t - 4.0).abs() < EPS);
        assert!((hit.point - DVec3::new(0.0, 0.0, -1.0)).length() < EPS);
        assert!((hit.surface_normal.length() - 1.0).abs() < EPS);
        // Facing back toward the ray origin, away from the center
        assert!(hit.surface_normal.dot(hit.point) > 0.0);
    }

    #[test]
    fn test_intersect_from_inside_reports_exit() {
        let bvh = FractalBvh::with_levels(1).unwrap();
        let ray = Ray::new(DVec3::ZERO, DVec3::Y);

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.point - DVec3::Y).length() < EPS);
        assert!((hit.surface_normal - DVec3::Y).length() < EPS);
    }

    #[test]
    fn test_intersect_miss() {
        let bvh = FractalBvh::with_levels(3).unwrap();
        let ray = Ray::new(DVec3::new(0.0, 0.0, -10.0), DVec3::new(0.0, 1.0, 1.0).normalize());

        // Passes the origin at a distance of about 7
        assert!(bvh.intersect(&ray).is_none());
        assert!(brute_force(&bvh, &ray).is_none());
    }

    #[test]
    fn test_intersect_empty() {
        let bvh = FractalBvh::new();
        assert!(bvh.intersect(&Ray::default()).is_none());
    }

    #[test]
    fn test_intersect_matches_brute_force() {
        let bvh = FractalBvh::with_levels(3).unwrap();
        let origin = DVec3::new(0.3, 0.2, -6.0);

        for iy in -20..=20 {
            for ix in -20..=20 {
                let target = DVec3::new(ix as f64 * 0.1, iy as f64 * 0.1, 0.0);
                let ray = Ray::new(origin, (target - origin).normalize());

                let expected = brute_force(&bvh, &ray);
                let actual = bvh.intersect(&ray).map(|hit| hit.t);
                match (expected, actual) {
                    (None, None) => {}
                    (Some(e), Some(a)) => assert!((e - a).abs() < EPS, "ray to {:?}", target),
                    _ => panic!("pruning disagreed for ray to {:?}: {:?} vs {:?}", target, expected, actual),
                }
            }
        }
    }

    #[test]
    fn test_intersect_finds_child_in_front_of_parent() {
        let bvh = FractalBvh::with_levels(2).unwrap();
        // First equator child sits at (4/3, 0, 0) with radius 1/3
        let ray = Ray::new(DVec3::new(5.0, 0.0, 0.0), -DVec3::X);

        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.point.x - 5.0 / 3.0).abs() < EPS);
        assert!((hit.surface_normal - DVec3::X).length() < EPS);
    }

    #[test]
    fn test_transform_identity() {
        let mut bvh = FractalBvh::with_levels(3).unwrap();
        let before: Vec<_> = bvh.nodes().to_vec();

        bvh.transform_with(&ParallelRunner::with_parallelism(4), &DMat4::IDENTITY);

        for (a, b) in before.iter().zip(bvh.nodes()) {
            assert!((a.center() - b.center()).length() < EPS);
        }
    }

    #[test]
    fn test_transform_moves_centers_only() {
        let mut bvh = FractalBvh::with_levels(3).unwrap();
        let before: Vec<_> = bvh.nodes().to_vec();
        let offset = DVec3::new(0.0, 0.0, 5.0);

        bvh.transform_with(&ParallelRunner::with_parallelism(3), &DMat4::from_translation(offset));

        for (a, b) in before.iter().zip(bvh.nodes()) {
            assert!((a.center() + offset - b.center()).length() < EPS);
            assert_eq!(a.sphere().radius, b.sphere().radius);
            assert_eq!(a.next_sibling_inc(), b.next_sibling_inc());
            assert_eq!(b.bound_sphere().center, b.sphere().center);
        }
    }

    #[test]
    fn test_transform_rotation_preserves_hits() {
        let mut bvh = FractalBvh::with_levels(2).unwrap();
        let rotation = DMat4::from_rotation_y(std::f64::consts::FRAC_PI_2);
        bvh.transform(&rotation);

        // The +X equator child is rotated onto -Z
        let ray = Ray::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z);
        let hit = bvh.intersect(&ray).unwrap();
        assert!((hit.point.z + 5.0 / 3.0).abs() < EPS);
    }
}
