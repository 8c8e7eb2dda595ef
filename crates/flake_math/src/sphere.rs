//! Sphere primitive and the intersection record produced by hit queries.

use crate::{DVec3, Ray};

/// A sphere given by its center and radius.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
}

impl Sphere {
    /// Create a new sphere.
    #[inline]
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Find the nearest forward crossing of `ray` with the sphere surface.
    ///
    /// Returns the ray parameter `t` of the hit, or `None` when the ray line
    /// misses the sphere or the sphere lies entirely behind the origin. When
    /// the origin is inside the sphere the exit crossing is returned.
    ///
    /// The test assumes a unit-length direction; for other directions the
    /// returned `t` is still a consistent ordering key along the same ray.
    #[inline]
    pub fn intersects(&self, ray: &Ray) -> Option<f64> {
        let dst = self.center - ray.origin;
        let b = dst.dot(ray.direction);
        let c = b * b - dst.dot(dst) + self.radius * self.radius;

        // Imaginary roots
        if c < 0.0 {
            return None;
        }

        let d = c.sqrt();
        let e = b + d;

        // Both roots behind the origin
        if e < 0.0 {
            return None;
        }

        let f = b - d;
        Some(if f > 0.0 { f } else { e })
    }

    /// Outward unit normal at a point on the surface.
    #[inline]
    pub fn normal_at(&self, point: DVec3) -> DVec3 {
        (point - self.center) / self.radius
    }
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: DVec3::ZERO,
            radius: 0.0,
        }
    }
}

/// Record of the nearest ray/sphere hit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    /// Ray parameter of the hit
    pub t: f64,
    /// Point of intersection
    pub point: DVec3,
    /// Unit normal pointing away from the hit sphere's center
    pub surface_normal: DVec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_sphere_hit_from_outside() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, 10.0), 2.0);
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);

        let t = sphere.intersects(&ray).expect("ray aimed at center must hit");
        assert!((t - 8.0).abs() < EPS);
    }

    #[test]
    fn test_sphere_hit_distance_matches_geometry() {
        let origin = DVec3::new(1.0, -2.0, 3.0);
        let center = DVec3::new(4.0, 2.0, 3.0);
        let sphere = Sphere::new(center, 1.5);
        let ray = Ray::new(origin, (center - origin).normalize());

        let t = sphere.intersects(&ray).unwrap();
        assert!((t - (origin.distance(center) - 1.5)).abs() < EPS);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, 10.0), 1.0);
        // Passes 2 units to the side of the center
        let ray = Ray::new(DVec3::new(2.0, 0.0, 0.0), DVec3::Z);

        assert!(sphere.intersects(&ray).is_none());
    }

    #[test]
    fn test_sphere_behind_origin() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0);
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);

        assert!(sphere.intersects(&ray).is_none());
    }

    #[test]
    fn test_origin_inside_sphere_returns_exit() {
        let sphere = Sphere::new(DVec3::ZERO, 3.0);
        let ray = Ray::new(DVec3::new(0.0, 0.0, 1.0), DVec3::Z);

        // Near root is behind the origin, far root is 2 ahead
        let t = sphere.intersects(&ray).unwrap();
        assert!((t - 2.0).abs() < EPS);
    }

    #[test]
    fn test_tangent_ray_touches() {
        let sphere = Sphere::new(DVec3::new(0.0, 1.0, 5.0), 1.0);
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);

        let t = sphere.intersects(&ray).unwrap();
        assert!((t - 5.0).abs() < EPS);
    }

    #[test]
    fn test_normal_at() {
        let sphere = Sphere::new(DVec3::new(1.0, 1.0, 1.0), 2.0);
        let n = sphere.normal_at(DVec3::new(1.0, 3.0, 1.0));

        assert!((n - DVec3::Y).length() < EPS);
    }
}
