// Transform utilities for DMat4 and local frames
//
// Sphereflake children are placed in a frame derived from their parent's
// "up" direction, and camera motion is applied to node centers as a
// homogeneous point transform.

use glam::{DMat4, DVec3};

/// Extension trait for DMat4 point transforms.
pub trait DMat4Ext {
    /// Apply the full 4x4 matrix to `point` with an implicit w=1 and drop
    /// the resulting w component (no perspective divide).
    fn transform_homogeneous(&self, point: DVec3) -> DVec3;
}

impl DMat4Ext for DMat4 {
    #[inline]
    fn transform_homogeneous(&self, point: DVec3) -> DVec3 {
        (*self * point.extend(1.0)).truncate()
    }
}

/// Orthonormal frame whose Y axis follows an "up" direction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LocalBasis {
    pub x: DVec3,
    pub y: DVec3,
    pub z: DVec3,
}

impl LocalBasis {
    /// World axes.
    pub const WORLD: LocalBasis = LocalBasis {
        x: DVec3::X,
        y: DVec3::Y,
        z: DVec3::Z,
    };

    /// Build the frame for `up`.
    ///
    /// An up vector with no X and no Z component is parallel to the world Y
    /// axis, where the cross product below degenerates; the world axes are
    /// used instead.
    pub fn from_up(up: DVec3) -> Self {
        if up.x == 0.0 && up.z == 0.0 {
            return Self::WORLD;
        }

        let y = up.normalize();
        let z = y.cross(DVec3::Y).normalize();
        let x = y.cross(z).normalize();
        Self { x, y, z }
    }

    /// Unit direction for spherical angles in this frame, in degrees.
    ///
    /// `polar` is measured from the frame's Y axis, `azimuth` around it
    /// starting at the frame's X axis.
    pub fn direction(&self, polar: f64, azimuth: f64) -> DVec3 {
        let phi = polar.to_radians();
        let theta = azimuth.to_radians();
        let x = phi.sin() * theta.cos();
        let y = phi.cos();
        let z = phi.sin() * theta.sin();
        (x * self.x + y * self.y + z * self.z).normalize()
    }
}
