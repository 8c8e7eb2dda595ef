// Re-export glam for convenience
pub use glam::*;

// Sphereflake geometry types
mod ray;
mod sphere;
mod transform;

pub use ray::Ray;
pub use sphere::{Intersection, Sphere};
pub use transform::{DMat4Ext, LocalBasis};
