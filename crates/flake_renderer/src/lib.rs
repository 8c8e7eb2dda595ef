//! Sphereflake ray caster.
//!
//! Builds a recursive "sphereflake" into a flat bounding volume hierarchy
//! and ray casts it into an 8-bit grayscale frame, splitting pixels and
//! geometry updates across all cores.

mod bvh;
mod frame;
mod parallel;
mod renderer;
mod sphereflake;

pub use bvh::{BuildError, BuildResult, FractalBvh};
pub use frame::Frame;
pub use parallel::ParallelRunner;
pub use renderer::{intensity_to_byte, RayTracer, RenderConfig, RenderError, SAMPLE_OFFSETS};
pub use sphereflake::{sphere_count, BvhNode, CHILDREN_PER_SPHERE};

/// Re-export math types from flake_math
pub use flake_math::{DMat4, DVec3, Intersection, Ray, Sphere};

/// Level count used when nothing else is requested.
pub const DEFAULT_LEVELS: u32 = 7;

/// Deepest level count offered to interactive users.
pub const MAX_INTERACTIVE_LEVELS: u32 = 7;

/// Where the eye starts, before any view transform.
pub const DEFAULT_CAMERA_POSITION: DVec3 = DVec3::new(0.0, 0.0, -5.0);
