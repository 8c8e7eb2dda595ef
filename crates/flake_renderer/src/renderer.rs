//! Per-pixel ray casting and shading.
//!
//! Every pixel casts one ray (or four with anti-aliasing) from the world
//! origin toward the image plane at `z = zoom`, and is shaded with a single
//! point light plus a constant ambient floor.

use std::time::Instant;

use flake_math::{DVec2, DVec3, Ray};
use thiserror::Error;

use crate::bvh::FractalBvh;
use crate::frame::Frame;
use crate::parallel::ParallelRunner;

/// Sub-pixel offsets sampled when anti-aliasing is enabled.
pub const SAMPLE_OFFSETS: [DVec2; 4] = [
    DVec2::new(-0.3, -0.3),
    DVec2::new(0.3, -0.3),
    DVec2::new(-0.3, 0.3),
    DVec2::new(0.3, 0.3),
];

/// Intensity of surfaces facing directly away from the light.
const AMBIENT: f64 = 0.2;

/// Errors that can occur while tracing a frame.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("frame buffer holds {actual} pixels, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Average four sub-pixel samples per pixel
    pub anti_aliasing: bool,
    /// Distance of the image plane from the eye, in pixels
    pub zoom: f64,
    /// World-space position of the point light
    pub light_position: DVec3,
    /// Worker count override, `None` uses rayon's thread count
    pub parallelism: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            anti_aliasing: true,
            zoom: 800.0,
            light_position: DVec3::new(-0.6, 5.0, -10.0),
            parallelism: None,
        }
    }
}

impl RenderConfig {
    /// Set the frame size.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the image plane distance.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    /// Enable or disable 4x supersampling.
    pub fn with_anti_aliasing(mut self, enabled: bool) -> Self {
        self.anti_aliasing = enabled;
        self
    }

    /// Set the light position.
    pub fn with_light(mut self, position: DVec3) -> Self {
        self.light_position = position;
        self
    }

    /// Limit the number of parallel ranges per frame.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    /// Number of pixels in a frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Map an intensity in `[0, 1]` to an 8-bit gray level.
#[inline]
pub fn intensity_to_byte(intensity: f64) -> u8 {
    (256.0 * intensity).floor().clamp(0.0, 255.0) as u8
}

/// Casts rays through a `FractalBvh` into a single-channel frame.
#[derive(Debug, Clone)]
pub struct RayTracer {
    config: RenderConfig,
    runner: ParallelRunner,
}

impl RayTracer {
    /// Create a tracer with the given configuration.
    pub fn new(config: RenderConfig) -> Self {
        let runner = match config.parallelism {
            Some(parallelism) => ParallelRunner::with_parallelism(parallelism),
            None => ParallelRunner::new(),
        };
        Self { config, runner }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_anti_aliasing(&mut self, enabled: bool) {
        self.config.anti_aliasing = enabled;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.config.zoom = zoom;
    }

    pub fn set_light_position(&mut self, position: DVec3) {
        self.config.light_position = position;
    }

    /// Intensity seen along `ray`, zero when nothing is hit.
    ///
    /// Lit faces map to `[0.2, 1]`, faces turned away from the light fade
    /// from 0.2 toward 0 so nothing the ray hits is fully black.
    pub fn shade(&self, scene: &FractalBvh, ray: &Ray) -> f64 {
        let Some(hit) = scene.intersect(ray) else {
            return 0.0;
        };

        let light = (self.config.light_position - hit.point).normalize();
        let shade = light.dot(hit.surface_normal);
        if shade < 0.0 {
            AMBIENT * (1.0 + shade)
        } else {
            AMBIENT + (1.0 - AMBIENT) * shade
        }
    }

    /// Eye ray through image-plane position `(px, py)`, in pixels.
    fn primary_ray(&self, px: f64, py: f64) -> Ray {
        let half_width = f64::from(self.config.width / 2);
        let half_height = f64::from(self.config.height / 2);
        Ray::from_origin(DVec3::new(px - half_width, py - half_height, self.config.zoom))
    }

    /// Intensity of logical pixel `(x, y)`, with `y` growing upward.
    pub fn sample_pixel(&self, scene: &FractalBvh, x: u32, y: u32) -> f64 {
        let (x, y) = (f64::from(x), f64::from(y));

        if self.config.anti_aliasing {
            let total: f64 = SAMPLE_OFFSETS
                .iter()
                .map(|offset| self.shade(scene, &self.primary_ray(x + offset.x, y + offset.y)))
                .sum();
            total / SAMPLE_OFFSETS.len() as f64
        } else {
            self.shade(scene, &self.primary_ray(x, y))
        }
    }

    /// Trace every pixel of a frame into `frame`, overwriting it.
    ///
    /// `frame` is top-down: logical row `y` lands in buffer row
    /// `height - 1 - y`.
    pub fn trace_frame(&self, scene: &FractalBvh, frame: &mut [u8]) -> Result<(), RenderError> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyFrame);
        }
        let expected = self.config.pixel_count();
        if frame.len() != expected {
            return Err(RenderError::FrameSize {
                expected,
                actual: frame.len(),
            });
        }

        let start = Instant::now();

        self.runner.run_on_slice(frame, |first, pixels| {
            // Buffer row and column of the first pixel in this range
            let mut row = first / width;
            let mut x = first - row * width;

            for pixel in pixels {
                let y = height - 1 - row;
                let intensity = self.sample_pixel(scene, x as u32, y as u32);
                *pixel = intensity_to_byte(intensity);

                x += 1;
                if x >= width {
                    row += 1;
                    x = 0;
                }
            }
        });

        log::debug!(
            "Traced {}x{} frame ({} spheres, aa={}) in {:?}",
            width,
            height,
            scene.sphere_count(),
            self.config.anti_aliasing,
            start.elapsed()
        );
        Ok(())
    }

    /// Allocate a frame of the configured size and trace into it.
    pub fn render(&self, scene: &FractalBvh) -> Result<Frame, RenderError> {
        let mut frame = Frame::new(self.config.width, self.config.height);
        self.trace_frame(scene, frame.as_mut_slice())?;
        Ok(frame)
    }
}

impl Default for RayTracer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}
