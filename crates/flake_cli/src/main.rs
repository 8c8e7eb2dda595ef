use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use flake_math::{DMat4, DVec3};
use flake_renderer::{
    FractalBvh, RayTracer, RenderConfig, DEFAULT_CAMERA_POSITION, DEFAULT_LEVELS,
    MAX_INTERACTIVE_LEVELS,
};

/// Render a sphereflake fractal to a grayscale image.
#[derive(Parser, Debug)]
#[command(name = "sphereflake", version, about)]
struct Args {
    /// Recursion depth of the fractal
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_LEVELS,
        value_parser = clap::value_parser!(u32).range(1..=MAX_INTERACTIVE_LEVELS as i64)
    )]
    levels: u32,

    /// Image width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Image plane distance in pixels [default: max(width, height)]
    #[arg(long)]
    zoom: Option<f64>,

    /// Disable 4x supersampling
    #[arg(long)]
    no_aa: bool,

    /// Light position as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true, default_value = "-0.6,5,-10")]
    light: DVec3,

    /// Camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    camera: Option<DVec3>,

    /// Camera turn around the vertical axis, in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    yaw: f64,

    /// Camera tilt around the horizontal axis, in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pitch: f64,

    /// Worker count [default: one per core]
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Output image (.png or .pgm)
    #[arg(short, long, default_value = "sphereflake.png")]
    output: PathBuf,
}

/// Parse "x,y,z" into a vector.
fn parse_vec3(value: &str) -> Result<DVec3, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|e| format!("{}: {}", part, e)))
        .collect::<Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z but got {} values", parts.len())),
    }
}

/// Matrix that moves world geometry into the camera's frame.
fn view_matrix(position: DVec3, yaw: f64, pitch: f64) -> DMat4 {
    DMat4::from_rotation_y(yaw.to_radians())
        * DMat4::from_rotation_x(pitch.to_radians())
        * DMat4::from_translation(-position)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    log::info!("Starting sphereflake renderer");

    let mut config = RenderConfig::default()
        .with_resolution(args.width, args.height)
        .with_zoom(args.zoom.unwrap_or(f64::from(args.width.max(args.height))))
        .with_anti_aliasing(!args.no_aa)
        .with_light(args.light);
    if let Some(threads) = args.threads {
        config = config.with_parallelism(threads);
    }

    let mut scene = FractalBvh::new();
    let start = Instant::now();
    let count = scene
        .build_structure(args.levels)
        .with_context(|| format!("Failed to create a structure with {} levels", args.levels))?;
    log::info!("Spheres: {} (built in {:?})", count, start.elapsed());

    let camera = args.camera.unwrap_or(DEFAULT_CAMERA_POSITION);
    scene.transform(&view_matrix(camera, args.yaw, args.pitch));

    let tracer = RayTracer::new(config);
    let start = Instant::now();
    let frame = tracer.render(&scene)?;
    log::info!(
        "Rendered {}x{} in {:?}",
        frame.width,
        frame.height,
        start.elapsed()
    );

    frame
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;
    log::info!("Saved to {}", args.output.display());

    Ok(())
}
