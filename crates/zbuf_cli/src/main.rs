//! zbuf - render an OBJ mesh with the CPU z-buffer rasterizer.
//!
//! Renders with one method, or with all three in turn to compare their
//! timings, and writes the result as binary PPM.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, ImageEncoder};

use zbuf_core::{load_obj, Scene};
use zbuf_math::{Camera, Mat4};
use zbuf_renderer::{shader, ImageBuffer, RenderMethod, Renderer, Shader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Naive,
    Zpyramid,
    Octree,
    /// Run every method, one output image each
    All,
}

impl MethodArg {
    fn methods(self) -> Vec<RenderMethod> {
        match self {
            MethodArg::Naive => vec![RenderMethod::Naive],
            MethodArg::Zpyramid => vec![RenderMethod::ZPyramid],
            MethodArg::Octree => vec![RenderMethod::Octree],
            MethodArg::All => RenderMethod::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ShaderArg {
    /// Facing direction in camera space
    Normal,
    /// Interpolated vertex colors
    VertexColor,
    /// Greyscale by distance
    Depth,
}

impl ShaderArg {
    fn build(self) -> Shader {
        match self {
            ShaderArg::Normal => shader::normal_shader(),
            ShaderArg::VertexColor => shader::vertex_color_shader(),
            ShaderArg::Depth => shader::depth_shader(),
        }
    }
}

/// Software z-buffer renderer with hierarchical depth and octree culling.
#[derive(Parser, Debug)]
#[command(name = "zbuf", version)]
#[command(about = "Renders an OBJ mesh to a PPM image on the CPU")]
struct Args {
    /// Wavefront OBJ file to render
    objfile: PathBuf,

    /// Output resolution as WIDTHxHEIGHT
    #[arg(short, long, default_value = "1920x1080", value_parser = parse_resolution)]
    resolution: (u32, u32),

    /// Vertical field of view in degrees, ignored with --camera
    #[arg(short = 'f', long, default_value_t = 45.0)]
    field_of_view: f32,

    /// Output image path
    #[arg(short, long, default_value = "zbuffer.ppm")]
    output: PathBuf,

    /// Rendering method
    #[arg(short, long, value_enum, default_value_t = MethodArg::All)]
    method: MethodArg,

    /// Per-pixel shader
    #[arg(short, long, value_enum, default_value_t = ShaderArg::Normal)]
    shader: ShaderArg,

    /// JSON camera description; the camera is framed from the mesh bounds
    /// when omitted
    #[arg(short, long)]
    camera: Option<PathBuf>,
}

fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let height: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if width == 0 || height == 0 {
        return Err(format!("resolution must be non-zero, got {width}x{height}"));
    }
    Ok((width, height))
}

fn load_camera(path: &Path) -> Result<Camera> {
    let file = File::open(path).with_context(|| format!("Failed to open camera file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse camera file: {}", path.display()))
}

/// `naive-zbuffer.ppm` next to `zbuffer.ppm`.
fn prefixed_output(output: &Path, method: RenderMethod) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "zbuffer.ppm".to_string());
    output.with_file_name(format!("{}-{}", method.name(), name))
}

fn write_ppm(image: &ImageBuffer, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create output: {}", path.display()))?;
    let encoder = PnmEncoder::new(BufWriter::new(file)).with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary));
    encoder
        .write_image(&image.to_rgb8(), image.width, image.height, ColorType::Rgb8)
        .with_context(|| format!("Failed to encode PPM: {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let (width, height) = args.resolution;
    let aspect = width as f32 / height as f32;

    let mesh = load_obj(&args.objfile).with_context(|| format!("Failed to load mesh: {}", args.objfile.display()))?;
    let scene = Scene::new(mesh.to_triangles());

    let camera = match &args.camera {
        Some(path) => {
            let mut camera = load_camera(path)?;
            if (camera.aspect - aspect).abs() > f32::EPSILON {
                log::debug!("Overriding camera aspect {} with {}", camera.aspect, aspect);
                camera.set_aspect(aspect);
            }
            camera
        }
        None => scene.generate_camera(args.field_of_view, aspect),
    };
    log::info!(
        "Camera at {} looking along {}, fov {}°",
        camera.position,
        camera.gaze,
        camera.fov_y
    );

    let mut renderer = Renderer::new();
    renderer.set_shader(args.shader.build());
    renderer.set_camera(camera);
    renderer.set_model_transformation(Mat4::IDENTITY)?;
    renderer.set_viewport(width, height)?;

    let methods = args.method.methods();
    for &method in &methods {
        renderer.reset();
        let start = Instant::now();
        let stats = renderer.render(&scene, method)?;
        let elapsed = start.elapsed();

        log::info!(
            "{:>8}: {:8.2} ms ({} triangles submitted, {} rasterized, {} pixels shaded)",
            method.name(),
            elapsed.as_secs_f64() * 1000.0,
            stats.submitted,
            stats.rasterized,
            stats.pixels_shaded
        );
        if method == RenderMethod::Octree {
            log::info!(
                "          octree cells visited {}, culled {}",
                stats.octree_nodes_visited,
                stats.octree_nodes_culled
            );
        }

        let path = if methods.len() > 1 {
            prefixed_output(&args.output, method)
        } else {
            args.output.clone()
        };
        let image = renderer.image().context("Renderer has no image after rendering")?;
        write_ppm(image, &path)?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_resolution("640X480"), Ok((640, 480)));
        assert!(parse_resolution("640").is_err());
        assert!(parse_resolution("0x480").is_err());
        assert!(parse_resolution("ax480").is_err());
    }

    #[test]
    fn test_prefixed_output() {
        let out = prefixed_output(Path::new("renders/zbuffer.ppm"), RenderMethod::ZPyramid);
        assert_eq!(out, PathBuf::from("renders/zpyramid-zbuffer.ppm"));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["zbuf", "bunny.obj"]);
        assert_eq!(args.resolution, (1920, 1080));
        assert_eq!(args.field_of_view, 45.0);
        assert_eq!(args.output, PathBuf::from("zbuffer.ppm"));
        assert_eq!(args.method, MethodArg::All);
        assert_eq!(args.shader, ShaderArg::Normal);
        assert!(args.camera.is_none());
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from([
            "zbuf", "bunny.obj", "-r", "320x240", "-f", "60", "-m", "zpyramid", "-s", "vertex-color",
        ]);
        assert_eq!(args.resolution, (320, 240));
        assert_eq!(args.field_of_view, 60.0);
        assert_eq!(args.method.methods(), vec![RenderMethod::ZPyramid]);
        assert_eq!(args.shader, ShaderArg::VertexColor);
    }

    #[test]
    fn test_all_methods_in_order() {
        assert_eq!(MethodArg::All.methods(), RenderMethod::ALL.to_vec());
    }
}
