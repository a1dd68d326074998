//! Z-buffer renderer.
//!
//! The renderer walks a small state machine before it can draw:
//! camera, then model transformation, then viewport. Each setter requires
//! the previous step and invalidates every later one.
//!
//! Three interchangeable methods share the same per-pixel path:
//! - **naive**: scan every culled triangle's screen bounding box
//! - **zpyramid**: skip triangles the depth pyramid proves hidden
//! - **octree**: walk the scene octree, skipping cells outside the frustum,
//!   and draw through the pyramid test

use std::fmt;

use thiserror::Error;
use zbuf_core::{Color, ProjectedTriangle, Scene, SpatialOctree, Triangle};
use zbuf_math::{viewport_matrix, Camera, Mat4, Mat4Ext, Vec3};

use crate::image_buffer::ImageBuffer;
use crate::pyramid::DepthPyramid;
use crate::shader::{normal_shader, Shader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RendererState {
    Created,
    CameraSet,
    TransformReady,
    ViewportReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMethod {
    Naive,
    ZPyramid,
    Octree,
}

impl RenderMethod {
    pub const ALL: [RenderMethod; 3] = [RenderMethod::Naive, RenderMethod::ZPyramid, RenderMethod::Octree];

    pub fn name(&self) -> &'static str {
        match self {
            RenderMethod::Naive => "naive",
            RenderMethod::ZPyramid => "zpyramid",
            RenderMethod::Octree => "octree",
        }
    }
}

impl fmt::Display for RenderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("camera has not been set")]
    CameraNotSet,
    #[error("model transformation has not been set")]
    TransformNotReady,
    #[error("viewport has not been set")]
    ViewportNotReady,
    #[error("viewport must be non-empty, got {width}x{height}")]
    EmptyViewport { width: u32, height: u32 },
}

/// Counters for the last render pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Triangles that survived back-face and frustum culling
    pub submitted: usize,
    /// Triangles rejected by the depth pyramid before rasterization
    pub culled_by_pyramid: usize,
    /// Triangles whose bounding box was scanned
    pub rasterized: usize,
    /// Pixels that passed the depth test and were shaded
    pub pixels_shaded: usize,
    pub octree_nodes_visited: usize,
    pub octree_nodes_culled: usize,
}

/// Screen-sized buffers, allocated once per resolution.
struct RasterTarget {
    viewport: Mat4,
    pyramid: DepthPyramid,
    image: ImageBuffer,
}

impl RasterTarget {
    fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            viewport: viewport_matrix(width, height),
            pyramid: DepthPyramid::new(height, width),
            image: ImageBuffer::new(width, height, background),
        }
    }

    fn reset(&mut self, background: Color) {
        self.image.fill(background);
        self.pyramid.clear();
    }
}

pub struct Renderer {
    state: RendererState,
    camera: Option<Camera>,
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    model_view: Mat4,
    mvp: Mat4,
    target: Option<RasterTarget>,
    shader: Shader,
    background: Color,
    stats: RenderStats,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            state: RendererState::Created,
            camera: None,
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
            target: None,
            shader: normal_shader(),
            background: Color::ZERO,
            stats: RenderStats::default(),
        }
    }

    /// Color of pixels no triangle covers. Applied on the next `reset` or
    /// viewport allocation.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn set_shader(&mut self, shader: Shader) {
        self.shader = shader;
    }

    pub fn set_camera(&mut self, camera: Camera) {
        log::debug!("Camera: {:?}", camera);
        self.camera = Some(camera);
        self.state = RendererState::CameraSet;
    }

    /// Build the view and projection matrices from the camera and compose
    /// them with `model`.
    pub fn set_model_transformation(&mut self, model: Mat4) -> Result<(), RenderError> {
        let camera = self.camera.ok_or(RenderError::CameraNotSet)?;

        self.model = model;
        self.view = camera.view_matrix();
        self.projection = camera.projection_matrix();
        self.model_view = self.view * self.model;
        self.mvp = self.projection * self.model_view;
        self.state = RendererState::TransformReady;

        log::debug!("View matrix: {:?}", self.view);
        log::debug!("Projection matrix: {:?}", self.projection);
        Ok(())
    }

    /// Allocate the image and depth pyramid for a `width x height` screen.
    /// Buffers of the same size are reused and reset.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.require(RendererState::TransformReady)?;
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport { width, height });
        }

        let same_size = self
            .target
            .as_ref()
            .is_some_and(|t| t.image.width == width && t.image.height == height);
        if same_size {
            self.reset();
        } else {
            log::debug!("Allocating {}x{} raster target", width, height);
            self.target = Some(RasterTarget::new(width, height, self.background));
        }
        self.state = RendererState::ViewportReady;
        Ok(())
    }

    /// Clear the image to the background and every depth to unpainted.
    pub fn reset(&mut self) {
        if let Some(target) = &mut self.target {
            target.reset(self.background);
        }
        self.stats = RenderStats::default();
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn mvp(&self) -> Mat4 {
        self.mvp
    }

    pub fn model_view(&self) -> Mat4 {
        self.model_view
    }

    /// The image, once a viewport has been set.
    pub fn image(&self) -> Option<&ImageBuffer> {
        self.target.as_ref().map(|t| &t.image)
    }

    pub fn pyramid(&self) -> Option<&DepthPyramid> {
        self.target.as_ref().map(|t| &t.pyramid)
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    fn require(&self, needed: RendererState) -> Result<(), RenderError> {
        if self.state >= needed {
            return Ok(());
        }
        Err(match self.state {
            RendererState::Created => RenderError::CameraNotSet,
            RendererState::CameraSet => RenderError::TransformNotReady,
            RendererState::TransformReady | RendererState::ViewportReady => {
                RenderError::ViewportNotReady
            }
        })
    }

    /// Draw `scene` on top of the current image and depths. Call `reset`
    /// between passes to start from an empty screen.
    pub fn render(&mut self, scene: &Scene, method: RenderMethod) -> Result<RenderStats, RenderError> {
        self.require(RendererState::ViewportReady)?;
        let (Some(camera), Some(target)) = (self.camera, self.target.as_mut()) else {
            return Err(RenderError::ViewportNotReady);
        };

        let mut pass = Pass {
            target,
            shader: &self.shader,
            depth_range: (camera.zfar, camera.znear),
            stats: RenderStats::default(),
        };

        match method {
            RenderMethod::Naive | RenderMethod::ZPyramid => {
                let use_pyramid = method == RenderMethod::ZPyramid;
                for p in scene.to_viewspace(&self.mvp, &self.model_view) {
                    pass.draw(&p, use_pyramid);
                }
            }
            RenderMethod::Octree => {
                let walk = OctreeWalk {
                    octree: scene.octree(),
                    triangles: scene.triangles(),
                    mvp: self.mvp,
                    model_view: self.model_view,
                    eye: self.model.inverse().transform_homogeneous(camera.position),
                };
                if let Some(root) = walk.octree.root() {
                    walk.visit(&mut pass, root);
                }
            }
        }

        self.stats = pass.stats;
        log::debug!("{} pass: {:?}", method, self.stats);
        Ok(self.stats)
    }
}

/// Mutable state of one render pass.
struct Pass<'a> {
    target: &'a mut RasterTarget,
    shader: &'a Shader,
    /// `(zfar, znear)` in view space
    depth_range: (f32, f32),
    stats: RenderStats,
}

impl Pass<'_> {
    fn draw(&mut self, p: &ProjectedTriangle, use_pyramid: bool) {
        self.stats.submitted += 1;

        // Screen-space x and y, view-space depth
        let view = &p.view;
        let screen = (self.target.viewport * &p.canonical).with_depths([view.a().z, view.b().z, view.c().z]);

        if use_pyramid && !self.target.pyramid.visible(&screen) {
            self.stats.culled_by_pyramid += 1;
            return;
        }
        self.stats.rasterized += 1;
        self.rasterize(&screen, view);
    }

    fn rasterize(&mut self, screen: &Triangle, view: &Triangle) {
        let (width, height) = (self.target.image.width, self.target.image.height);
        let bbox = screen.bbox();
        let x0 = bbox.x.min.floor().max(0.0) as u32;
        let y0 = bbox.y.min.floor().max(0.0) as u32;
        let x1 = bbox.x.max.ceil().min(width as f32) as u32;
        let y1 = bbox.y.max.ceil().min(height as f32) as u32;
        let (zfar, znear) = self.depth_range;

        for y in y0..y1 {
            for x in x0..x1 {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                if !screen.contains(px, py) {
                    continue;
                }
                let bary = screen.barycentric(px, py);
                let z = view.depth_at(bary);
                if !(zfar..=znear).contains(&z) || z <= self.target.pyramid.depth(x, y) {
                    continue;
                }
                let color = (self.shader)(screen, view, bary);
                self.target.image.set(x, y, color);
                self.target.pyramid.setz(x, y, z);
                self.stats.pixels_shaded += 1;
            }
        }
    }
}

struct OctreeWalk<'a> {
    octree: &'a SpatialOctree,
    triangles: &'a [Triangle],
    mvp: Mat4,
    model_view: Mat4,
    /// Camera position in the octree's space
    eye: Vec3,
}

impl OctreeWalk<'_> {
    fn visit(&self, pass: &mut Pass<'_>, idx: usize) {
        let node = self.octree.node(idx);
        if !node.is_visible(&self.mvp, self.eye) {
            pass.stats.octree_nodes_culled += 1;
            return;
        }
        pass.stats.octree_nodes_visited += 1;

        for &i in node.prims() {
            if let Some(p) = ProjectedTriangle::project(&self.triangles[i], &self.model_view, &self.mvp) {
                pass.draw(&p, true);
            }
        }
        for &child in node.children().iter().flatten() {
            self.visit(pass, child);
        }
    }
}
