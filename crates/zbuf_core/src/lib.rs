//! zbuf core - geometry and object-space acceleration for the z-buffer renderer.
//!
//! This crate provides:
//!
//! - **Primitives**: `Triangle` with per-vertex normals and colors
//! - **Meshes**: indexed `Mesh` geometry and OBJ loading via `tobj`
//! - **Spatial index**: `SpatialOctree` over world-space triangles
//! - **Scene**: owns the triangles and their octree, projects them to view space
//!
//! # Example
//!
//! ```ignore
//! use zbuf_core::{obj::load_obj, Scene};
//!
//! let mesh = load_obj("bunny.obj")?;
//! let scene = Scene::new(mesh.to_triangles());
//! let camera = scene.generate_camera(45.0, 16.0 / 9.0);
//! ```

pub mod mesh;
pub mod obj;
pub mod octree;
pub mod scene;
pub mod triangle;

/// Linear RGB color with channels in `[0, 1]`.
pub type Color = zbuf_math::Vec3;

pub use mesh::Mesh;
pub use obj::{load_obj, MeshError};
pub use octree::{OctreeNode, SpatialOctree, OCTREE_LEAF_THRESHOLD};
pub use scene::{ProjectedTriangle, Scene};
pub use triangle::{Barycentric, Triangle, DEFAULT_VERTEX_COLOR};
