//! Wavefront OBJ loading.
//!
//! Every model in the file is merged into one `Mesh`. Materials are ignored;
//! vertex colors (`v x y z r g b`) are kept when present.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zbuf_math::Vec3;

use crate::mesh::Mesh;
use crate::triangle::DEFAULT_VERTEX_COLOR;
use crate::Color;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to open {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed OBJ data: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("no models found in OBJ data")]
    NoModels,

    #[error("OBJ data contains no triangles")]
    Empty,
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

/// Load an OBJ file from disk.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Loading OBJ: {}", path.display());
    parse_obj(&mut BufReader::new(file))
}

/// Parse OBJ data from any buffered reader.
pub fn parse_obj<R: BufRead>(reader: &mut R) -> Result<Mesh, MeshError> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;
    mesh_from_models(&models)
}

fn mesh_from_models(models: &[tobj::Model]) -> Result<Mesh, MeshError> {
    if models.is_empty() {
        return Err(MeshError::NoModels);
    }

    let any_colors = models.iter().any(|m| !m.mesh.vertex_color.is_empty());
    let all_normals = models
        .iter()
        .all(|m| !m.mesh.normals.is_empty() && m.mesh.normals.len() == m.mesh.positions.len());

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut colors = Vec::new();
    let mut indices = Vec::new();

    for model in models {
        let mesh = &model.mesh;
        let base = positions.len() as u32;
        let vertex_count = mesh.positions.len() / 3;

        positions.extend(mesh.positions.chunks_exact(3).map(Vec3::from_slice));
        if all_normals {
            normals.extend(mesh.normals.chunks_exact(3).map(Vec3::from_slice));
        }
        if any_colors {
            if mesh.vertex_color.len() == mesh.positions.len() {
                colors.extend(mesh.vertex_color.chunks_exact(3).map(Color::from_slice));
            } else {
                colors.extend(std::iter::repeat(DEFAULT_VERTEX_COLOR).take(vertex_count));
            }
        }
        indices.extend(mesh.indices.iter().map(|i| i + base));

        log::debug!(
            "Model '{}': {} vertices, {} triangles",
            model.name,
            vertex_count,
            mesh.indices.len() / 3
        );
    }

    if indices.len() < 3 {
        return Err(MeshError::Empty);
    }

    let mut mesh = Mesh::new(positions, indices, all_normals.then_some(normals));
    if any_colors {
        mesh = mesh.with_colors(colors);
    }
    mesh.ensure_normals();

    log::info!(
        "Loaded {} models: {} vertices, {} triangles, normals from file: {}",
        models.len(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        all_normals
    );
    Ok(mesh)
}
