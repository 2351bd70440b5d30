//! glTF model decoding.
//!
//! The node hierarchy is flattened: every triangle primitive becomes one
//! [`ModelPart`] with the node's world transform baked into its vertices.
//! Animations are reduced to their name and length; skinning data is not
//! read.

use glam::{Mat4, Vec3};
use lf_core::animation::ClipInfo;
use lf_core::color::Color;
use lf_render::Geometry;

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("glTF decode failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("Draco-compressed meshes are not supported")]
    Draco,
    #[error("primitive in mesh '{0}' has no positions")]
    MissingPositions(String),
    #[error("model contains no triangle meshes")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPart {
    pub name: String,
    pub geometry: Geometry,
    pub base_color: Color,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub parts: Vec<ModelPart>,
    pub clips: Vec<ClipInfo>,
}

impl ModelData {
    /// All parts merged into one geometry (character and tree meshes).
    pub fn merged_geometry(&self) -> Geometry {
        Geometry::merge(self.parts.iter().map(|p| &p.geometry))
    }

    /// Colour of the first part, used when parts are merged.
    pub fn primary_color(&self) -> Color {
        self.parts.first().map_or(Color::WHITE, |p| p.base_color)
    }
}

pub fn decode_model(bytes: &[u8]) -> Result<ModelData, ModelError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    if document.extensions_used().any(|ext| ext == DRACO_EXTENSION) {
        return Err(ModelError::Draco);
    }
    // Images are never sampled, so only buffers are resolved.
    let buffers = gltf::import_buffers(&document, None, blob)?;

    let mut parts = Vec::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            collect_node(&node, Mat4::IDENTITY, &buffers, &mut parts)?;
        }
    }
    if parts.is_empty() {
        return Err(ModelError::Empty);
    }

    let clips = document
        .animations()
        .map(|animation| {
            let duration = animation
                .channels()
                .filter_map(|channel| {
                    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
                    reader.read_inputs().map(|inputs| inputs.fold(0.0_f32, f32::max))
                })
                .fold(0.0_f32, f32::max);
            ClipInfo {
                name: animation.name().unwrap_or_default().to_string(),
                duration,
            }
        })
        .collect();

    Ok(ModelData { parts, clips })
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    parts: &mut Vec<ModelPart>,
) -> Result<(), ModelError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh
            .name()
            .or_else(|| node.name())
            .unwrap_or("unnamed")
            .to_string();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("Skipping non-triangle primitive in mesh '{}'", name);
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| ModelError::MissingPositions(name.clone()))?
                .map(Vec3::from)
                .collect();
            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let [r, g, b, _] = primitive.material().pbr_metallic_roughness().base_color_factor();
            parts.push(ModelPart {
                name: name.clone(),
                geometry: Geometry::new(positions, normals, indices).transformed(world),
                base_color: Color::from_linear([r, g, b]),
            });
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, parts)?;
    }
    Ok(())
}
