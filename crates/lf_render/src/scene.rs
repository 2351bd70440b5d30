//! Renderable scene state.
//!
//! The scene graph owns mesh lifetime the same way the physics world owns
//! body lifetime: a mesh is drawn every frame until it is explicitly removed.
//! Nothing here touches the GPU, so gameplay code and tests can build and
//! inspect scenes headless.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use lf_core::color::Color;

use crate::mesh::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub dir_color: Color,
    pub dir_intensity: f32,
    /// Position of the directional light; it shines towards the origin.
    pub dir_position: Vec3,
    pub ambient_color: Color,
    pub ambient_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            dir_color: Color::WHITE,
            dir_intensity: 1.0,
            dir_position: Vec3::new(-30.0, 10.0, -11.5),
            ambient_color: Color::WHITE,
            ambient_intensity: 0.4,
        }
    }
}

pub struct SceneGraph {
    geometries: HashMap<GeometryId, Arc<Geometry>>,
    materials: Vec<Material>,
    meshes: BTreeMap<MeshId, MeshNode>,
    next_mesh: u64,
    next_geometry: u64,
    pub lighting: Lighting,
    pub background: Color,
}

impl SceneGraph {
    pub fn new(background: Color) -> Self {
        Self {
            geometries: HashMap::new(),
            materials: Vec::new(),
            meshes: BTreeMap::new(),
            next_mesh: 0,
            next_geometry: 0,
            lighting: Lighting::default(),
            background,
        }
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        let id = GeometryId(self.next_geometry);
        self.next_geometry += 1;
        self.geometries.insert(id, Arc::new(geometry));
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Arc<Geometry>> {
        self.geometries.get(&id)
    }

    /// Drop a geometry. Meshes still pointing at it are skipped when drawing.
    pub fn remove_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.remove(&id).is_some()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    pub fn add_mesh(&mut self, geometry: GeometryId, material: MaterialId, transform: Transform) -> MeshId {
        let id = MeshId(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(
            id,
            MeshNode {
                geometry,
                material,
                transform,
            },
        );
        id
    }

    pub fn remove_mesh(&mut self, id: MeshId) -> Option<MeshNode> {
        self.meshes.remove(&id)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshNode> {
        self.meshes.get(&id)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut MeshNode> {
        self.meshes.get_mut(&id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Meshes in creation order.
    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &MeshNode)> {
        self.meshes.iter().map(|(id, node)| (*id, node))
    }
}
