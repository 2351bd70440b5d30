//! Pairs a renderable mesh with a box-shaped physics body.
//!
//! The body is the source of truth. Each tick [`Entity::sync`] copies its
//! pose onto the mesh; the mesh never writes back.

use glam::Vec3;
use lf_physics::{BodyHandle, BoxBodyDesc, PhysicsWorld};
use lf_render::{GeometryId, MaterialId, MeshId, SceneGraph, Transform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub mesh: MeshId,
    pub body: BodyHandle,
    /// Scaled centre of the mesh's local bounds. The body sits here while the
    /// mesh origin does not, so syncing subtracts it again.
    pub anchor: Vec3,
}

impl Entity {
    /// Copy the body's position and rotation onto the mesh.
    pub fn sync(&self, physics: &PhysicsWorld, scene: &mut SceneGraph) {
        let (Some(body), Some(node)) = (physics.body(self.body), scene.mesh_mut(self.mesh)) else {
            return;
        };
        node.transform.rotation = body.rotation;
        node.transform.translation = body.position - body.rotation * self.anchor;
    }

    /// Remove both halves from their owners.
    pub fn remove(self, physics: &mut PhysicsWorld, scene: &mut SceneGraph) {
        scene.remove_mesh(self.mesh);
        physics.remove_body(self.body);
    }
}

/// Create a box body for `mesh`: the local bounding box scaled by
/// `world_scale`, positioned at the scaled box centre. `mass == 0` makes it
/// static. Returns `None` when the mesh or its geometry is missing or empty.
pub fn bind(
    scene: &SceneGraph,
    physics: &mut PhysicsWorld,
    mesh: MeshId,
    world_scale: Vec3,
    mass: f32,
) -> Option<Entity> {
    let node = scene.mesh(mesh)?;
    let bounds = scene.geometry(node.geometry)?.bounds()?;
    let anchor = bounds.center() * world_scale;
    let body = physics.add_box(BoxBodyDesc {
        half_extents: bounds.size() * world_scale * 0.5,
        position: anchor,
        mass,
    });
    Some(Entity { mesh, body, anchor })
}

/// Add a mesh at the origin with `world_scale` and bind it in one go.
pub fn spawn(
    scene: &mut SceneGraph,
    physics: &mut PhysicsWorld,
    geometry: GeometryId,
    material: MaterialId,
    world_scale: Vec3,
    mass: f32,
) -> Option<Entity> {
    let mesh = scene.add_mesh(geometry, material, Transform::from_scale(world_scale));
    let entity = bind(scene, physics, mesh, world_scale, mass);
    if entity.is_none() {
        scene.remove_mesh(mesh);
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::color::Color;
    use lf_physics::PhysicsConfig;
    use lf_render::{Geometry, Material};

    fn offset_box() -> Geometry {
        // x in [8, 12], y in [0, 20], z in [-2, 2]
        Geometry::cuboid(Vec3::new(2.0, 10.0, 2.0)).transformed(glam::Mat4::from_translation(
            Vec3::new(10.0, 10.0, 0.0),
        ))
    }

    fn setup() -> (SceneGraph, PhysicsWorld, GeometryId, MaterialId) {
        let mut scene = SceneGraph::new(Color::BLACK);
        let geometry = scene.add_geometry(offset_box());
        let material = scene.add_material(Material { color: Color::WHITE });
        (scene, PhysicsWorld::new(PhysicsConfig::default()), geometry, material)
    }

    #[test]
    fn body_sits_at_scaled_bounds_centre() {
        let (mut scene, mut physics, geometry, material) = setup();
        let entity = spawn(&mut scene, &mut physics, geometry, material, Vec3::splat(0.5), 0.0).unwrap();
        let body = physics.body(entity.body).unwrap();
        assert_eq!(body.position, Vec3::new(5.0, 5.0, 0.0));
        assert!(body.is_static);
        assert_eq!(entity.anchor, Vec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn positive_mass_is_dynamic() {
        let (mut scene, mut physics, geometry, material) = setup();
        let entity = spawn(&mut scene, &mut physics, geometry, material, Vec3::ONE, 1.0).unwrap();
        assert!(!physics.body(entity.body).unwrap().is_static);
    }

    #[test]
    fn sync_keeps_mesh_origin_relative_to_body() {
        let (mut scene, mut physics, geometry, material) = setup();
        let entity = spawn(&mut scene, &mut physics, geometry, material, Vec3::ONE, 1.0).unwrap();
        physics.set_position(entity.body, Vec3::new(10.0, 12.0, 1.0));
        entity.sync(&physics, &mut scene);
        let node = scene.mesh(entity.mesh).unwrap();
        assert_eq!(node.transform.translation, Vec3::new(0.0, 2.0, 1.0));
        assert_eq!(node.transform.scale, Vec3::ONE);
    }

    #[test]
    fn empty_geometry_is_not_bound() {
        let (mut scene, mut physics, _, material) = setup();
        let empty = scene.add_geometry(Geometry::default());
        assert!(spawn(&mut scene, &mut physics, empty, material, Vec3::ONE, 1.0).is_none());
        assert_eq!(scene.mesh_count(), 0);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn remove_clears_both_owners() {
        let (mut scene, mut physics, geometry, material) = setup();
        let entity = spawn(&mut scene, &mut physics, geometry, material, Vec3::ONE, 0.0).unwrap();
        entity.remove(&mut physics, &mut scene);
        assert_eq!(scene.mesh_count(), 0);
        assert_eq!(physics.body_count(), 0);
    }
}
