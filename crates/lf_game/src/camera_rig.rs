//! Third-person follow camera.

use glam::Vec3;
use lf_render::Camera3D;

/// Follows a target with a fixed offset. Position is smoothed by a constant
/// lerp factor per tick; aim is snapped to the target every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub offset: Vec3,
    pub lerp_factor: f32,
}

impl CameraRig {
    pub fn new(offset: Vec3, lerp_factor: f32) -> Self {
        Self {
            offset,
            lerp_factor,
        }
    }

    pub fn step(&self, target: Vec3, camera: &mut Camera3D) {
        let desired = target + self.offset;
        camera.position = camera.position.lerp(desired, self.lerp_factor);
        camera.look_at(target);
    }
}
