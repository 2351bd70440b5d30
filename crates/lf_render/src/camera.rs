use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Perspective camera that always aims at `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 1.0, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 70.0,
            aspect: 1.0,
            near: 0.01,
            far: 1000.0,
        };
        camera.set_viewport(viewport_width, viewport_height);
        camera
    }

    /// Recompute the aspect ratio. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.target - self.position;
        if forward.length_squared() < f32::EPSILON || forward.cross(self.up).length_squared() < f32::EPSILON {
            // Degenerate aim (camera on the target or looking straight along up).
            return Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y);
        }
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: (self.projection_matrix() * self.view_matrix()).to_cols_array_2d(),
        }
    }
}
