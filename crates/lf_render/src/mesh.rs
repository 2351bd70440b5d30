//! CPU-side triangle geometry.

use glam::{Mat3, Mat4, Vec3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Build from raw arrays. Missing or mismatched normals are replaced by +Y.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            vec![Vec3::Y; positions.len()]
        };
        Self {
            positions,
            normals,
            indices,
        }
    }

    /// Axis-aligned box centred on the origin.
    pub fn cuboid(half: Vec3) -> Self {
        // (normal, u, v) with u x v == normal so every face winds CCW from outside.
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u_dir, v_dir) in faces {
            let base = positions.len() as u32;
            for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = normal + u_dir * u + v_dir * v;
                positions.push(corner * half);
                normals.push(normal);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            positions,
            normals,
            indices,
        }
    }

    /// Flat square in the XZ plane facing +Y.
    pub fn plane(half_extent: f32) -> Self {
        let h = half_extent;
        Self {
            positions: vec![
                Vec3::new(-h, 0.0, h),
                Vec3::new(h, 0.0, h),
                Vec3::new(h, 0.0, -h),
                Vec3::new(-h, 0.0, -h),
            ],
            normals: vec![Vec3::Y; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.positions.iter().copied())
    }

    /// Apply an affine transform to positions and normals.
    pub fn transformed(&self, matrix: Mat4) -> Geometry {
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
        Geometry {
            positions: self
                .positions
                .iter()
                .map(|&p| matrix.transform_point3(p))
                .collect(),
            normals: self
                .normals
                .iter()
                .map(|&n| (normal_matrix * n).normalize_or_zero())
                .collect(),
            indices: self.indices.clone(),
        }
    }

    /// Translate so the bounding box is centred on the origin.
    pub fn centered(mut self) -> Geometry {
        if let Some(bounds) = self.bounds() {
            let c = bounds.center();
            for p in &mut self.positions {
                *p -= c;
            }
        }
        self
    }

    /// Concatenate several geometries into one, rebasing indices.
    pub fn merge<'a>(parts: impl IntoIterator<Item = &'a Geometry>) -> Geometry {
        let mut out = Geometry::default();
        for part in parts {
            let base = out.positions.len() as u32;
            out.positions.extend_from_slice(&part.positions);
            out.normals.extend_from_slice(&part.normals);
            out.indices.extend(part.indices.iter().map(|i| i + base));
        }
        out
    }
}
