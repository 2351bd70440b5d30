//! Frame submission.
//!
//! Gameplay code hands the renderer a [`SceneGraph`] and a [`Camera3D`]
//! through [`FrameSink`]; it never sees wgpu. Meshes are batched by geometry
//! and drawn instanced, so the letters of a word share one draw call.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::camera::Camera3D;
use crate::gpu_context::GpuContext;
use crate::pipeline::{GlobalsUniform, MeshPipeline};
use crate::scene::{GeometryId, Lighting, SceneGraph};
use crate::vertex::{InstanceRaw, MeshVertex};

/// Receives one finished scene per frame.
pub trait FrameSink {
    fn submit(&mut self, scene: &SceneGraph, camera: &Camera3D);
}

/// Extra pass composited on top of the scene (the egui overlay).
pub trait OverlayPass {
    fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: (u32, u32),
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawBatch {
    pub geometry: GeometryId,
    pub instances: Range<u32>,
}

/// Flatten the scene's meshes into instance data grouped by geometry.
/// Meshes whose geometry or material is gone, or whose geometry is empty,
/// are skipped.
pub fn build_instances(scene: &SceneGraph) -> (Vec<InstanceRaw>, Vec<DrawBatch>) {
    let mut grouped: BTreeMap<GeometryId, Vec<InstanceRaw>> = BTreeMap::new();
    for (_, node) in scene.meshes() {
        let Some(geometry) = scene.geometry(node.geometry) else {
            continue;
        };
        if geometry.is_empty() {
            continue;
        }
        let Some(material) = scene.material(node.material) else {
            continue;
        };
        let [r, g, b] = material.color.to_linear();
        grouped.entry(node.geometry).or_default().push(InstanceRaw {
            model: node.transform.matrix().to_cols_array_2d(),
            color: [r, g, b, 1.0],
        });
    }

    let mut instances = Vec::new();
    let mut batches = Vec::with_capacity(grouped.len());
    for (geometry, group) in grouped {
        let start = instances.len() as u32;
        instances.extend(group);
        batches.push(DrawBatch {
            geometry,
            instances: start..instances.len() as u32,
        });
    }
    (instances, batches)
}

pub fn globals_for(camera: &Camera3D, lighting: &Lighting) -> GlobalsUniform {
    let dir = lighting.dir_position.try_normalize().unwrap_or(glam::Vec3::Y);
    let [lr, lg, lb] = lighting.dir_color.to_linear();
    let [ar, ag, ab] = lighting.ambient_color.to_linear();
    let li = lighting.dir_intensity;
    let ai = lighting.ambient_intensity;
    GlobalsUniform {
        view_proj: camera.build_uniform().view_proj,
        light_dir: [dir.x, dir.y, dir.z, 0.0],
        light_color: [lr * li, lg * li, lb * li, 1.0],
        ambient: [ar * ai, ag * ai, ab * ai, 1.0],
    }
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

pub struct Renderer {
    pipeline: MeshPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    geometries: HashMap<GeometryId, GpuGeometry>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl Renderer {
    pub fn new(gpu: &GpuContext) -> Self {
        let pipeline = MeshPipeline::new(&gpu.device, gpu.surface_format);
        let globals_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Uniform Buffer"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = pipeline.create_globals_bind_group(&gpu.device, &globals_buffer);
        let instance_buffer = create_instance_buffer(&gpu.device, 1);
        Self {
            pipeline,
            globals_buffer,
            globals_bind_group,
            geometries: HashMap::new(),
            instance_buffer,
            instance_capacity: 1,
        }
    }

    /// Draw `scene` and optionally an overlay, then present.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &SceneGraph,
        camera: &Camera3D,
        overlay: Option<&mut dyn OverlayPass>,
    ) {
        let (instances, batches) = build_instances(scene);
        self.sync_geometries(&gpu.device, scene, &batches);
        self.ensure_instance_capacity(&gpu.device, instances.len());
        if !instances.is_empty() {
            gpu.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        let globals = globals_for(camera, &scene.lighting);
        gpu.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::cast_slice(&[globals]));

        let Some((output, view)) = gpu.begin_frame() else {
            return;
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b] = scene.background.to_linear();
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            render_pass.set_pipeline(&self.pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for batch in &batches {
                let Some(geometry) = self.geometries.get(&batch.geometry) else {
                    continue;
                };
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..geometry.index_count, 0, batch.instances.clone());
            }
        }

        if let Some(overlay) = overlay {
            overlay.encode(&gpu.device, &gpu.queue, &mut encoder, &view, gpu.size);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn sync_geometries(&mut self, device: &wgpu::Device, scene: &SceneGraph, batches: &[DrawBatch]) {
        self.geometries.retain(|id, _| scene.geometry(*id).is_some());
        for batch in batches {
            if self.geometries.contains_key(&batch.geometry) {
                continue;
            }
            let Some(geometry) = scene.geometry(batch.geometry) else {
                continue;
            };
            let vertices: Vec<MeshVertex> = geometry
                .positions
                .iter()
                .zip(&geometry.normals)
                .map(|(p, n)| MeshVertex {
                    position: p.to_array(),
                    normal: n.to_array(),
                })
                .collect();
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            self.geometries.insert(
                batch.geometry,
                GpuGeometry {
                    vertex_buffer,
                    index_buffer,
                    index_count: geometry.indices.len() as u32,
                },
            );
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, count: usize) {
        let needed = count.max(1);
        if needed > self.instance_capacity {
            self.instance_capacity = needed.next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
        }
    }

    pub fn cached_geometry_count(&self) -> usize {
        self.geometries.len()
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Geometry;
    use crate::scene::{Material, Transform};
    use glam::Vec3;
    use lf_core::color::Color;

    #[test]
    fn meshes_sharing_geometry_form_one_batch() {
        let mut scene = SceneGraph::new(Color::BLACK);
        let cube = scene.add_geometry(Geometry::cuboid(Vec3::splat(0.5)));
        let floor = scene.add_geometry(Geometry::plane(10.0));
        let white = scene.add_material(Material { color: Color::WHITE });
        scene.add_mesh(cube, white, Transform::IDENTITY);
        scene.add_mesh(floor, white, Transform::IDENTITY);
        scene.add_mesh(cube, white, Transform::IDENTITY);

        let (instances, batches) = build_instances(&scene);
        assert_eq!(instances.len(), 3);
        assert_eq!(
            batches,
            vec![
                DrawBatch { geometry: cube, instances: 0..2 },
                DrawBatch { geometry: floor, instances: 2..3 },
            ]
        );
    }

    #[test]
    fn orphaned_and_empty_meshes_are_skipped() {
        let mut scene = SceneGraph::new(Color::BLACK);
        let cube = scene.add_geometry(Geometry::cuboid(Vec3::ONE));
        let gone = scene.add_geometry(Geometry::cuboid(Vec3::ONE));
        let empty = scene.add_geometry(Geometry::default());
        let white = scene.add_material(Material { color: Color::WHITE });
        let removed = scene.add_mesh(cube, white, Transform::IDENTITY);
        scene.remove_mesh(removed);
        scene.add_mesh(gone, white, Transform::IDENTITY);
        scene.add_mesh(empty, white, Transform::IDENTITY);
        scene.remove_geometry(gone);

        let (instances, batches) = build_instances(&scene);
        assert!(instances.is_empty());
        assert!(batches.is_empty());
    }

    #[test]
    fn instance_carries_transform_and_linear_color() {
        let mut scene = SceneGraph::new(Color::BLACK);
        let cube = scene.add_geometry(Geometry::cuboid(Vec3::ONE));
        let red = scene.add_material(Material { color: Color::new(1.0, 0.0, 0.0) });
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            ..Transform::IDENTITY
        };
        scene.add_mesh(cube, red, t);

        let (instances, _) = build_instances(&scene);
        assert_eq!(instances[0].model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(instances[0].color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn globals_point_towards_light_position() {
        let camera = Camera3D::new(800, 600);
        let lighting = Lighting {
            dir_position: Vec3::new(0.0, 10.0, 0.0),
            dir_intensity: 0.5,
            ..Lighting::default()
        };
        let globals = globals_for(&camera, &lighting);
        assert_eq!(globals.light_dir, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(globals.light_color, [0.5, 0.5, 0.5, 1.0]);
    }
}
