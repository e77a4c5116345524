use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::engine::infinite_plane::InfinitePlanePolygon;
use crate::engine::math::{Frustum, Plane};
use crate::engine::mesh::Mesh;
use crate::engine::shadow_volume::ShadowVolumeGeometry;
use crate::engine::vbo::{MeshBuffers, MeshVertex, MeshVertexData};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_pos: [f32; 4],
    pub eye_pos: [f32; 4],
    /// x ambient, y shadow extent (0 = infinity), z shadow alpha
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x = 1 for the ground checker
    pub params: [f32; 4],
}

pub fn uniform_bind_group_layout(device: &Device, label: &str, size: usize) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX_FRAGMENT,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(size as u64),
            },
            count: None,
        }],
    })
}

/// A uniform buffer and the bind group exposing it.
pub struct UniformSlot {
    pub buffer: Buffer,
    pub bind_group: BindGroup,
}

impl UniformSlot {
    pub fn new<T: Pod>(device: &Device, layout: &BindGroupLayout, label: &str, value: &T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(value),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn write<T: Pod>(&self, queue: &Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

/// Per-frame view of the world handed to the shadow renderer.
#[derive(Clone, Copy, Debug)]
pub struct FrameParams {
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub light_pos: Vec3,
    pub ambient: f32,
    pub shadow_extent: f32,
    pub shadow_alpha: f32,
}

impl FrameParams {
    pub fn uniforms(&self) -> SceneUniforms {
        SceneUniforms {
            view_proj: self.view_proj.to_cols_array_2d(),
            light_pos: self.light_pos.extend(1.0).to_array(),
            eye_pos: self.eye.extend(1.0).to_array(),
            params: [self.ambient, self.shadow_extent, self.shadow_alpha, 0.0],
        }
    }
}

/// A shadow-casting mesh: its shaded buffers, its shadow volume and its
/// placement.
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshBuffers,
    pub volume: Buffer,
    pub volume_vertex_count: u32,
    pub uniforms: UniformSlot,
    pub transform: Mat4,
    pub color: Vec4,
    bounds: (Vec3, f32),
}

impl SceneObject {
    pub fn new(
        device: &Device,
        object_layout: &BindGroupLayout,
        mesh: &Mesh,
        scale: f32,
        volume: &ShadowVolumeGeometry,
        transform: Mat4,
        color: Vec4,
    ) -> Self {
        let data = MeshVertexData::from_mesh(mesh, scale);
        let buffers = MeshBuffers::upload(device, mesh.name(), &data);
        let volume_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Shadow Volume", mesh.name())),
            contents: bytemuck::cast_slice(&volume.vertices),
            usage: BufferUsages::VERTEX,
        });
        let (center, radius) = mesh.bounding_sphere();
        let uniforms = UniformSlot::new(
            device,
            object_layout,
            &format!("{} Object Uniforms", mesh.name()),
            &object_uniforms(transform, color, false),
        );
        Self {
            name: mesh.name().to_string(),
            mesh: buffers,
            volume: volume_buffer,
            volume_vertex_count: volume.vertices.len() as u32,
            uniforms,
            transform,
            color,
            bounds: (center * scale, radius * scale),
        }
    }

    pub fn set_transform(&mut self, queue: &Queue, transform: Mat4) {
        self.transform = transform;
        self.uniforms.write(queue, &object_uniforms(transform, self.color, false));
    }

    pub fn is_visible(&self, frustum: &Frustum) -> bool {
        let (center, radius) = self.bounds;
        let scale = self.transform.x_axis.truncate().length();
        frustum.contains_sphere(self.transform.transform_point3(center), radius * scale)
    }
}

fn object_uniforms(model: Mat4, color: Vec4, checker: bool) -> ObjectUniforms {
    ObjectUniforms {
        model: model.to_cols_array_2d(),
        color: color.to_array(),
        params: [if checker { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
    }
}

/// Ground polygon rebuilt every frame from the frustum clip.
pub struct GroundPlane {
    pub plane: Plane,
    pub far_distance: f32,
    pub vertex_buffer: Buffer,
    pub vertex_count: u32,
    pub uniforms: UniformSlot,
}

impl GroundPlane {
    /// Fan of a 5-gon.
    const MAX_FAN_VERTICES: usize = 9;

    pub fn new(device: &Device, object_layout: &BindGroupLayout, plane: Plane, far_distance: f32) -> Self {
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("Ground Vertex Buffer"),
            size: (Self::MAX_FAN_VERTICES * std::mem::size_of::<MeshVertex>()) as BufferAddress,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniforms = UniformSlot::new(
            device,
            object_layout,
            "Ground Object Uniforms",
            &object_uniforms(Mat4::IDENTITY, Vec4::new(0.55, 0.6, 0.5, 1.0), true),
        );
        Self {
            plane,
            far_distance,
            vertex_buffer,
            vertex_count: 0,
            uniforms,
        }
    }

    pub fn update(&mut self, queue: &Queue, inv_view_proj: Mat4, eye: Vec3) {
        let polygon = InfinitePlanePolygon::compute(&self.plane, inv_view_proj, eye, self.far_distance);
        let normal = self.plane.normal().to_array();
        let vertices: Vec<MeshVertex> = polygon
            .triangle_fan()
            .into_iter()
            .map(|p| MeshVertex {
                position: p.to_array(),
                normal,
                uv: [p.x, p.z],
            })
            .collect();
        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        self.vertex_count = vertices.len() as u32;
    }

    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>) {
        if self.vertex_count == 0 {
            return;
        }
        pass.set_bind_group(1, &self.uniforms.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}
