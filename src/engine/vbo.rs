use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::engine::mesh::Mesh;

/// Interleaved position/normal/texcoord vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x3,
                },
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as BufferAddress,
                    shader_location: 1,
                    format: VertexFormat::Float32x3,
                },
                VertexAttribute {
                    offset: (2 * std::mem::size_of::<[f32; 3]>()) as BufferAddress,
                    shader_location: 2,
                    format: VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// CPU side of a mesh ready for upload. Vertices are unshared so every
/// corner carries its face normal; three consecutive vertices per face.
#[derive(Debug, Clone, Default)]
pub struct MeshVertexData {
    pub vertices: Vec<MeshVertex>,
}

impl MeshVertexData {
    pub fn from_mesh(mesh: &Mesh, scale: f32) -> Self {
        let mut vertices = Vec::with_capacity(mesh.face_count() * 3);
        for (f, face) in mesh.faces().iter().enumerate() {
            let normal = mesh.face_normal(f).to_array();
            for &i in face {
                let uv = mesh
                    .tex_coords()
                    .get(i as usize)
                    .copied()
                    .unwrap_or(Vec2::ZERO);
                vertices.push(MeshVertex {
                    position: (mesh.positions()[i as usize] * scale).to_array(),
                    normal,
                    uv: uv.to_array(),
                });
            }
        }
        Self { vertices }
    }
}

/// GPU buffer owned by a single mesh; released when dropped.
pub struct MeshBuffers {
    pub vertex_buffer: Buffer,
    pub num_vertices: u32,
}

impl MeshBuffers {
    pub fn upload(device: &Device, label: &str, data: &MeshVertexData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: BufferUsages::VERTEX,
        });

        Self {
            vertex_buffer,
            num_vertices: data.vertices.len() as u32,
        }
    }

    pub fn draw<'a>(&'a self, pass: &mut RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.num_vertices, 0..1);
    }
}
