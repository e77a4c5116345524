//! Shadow-volume geometry for Z-fail stencil shadows.
//!
//! A mesh is turned into one flat triangle list of [`ShadowVolumeVertex`]:
//! first every face of the mesh (the caps), then one degenerate quad per
//! shared edge. Every vertex carries the normal of the face it came from, so
//! the volume shader can push the vertices of faces turned away from the
//! light out along the light ray. Quads whose two faces agree stay
//! degenerate; quads on the silhouette open up into the side walls.

mod cache;

pub use cache::{read_cache_file, write_cache_file, CacheError, ShadowVolumeCache};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rustc_hash::FxHashMap;
use wgpu::*;

use crate::engine::mesh::Mesh;

/// Position and owning face normal, 24 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ShadowVolumeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl ShadowVolumeVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<ShadowVolumeVertex>() as BufferAddress,
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
            ],
        }
    }
}

/// A directed face edge together with the normal of its face.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub a: Vec3,
    pub b: Vec3,
    pub normal: Vec3,
}

impl Edge {
    pub fn new(a: Vec3, b: Vec3, normal: Vec3) -> Self {
        Self { a, b, normal }
    }

    /// Same endpoints, in either order.
    pub fn same_edge(&self, other: &Edge) -> bool {
        self.key() == other.key()
    }

    /// Order-independent identity of the endpoint pair.
    fn key(&self) -> EdgeKey {
        let a = position_bits(self.a);
        let b = position_bits(self.b);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

type EdgeKey = ([u32; 3], [u32; 3]);

fn position_bits(p: Vec3) -> [u32; 3] {
    // +0.0 folds -0.0 into 0.0
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowVolumeGeometry {
    pub vertices: Vec<ShadowVolumeVertex>,
    pub base_vertex_count: usize,
    /// Edges left without a partner face. `None` when read from the cache.
    pub unmatched_edges: Option<usize>,
}

impl ShadowVolumeGeometry {
    pub fn base(&self) -> &[ShadowVolumeVertex] {
        &self.vertices[..self.base_vertex_count]
    }

    pub fn silhouette(&self) -> &[ShadowVolumeVertex] {
        &self.vertices[self.base_vertex_count..]
    }

    pub fn quad_count(&self) -> usize {
        self.silhouette().len() / 6
    }

    pub fn is_watertight(&self) -> Option<bool> {
        self.unmatched_edges.map(|n| n == 0)
    }
}

/// Builds the shadow volume of one mesh at a uniform scale.
pub struct ShadowVolumeMesh<'a> {
    mesh: &'a Mesh,
    scale: f32,
}

impl<'a> ShadowVolumeMesh<'a> {
    pub fn new(mesh: &'a Mesh, scale: f32) -> Self {
        Self { mesh, scale }
    }

    pub fn build(&self) -> ShadowVolumeGeometry {
        let mesh = self.mesh;
        let mut base = Vec::with_capacity(mesh.face_count() * 3);
        let mut quads = Vec::with_capacity(mesh.face_count() * 9);
        let mut pending: FxHashMap<EdgeKey, Vec<Edge>> = FxHashMap::default();

        for f in 0..mesh.face_count() {
            let normal = mesh.face_normal(f);
            let corners = mesh.face_positions(f).map(|p| p * self.scale);

            for &p in &corners {
                base.push(ShadowVolumeVertex::new(p, normal));
            }

            for i in 0..3 {
                let edge = Edge::new(corners[i], corners[(i + 1) % 3], normal);
                let key = edge.key();
                let partner = pending.get_mut(&key).and_then(|edges| edges.pop());
                match partner {
                    Some(other) => push_edge_quad(&mut quads, &edge, &other),
                    None => pending.entry(key).or_default().push(edge),
                }
            }
        }

        let unmatched: usize = pending.values().map(Vec::len).sum();
        if unmatched > 0 {
            log::warn!(
                "mesh '{}' is not closed: {} unmatched edges, its shadow volume will have holes",
                mesh.name(),
                unmatched
            );
        }
        log::debug!(
            "built shadow volume for '{}': {} faces, {} edge quads",
            mesh.name(),
            mesh.face_count(),
            quads.len() / 6
        );

        let base_vertex_count = base.len();
        base.extend(quads);
        ShadowVolumeGeometry {
            vertices: base,
            base_vertex_count,
            unmatched_edges: Some(unmatched),
        }
    }

    /// Reads the cached volume for this mesh, building and storing it when
    /// there is none. A corrupted cache file is replaced. Only read-side
    /// failures are returned; a volume that cannot be stored is still used.
    pub fn load_or_build(&self, cache: &ShadowVolumeCache) -> Result<ShadowVolumeGeometry, CacheError> {
        match cache.load(self.mesh, self.scale) {
            Ok(geometry) => {
                log::debug!("loaded shadow volume for '{}' from cache", self.mesh.name());
                return Ok(geometry);
            }
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(CacheError::Corrupted { path, reason }) => {
                log::warn!("discarding corrupted shadow volume cache {}: {}", path.display(), reason);
                std::fs::remove_file(&path)?;
            }
            Err(e) => return Err(e),
        }

        let geometry = self.build();
        if let Err(e) = cache.store(self.mesh, self.scale, &geometry.vertices) {
            log::warn!("cannot cache shadow volume for '{}': {}", self.mesh.name(), e);
        }
        Ok(geometry)
    }
}

/// Degenerate quad joining `edge` (a→b on the current face) with the
/// already seen `other` face across the same edge. The wall winds b, a on
/// the current face's side and a, b on the other side.
fn push_edge_quad(out: &mut Vec<ShadowVolumeVertex>, edge: &Edge, other: &Edge) {
    let (a, b) = (edge.a, edge.b);
    let (n_cur, n_other) = (edge.normal, other.normal);
    out.extend_from_slice(&[
        ShadowVolumeVertex::new(b, n_cur),
        ShadowVolumeVertex::new(a, n_cur),
        ShadowVolumeVertex::new(a, n_other),
        ShadowVolumeVertex::new(b, n_cur),
        ShadowVolumeVertex::new(a, n_other),
        ShadowVolumeVertex::new(b, n_other),
    ]);
}
