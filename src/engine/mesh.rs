use std::fmt;
use std::hash::Hasher;
use std::path::Path;

use glam::{Vec2, Vec3};
use rustc_hash::FxHasher;

#[derive(Debug)]
pub enum MeshError {
    IndexOutOfRange { face: usize, index: u32, vertex_count: usize },
    TexCoordCount { expected: usize, found: usize },
    Io(std::io::Error),
    Parse { line: usize, message: String },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::IndexOutOfRange { face, index, vertex_count } => write!(
                f,
                "face {} references vertex {} but the mesh has {} vertices",
                face, index, vertex_count
            ),
            MeshError::TexCoordCount { expected, found } => {
                write!(f, "expected {} texture coordinates, found {}", expected, found)
            }
            MeshError::Io(e) => write!(f, "failed to read mesh: {}", e),
            MeshError::Parse { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for MeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeshError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MeshError {
    fn from(e: std::io::Error) -> Self {
        MeshError::Io(e)
    }
}

/// An indexed triangle mesh. Immutable once built.
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    positions: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
    ) -> Result<Self, MeshError> {
        for (face, tri) in faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count: positions.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            positions,
            tex_coords: Vec::new(),
            faces,
        })
    }

    pub fn with_tex_coords(mut self, tex_coords: Vec<Vec2>) -> Result<Self, MeshError> {
        if tex_coords.len() != self.positions.len() {
            return Err(MeshError::TexCoordCount {
                expected: self.positions.len(),
                found: tex_coords.len(),
            });
        }
        self.tex_coords = tex_coords;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.tex_coords
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn face_positions(&self, face: usize) -> [Vec3; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Unit normal of a face in winding order, zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.face_positions(face);
        (b - a).cross(c - a).normalize_or_zero()
    }

    pub fn face_normals(&self) -> Vec<Vec3> {
        (0..self.faces.len()).map(|f| self.face_normal(f)).collect()
    }

    /// Deterministic hash of the geometry, used to key on-disk caches.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_usize(self.positions.len());
        for p in &self.positions {
            for c in p.to_array() {
                hasher.write_u32(c.to_bits());
            }
        }
        hasher.write_usize(self.faces.len());
        for face in &self.faces {
            for &i in face {
                hasher.write_u32(i);
            }
        }
        hasher.finish()
    }

    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        if self.positions.is_empty() {
            return (Vec3::ZERO, 0.0);
        }
        let (min, max) = self.positions.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), &p| (min.min(p), max.max(p)),
        );
        let center = (min + max) * 0.5;
        let radius = self
            .positions
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0, f32::max);
        (center, radius)
    }

    pub fn tetrahedron() -> Self {
        let positions = vec![
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ];
        let faces = vec![[0, 1, 3], [0, 2, 1], [0, 3, 2], [1, 2, 3]];
        Self::unchecked("tetrahedron", positions, faces)
    }

    /// Unit cube centred on the origin with welded corners.
    pub fn cube() -> Self {
        let positions = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -0.5 } else { 0.5 },
                    if i & 2 == 0 { -0.5 } else { 0.5 },
                    if i & 4 == 0 { -0.5 } else { 0.5 },
                )
            })
            .collect();
        let faces = vec![
            [0, 2, 3], [0, 3, 1], // -z
            [4, 5, 7], [4, 7, 6], // +z
            [0, 1, 5], [0, 5, 4], // -y
            [2, 6, 7], [2, 7, 3], // +y
            [0, 4, 6], [0, 6, 2], // -x
            [1, 3, 7], [1, 7, 5], // +x
        ];
        Self::unchecked("cube", positions, faces)
    }

    pub fn icosahedron() -> Self {
        let t = (1.0 + 5.0f32.sqrt()) * 0.5;
        let positions = [
            (-1.0, t, 0.0), (1.0, t, 0.0), (-1.0, -t, 0.0), (1.0, -t, 0.0),
            (0.0, -1.0, t), (0.0, 1.0, t), (0.0, -1.0, -t), (0.0, 1.0, -t),
            (t, 0.0, -1.0), (t, 0.0, 1.0), (-t, 0.0, -1.0), (-t, 0.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();
        let faces = vec![
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];
        Self::unchecked("icosahedron", positions, faces)
    }

    /// Two triangles sharing the edge (1,0,0)-(0,1,0). An open mesh.
    pub fn quad_pair() -> Self {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        Self::unchecked("quad_pair", positions, vec![[0, 1, 2], [1, 3, 2]])
    }

    /// Closed torus around the y axis.
    pub fn torus(major: f32, minor: f32, rings: u32, sides: u32) -> Self {
        let rings = rings.max(3);
        let sides = sides.max(3);
        let mut positions = Vec::with_capacity((rings * sides) as usize);
        let mut tex_coords = Vec::with_capacity(positions.capacity());
        for r in 0..rings {
            let u = r as f32 / rings as f32;
            let (su, cu) = (u * std::f32::consts::TAU).sin_cos();
            for s in 0..sides {
                let v = s as f32 / sides as f32;
                let (sv, cv) = (v * std::f32::consts::TAU).sin_cos();
                let radius = major + minor * cv;
                positions.push(Vec3::new(radius * cu, minor * sv, radius * su));
                tex_coords.push(Vec2::new(u, v));
            }
        }
        let index = |r: u32, s: u32| (r % rings) * sides + (s % sides);
        let mut faces = Vec::with_capacity((rings * sides * 2) as usize);
        for r in 0..rings {
            for s in 0..sides {
                let a = index(r, s);
                let b = index(r + 1, s);
                let c = index(r + 1, s + 1);
                let d = index(r, s + 1);
                faces.push([a, d, c]);
                faces.push([a, c, b]);
            }
        }
        Self {
            name: "torus".to_string(),
            positions,
            tex_coords,
            faces,
        }
    }

    /// Reads a Wavefront OBJ file. Polygons are fan-triangulated; texture
    /// coordinates are kept only when every vertex got exactly one.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self, MeshError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mesh")
            .to_string();
        Self::parse_obj(name, &source)
    }

    pub fn parse_obj(name: impl Into<String>, source: &str) -> Result<Self, MeshError> {
        let mut positions = Vec::new();
        let mut obj_tex_coords = Vec::new();
        let mut vertex_tex: Vec<Option<Vec2>> = Vec::new();
        let mut faces = Vec::new();

        for (line_idx, raw) in source.lines().enumerate() {
            let line = line_idx + 1;
            let err = |message: String| MeshError::Parse { line, message };
            let mut parts = raw.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let coords = parse_floats(parts, 3).map_err(err)?;
                    positions.push(Vec3::new(coords[0], coords[1], coords[2]));
                    vertex_tex.push(None);
                }
                Some("vt") => {
                    let coords = parse_floats(parts, 2).map_err(err)?;
                    obj_tex_coords.push(Vec2::new(coords[0], coords[1]));
                }
                Some("f") => {
                    let mut polygon = Vec::new();
                    for token in parts {
                        let mut refs = token.split('/');
                        let v = resolve_index(refs.next(), positions.len())
                            .ok_or_else(|| err(format!("bad vertex reference '{}'", token)))?;
                        if let Some(t) = refs.next().filter(|t| !t.is_empty()) {
                            let t = resolve_index(Some(t), obj_tex_coords.len()).ok_or_else(|| {
                                err(format!("bad texture reference '{}'", token))
                            })?;
                            vertex_tex[v as usize] = Some(obj_tex_coords[t as usize]);
                        }
                        polygon.push(v);
                    }
                    if polygon.len() < 3 {
                        return Err(err("face with fewer than 3 vertices".to_string()));
                    }
                    for i in 1..polygon.len() - 1 {
                        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        let mesh = Self::new(name, positions, faces)?;
        if !vertex_tex.is_empty() && vertex_tex.iter().all(Option::is_some) {
            let tex_coords = vertex_tex.into_iter().flatten().collect();
            mesh.with_tex_coords(tex_coords)
        } else {
            Ok(mesh)
        }
    }

    fn unchecked(name: &str, positions: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.to_string(),
            positions,
            tex_coords: Vec::new(),
            faces,
        }
    }
}

fn parse_floats<'a>(parts: impl Iterator<Item = &'a str>, count: usize) -> Result<Vec<f32>, String> {
    let values = parts
        .take(count)
        .map(|p| p.parse::<f32>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() < count {
        return Err(format!("expected {} numbers, found {}", count, values.len()));
    }
    Ok(values)
}

/// OBJ indices are 1-based; negative values count back from the end.
fn resolve_index(token: Option<&str>, len: usize) -> Option<u32> {
    let i: i64 = token?.parse().ok()?;
    let resolved = if i > 0 { i - 1 } else { len as i64 + i };
    (0..len as i64).contains(&resolved).then_some(resolved as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_indices() {
        let err = Mesh::new("bad", vec![Vec3::ZERO; 3], vec![[0, 1, 3]]).unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfRange { face: 0, index: 3, .. }));
    }

    #[test]
    fn primitives_face_outwards() {
        for mesh in [Mesh::tetrahedron(), Mesh::cube(), Mesh::icosahedron(), Mesh::torus(1.0, 0.3, 8, 6)] {
            let (center, _) = mesh.bounding_sphere();
            for f in 0..mesh.face_count() {
                let [a, b, c] = mesh.face_positions(f);
                let centroid = (a + b + c) / 3.0;
                let outward = if mesh.name() == "torus" {
                    // away from the tube centre line
                    let ring = Vec3::new(centroid.x, 0.0, centroid.z).normalize() * 1.0;
                    centroid - ring
                } else {
                    centroid - center
                };
                assert!(mesh.face_normal(f).dot(outward) > 0.0, "{} face {}", mesh.name(), f);
            }
        }
    }

    #[test]
    fn content_hash_tracks_geometry() {
        let a = Mesh::cube();
        let b = Mesh::cube();
        assert_eq!(a.content_hash(), b.content_hash());
        let moved = Mesh::new(
            "cube",
            a.positions().iter().map(|p| *p + Vec3::X).collect(),
            a.faces().to_vec(),
        )
        .unwrap();
        assert_ne!(a.content_hash(), moved.content_hash());
    }

    #[test]
    fn parses_obj_polygons_and_negative_indices() {
        let src = "# quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 -1/-1\n";
        let mesh = Mesh::parse_obj("quad", src).unwrap();
        assert_eq!(mesh.faces(), &[[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.tex_coords()[2], Vec2::new(1.0, 1.0));

        let normals_only = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let mesh = Mesh::parse_obj("tri", normals_only).unwrap();
        assert_eq!(mesh.faces(), &[[0, 1, 2]]);
        assert!(mesh.tex_coords().is_empty());

        let full = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n";
        let mesh = Mesh::parse_obj("tri", full).unwrap();
        assert_eq!(mesh.faces(), &[[0, 1, 2]]);
        assert_eq!(mesh.tex_coords()[1], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn obj_parse_errors_report_line() {
        let err = Mesh::parse_obj("broken", "v 0 0 0\nv 1 x 0\n").unwrap_err();
        assert!(matches!(err, MeshError::Parse { line: 2, .. }));
        let err = Mesh::parse_obj("broken", "v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, MeshError::Parse { line: 2, .. }));
    }
}
