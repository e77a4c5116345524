use std::fs;
use std::path::PathBuf;

use bizsdk::engine::mesh::Mesh;
use bizsdk::engine::shadow_volume::{
    read_cache_file, write_cache_file, CacheError, ShadowVolumeCache, ShadowVolumeMesh, ShadowVolumeVertex,
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bizsdk-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn sorted_records(vertices: &[ShadowVolumeVertex]) -> Vec<[u32; 6]> {
    let mut records: Vec<[u32; 6]> = vertices
        .iter()
        .map(|v| {
            let p = v.position.map(f32::to_bits);
            let n = v.normal.map(f32::to_bits);
            [p[0], p[1], p[2], n[0], n[1], n[2]]
        })
        .collect();
    records.sort_unstable();
    records
}

#[test]
fn closed_meshes_get_one_quad_per_edge() {
    for (mesh, faces, edges) in [
        (Mesh::tetrahedron(), 4, 6),
        (Mesh::cube(), 12, 18),
        (Mesh::icosahedron(), 20, 30),
        (Mesh::torus(1.0, 0.3, 12, 8), 192, 288),
    ] {
        let geometry = ShadowVolumeMesh::new(&mesh, 1.0).build();
        assert_eq!(geometry.base().len(), faces * 3, "{}", mesh.name());
        assert_eq!(geometry.quad_count(), edges, "{}", mesh.name());
        assert_eq!(geometry.vertices.len(), faces * 3 + edges * 6);
        assert_eq!(geometry.is_watertight(), Some(true), "{}", mesh.name());
    }
}

#[test]
fn base_triangles_carry_their_face_normal() {
    let mesh = Mesh::cube();
    let geometry = ShadowVolumeMesh::new(&mesh, 1.0).build();
    for (f, triangle) in geometry.base().chunks(3).enumerate() {
        let normal = mesh.face_normal(f).to_array();
        assert!(triangle.iter().all(|v| v.normal == normal));
    }
}

#[test]
fn result_does_not_depend_on_face_order() {
    let mesh = Mesh::icosahedron();
    let reversed = Mesh::new(
        "icosahedron-reversed",
        mesh.positions().to_vec(),
        mesh.faces().iter().rev().copied().collect(),
    )
    .unwrap();
    let a = ShadowVolumeMesh::new(&mesh, 2.0).build();
    let b = ShadowVolumeMesh::new(&reversed, 2.0).build();
    assert_eq!(a.quad_count(), b.quad_count());
    assert_eq!(sorted_records(&a.vertices), sorted_records(&b.vertices));
}

#[test]
fn open_quad_pair_has_a_single_shared_edge() {
    let geometry = ShadowVolumeMesh::new(&Mesh::quad_pair(), 1.0).build();
    assert_eq!(geometry.vertices.len(), 12);
    assert_eq!(geometry.quad_count(), 1);
    assert_eq!(geometry.unmatched_edges, Some(4));
    assert_eq!(geometry.is_watertight(), Some(false));
}

#[test]
fn cache_round_trip_is_bit_exact() {
    let dir = scratch_dir("round-trip");
    for mesh in [Mesh::quad_pair(), Mesh::torus(1.0, 0.25, 10, 6)] {
        let built = ShadowVolumeMesh::new(&mesh, 1.5).build();

        let path = dir.join(format!("{}.svc", mesh.name()));
        write_cache_file(&path, &built.vertices).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 4 + built.vertices.len() * 24);
        assert_eq!(i32::from_ne_bytes(bytes[..4].try_into().unwrap()) as usize, built.vertices.len());

        let read = read_cache_file(&path).unwrap();
        assert_eq!(read.len(), built.vertices.len());
        for (x, y) in read.iter().zip(&built.vertices) {
            assert_eq!(x.position.map(f32::to_bits), y.position.map(f32::to_bits));
            assert_eq!(x.normal.map(f32::to_bits), y.normal.map(f32::to_bits));
        }
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn load_or_build_fills_and_then_reads_the_cache() {
    let dir = scratch_dir("load-or-build");
    let cache = ShadowVolumeCache::new(dir.join("nested"));
    let mesh = Mesh::cube();
    let builder = ShadowVolumeMesh::new(&mesh, 1.0);

    let first = builder.load_or_build(&cache).unwrap();
    assert_eq!(first.is_watertight(), Some(true));
    assert!(cache.path_for(&mesh, 1.0).exists());

    let second = builder.load_or_build(&cache).unwrap();
    assert_eq!(second.unmatched_edges, None);
    assert_eq!(second.vertices, first.vertices);
    assert_eq!(second.quad_count(), 18);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn cache_name_tracks_geometry_and_scale() {
    let cache = ShadowVolumeCache::new("cache");
    let cube = Mesh::cube();
    assert_ne!(cache.path_for(&cube, 1.0), cache.path_for(&cube, 2.0));
    let moved = Mesh::new(
        "cube",
        cube.positions().iter().map(|p| *p * 3.0).collect(),
        cube.faces().to_vec(),
    )
    .unwrap();
    assert_ne!(cache.path_for(&cube, 1.0), cache.path_for(&moved, 1.0));
    assert_eq!(cache.path_for(&cube, 1.0), cache.path_for(&Mesh::cube(), 1.0));
}

#[test]
fn truncated_and_negative_files_are_corrupted() {
    let dir = scratch_dir("corrupted");
    let vertices = ShadowVolumeMesh::new(&Mesh::tetrahedron(), 1.0).build().vertices;

    let truncated = dir.join("truncated.svc");
    write_cache_file(&truncated, &vertices).unwrap();
    let bytes = fs::read(&truncated).unwrap();
    fs::write(&truncated, &bytes[..bytes.len() - 7]).unwrap();
    assert!(matches!(read_cache_file(&truncated), Err(CacheError::Corrupted { .. })));

    let negative = dir.join("negative.svc");
    fs::write(&negative, (-3i32).to_ne_bytes()).unwrap();
    assert!(matches!(read_cache_file(&negative), Err(CacheError::Corrupted { .. })));

    let empty = dir.join("empty.svc");
    fs::write(&empty, [0u8; 2]).unwrap();
    assert!(matches!(read_cache_file(&empty), Err(CacheError::Corrupted { .. })));

    match read_cache_file(&dir.join("missing.svc")) {
        Err(CacheError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected NotFound, got {:?}", other.map(|v| v.len())),
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn corrupted_cache_is_rebuilt() {
    let dir = scratch_dir("rebuild");
    let cache = ShadowVolumeCache::new(dir.clone());
    let mesh = Mesh::tetrahedron();
    let path = cache.path_for(&mesh, 1.0);

    // well formed file whose count cannot belong to a tetrahedron
    write_cache_file(&path, &[ShadowVolumeVertex::new(glam::Vec3::ZERO, glam::Vec3::Y); 5]).unwrap();
    assert!(matches!(cache.load(&mesh, 1.0), Err(CacheError::Corrupted { .. })));

    let geometry = ShadowVolumeMesh::new(&mesh, 1.0).load_or_build(&cache).unwrap();
    assert_eq!(geometry.quad_count(), 6);
    assert_eq!(read_cache_file(&path).unwrap().len(), 48);
    fs::remove_dir_all(&dir).unwrap();
}

#[cfg(unix)]
#[test]
fn unwritable_cache_still_returns_the_built_volume() {
    let dir = scratch_dir("unwritable");
    let cache = ShadowVolumeCache::new(dir.clone());
    let mesh = Mesh::cube();
    let path = cache.path_for(&mesh, 1.0);

    // dangling link: reads see NotFound, writes cannot create the target
    std::os::unix::fs::symlink(dir.join("missing").join("target.svc"), &path).unwrap();
    assert!(matches!(cache.store(&mesh, 1.0, &[]), Err(CacheError::Io(_))));

    let geometry = ShadowVolumeMesh::new(&mesh, 1.0).load_or_build(&cache).unwrap();
    assert_eq!(geometry.is_watertight(), Some(true));
    assert_eq!(geometry.quad_count(), 18);
    fs::remove_dir_all(&dir).unwrap();
}
