use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::{ShadowVolumeGeometry, ShadowVolumeVertex};
use crate::engine::mesh::Mesh;

const RECORD_SIZE: usize = std::mem::size_of::<ShadowVolumeVertex>();

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Corrupted { path: PathBuf, reason: String },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "shadow volume cache I/O error: {}", e),
            CacheError::Corrupted { path, reason } => {
                write!(f, "shadow volume cache {} is corrupted: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(e) => Some(e),
            CacheError::Corrupted { .. } => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e)
    }
}

/// Directory of cached shadow volumes.
///
/// Each file is an `i32` element count followed by that many
/// `{position: f32x3, normal: f32x3}` records, native endian, no header. The
/// file name carries a hash of the mesh geometry and scale, so an edited mesh
/// never picks up a stale volume.
#[derive(Debug, Clone)]
pub struct ShadowVolumeCache {
    dir: PathBuf,
}

impl ShadowVolumeCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, mesh: &Mesh, scale: f32) -> PathBuf {
        let key = mesh.content_hash() ^ (u64::from(scale.to_bits())).rotate_left(32);
        let name: String = mesh
            .name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}-{:016x}.svc", name, key))
    }

    /// Loads the volume of `mesh`, checking the record count against the
    /// mesh: three base vertices per face plus six per edge quad.
    pub fn load(&self, mesh: &Mesh, scale: f32) -> Result<ShadowVolumeGeometry, CacheError> {
        let path = self.path_for(mesh, scale);
        let vertices = read_cache_file(&path)?;
        let base_vertex_count = mesh.face_count() * 3;
        if vertices.len() < base_vertex_count || (vertices.len() - base_vertex_count) % 6 != 0 {
            return Err(CacheError::Corrupted {
                path,
                reason: format!(
                    "{} records do not fit a mesh of {} faces",
                    vertices.len(),
                    mesh.face_count()
                ),
            });
        }
        Ok(ShadowVolumeGeometry {
            vertices,
            base_vertex_count,
            unmatched_edges: None,
        })
    }

    pub fn store(&self, mesh: &Mesh, scale: f32, vertices: &[ShadowVolumeVertex]) -> Result<PathBuf, CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(mesh, scale);
        write_cache_file(&path, vertices)?;
        log::info!("cached shadow volume for '{}' at {}", mesh.name(), path.display());
        Ok(path)
    }
}

pub fn write_cache_file(path: &Path, vertices: &[ShadowVolumeVertex]) -> Result<(), CacheError> {
    let count = i32::try_from(vertices.len()).map_err(|_| CacheError::Corrupted {
        path: path.to_path_buf(),
        reason: format!("{} records exceed the i32 element count", vertices.len()),
    })?;
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&count.to_ne_bytes())?;
    out.write_all(bytemuck::cast_slice(vertices))?;
    out.flush()?;
    Ok(())
}

pub fn read_cache_file(path: &Path) -> Result<Vec<ShadowVolumeVertex>, CacheError> {
    let corrupted = |reason: String| CacheError::Corrupted {
        path: path.to_path_buf(),
        reason,
    };

    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    let count_bytes: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| corrupted("missing element count".to_string()))?;
    let records = &bytes[4..];
    let count = i32::from_ne_bytes(count_bytes);
    let count = usize::try_from(count).map_err(|_| corrupted(format!("negative element count {}", count)))?;

    let expected = count * RECORD_SIZE;
    if records.len() != expected {
        return Err(corrupted(format!(
            "expected {} bytes of records, found {}",
            expected,
            records.len()
        )));
    }

    // the byte buffer has no alignment guarantee, so copy record by record
    Ok(records
        .chunks_exact(RECORD_SIZE)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}
