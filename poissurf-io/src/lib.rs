//! I/O operations for oriented point clouds and meshes
//!
//! This crate reads and writes OFF and PLY meshes and turns them into the
//! oriented samples consumed by the reconstruction. Meshes without stored
//! normals get area-weighted vertex normals computed from their faces.

pub mod off;
pub mod ply;
pub mod error;

pub use error::*;
pub use off::{OffReader, OffWriter};
pub use ply::{PlyReader, PlyWriter};

use poissurf_core::{NormalPoint3f, NormalPointCloud3f, Result, TriangleMesh};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("off") => OffReader::read_mesh(path),
        Some("ply") => PlyReader::read_mesh(path),
        _ => Err(poissurf_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("off") => OffWriter::write_mesh(mesh, path),
        Some("ply") => PlyWriter::write_mesh(mesh, path),
        _ => Err(poissurf_core::Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Oriented samples from the vertices of a mesh.
///
/// Stored vertex normals are used when present, otherwise normals are
/// computed from the face winding. Vertices left without a usable normal
/// (isolated, or only on degenerate faces) are skipped.
pub fn oriented_points_from_mesh(mesh: &TriangleMesh) -> Result<NormalPointCloud3f> {
    if mesh.vertices.is_empty() {
        return Err(poissurf_core::Error::InvalidData("mesh has no vertices".to_string()));
    }
    let normals = match &mesh.normals {
        Some(normals) if normals.len() == mesh.vertices.len() => normals.clone(),
        _ if mesh.faces.is_empty() => {
            return Err(poissurf_core::Error::InvalidData(
                "vertices carry no normals and there are no faces to compute them from".to_string(),
            ))
        }
        _ => mesh.compute_vertex_normals(),
    };

    let cloud: NormalPointCloud3f = mesh
        .vertices
        .iter()
        .zip(normals)
        .filter(|(_, n)| n.norm_squared() > 0.0 && n.iter().all(|c| c.is_finite()))
        .map(|(p, n)| NormalPoint3f::new(*p, n))
        .collect();

    if cloud.is_empty() {
        return Err(poissurf_core::Error::InvalidData("no vertex has a usable normal".to_string()));
    }
    Ok(cloud)
}

/// Read a mesh file and turn it into oriented samples
pub fn read_oriented_points<P: AsRef<Path>>(path: P) -> Result<NormalPointCloud3f> {
    let mesh = read_mesh(path)?;
    oriented_points_from_mesh(&mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poissurf_core::{Point3f, Vector3f};
    use tempfile::tempdir;

    fn tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn test_auto_detect_functions() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mesh = tetrahedron();
        for name in ["tet.off", "tet.PLY"] {
            let path = dir.path().join(name);
            write_mesh(&mesh, &path)?;
            let loaded = read_mesh(&path)?;
            assert_eq!(loaded.vertex_count(), 4);
            assert_eq!(loaded.faces, mesh.faces);
        }
        Ok(())
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            read_mesh("mesh.stl"),
            Err(poissurf_core::Error::UnsupportedFormat(_))
        ));
        assert!(write_mesh(&tetrahedron(), "mesh.obj").is_err());
    }

    #[test]
    fn test_oriented_points_from_faces() {
        let cloud = oriented_points_from_mesh(&tetrahedron()).unwrap();
        assert_eq!(cloud.len(), 4);
        let centroid = Point3f::new(0.25, 0.25, 0.25);
        for sample in &cloud {
            // Outward normals point away from the interior
            assert!((sample.position - centroid).dot(&sample.normal) > 0.0);
        }
    }

    #[test]
    fn test_oriented_points_prefer_stored_normals() {
        let mut mesh = tetrahedron();
        mesh.set_normals(vec![Vector3f::z(); 4]);
        let cloud = oriented_points_from_mesh(&mesh).unwrap();
        assert!(cloud.iter().all(|s| s.normal == Vector3f::z()));
    }

    #[test]
    fn test_oriented_points_rejects_unusable_meshes() {
        assert!(oriented_points_from_mesh(&TriangleMesh::new()).is_err());
        let bare = TriangleMesh::from_vertices_and_faces(vec![Point3f::origin()], vec![]);
        assert!(oriented_points_from_mesh(&bare).is_err());
    }

    #[test]
    fn test_read_oriented_points_from_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.off");
        std::fs::write(&path, "").unwrap();
        assert!(read_oriented_points(&path).is_err());
    }
}
