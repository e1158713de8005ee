//! PLY format support

use crate::error::IoError;
use crate::{MeshReader, MeshWriter};
use poissurf_core::{Point3f, Result, TriangleMesh, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct PlyReader;
pub struct PlyWriter;

impl MeshReader for PlyReader {
    /// Reads the `vertex` and optional `face` elements.
    ///
    /// A vertex-only file yields a mesh without faces, which is how oriented
    /// point clouds are usually stored. Normals are kept when every vertex
    /// carries `nx`, `ny` and `nz`.
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let empty = Vec::new();
        let vertex_elements = ply.payload.get("vertex").unwrap_or(&empty);

        let mut vertices = Vec::with_capacity(vertex_elements.len());
        let mut normals = Vec::with_capacity(vertex_elements.len());
        let mut has_normals = !vertex_elements.is_empty();
        for vertex in vertex_elements {
            vertices.push(Point3f::new(
                extract_property_value(vertex, "x")?,
                extract_property_value(vertex, "y")?,
                extract_property_value(vertex, "z")?,
            ));
            if has_normals {
                match (
                    extract_property_value(vertex, "nx"),
                    extract_property_value(vertex, "ny"),
                    extract_property_value(vertex, "nz"),
                ) {
                    (Ok(nx), Ok(ny), Ok(nz)) => normals.push(Vector3f::new(nx, ny, nz)),
                    _ => has_normals = false,
                }
            }
        }

        let mut faces = Vec::new();
        if let Some(face_elements) = ply.payload.get("face") {
            for face in face_elements {
                let indices = extract_face_indices(face)?;
                if let Some(&index) = indices.iter().find(|&&i| i >= vertices.len()) {
                    return Err(IoError::IndexOutOfRange { index, count: vertices.len() }.into());
                }
                for k in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if has_normals {
            mesh.set_normals(normals);
        }
        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let normals = mesh.normals.as_ref().filter(|n| n.len() == mesh.vertices.len());
        let mut ply = Ply::<DefaultElement>::new();

        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        let mut names = vec!["x", "y", "z"];
        if normals.is_some() {
            names.extend(["nx", "ny", "nz"]);
        }
        for name in &names {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        ply.header.elements.add(vertex_element);

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::UInt),
        ));
        ply.header.elements.add(face_element);

        let vertices = mesh
            .vertices
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut element = DefaultElement::new();
                element.insert("x".to_string(), Property::Float(v.x));
                element.insert("y".to_string(), Property::Float(v.y));
                element.insert("z".to_string(), Property::Float(v.z));
                if let Some(normals) = normals {
                    element.insert("nx".to_string(), Property::Float(normals[i].x));
                    element.insert("ny".to_string(), Property::Float(normals[i].y));
                    element.insert("nz".to_string(), Property::Float(normals[i].z));
                }
                element
            })
            .collect();
        ply.payload.insert("vertex".to_string(), vertices);

        let faces = mesh
            .faces
            .iter()
            .map(|face| {
                let mut element = DefaultElement::new();
                let indices = face.iter().map(|&i| i as u32).collect();
                element.insert("vertex_indices".to_string(), Property::ListUInt(indices));
                element
            })
            .collect();
        ply.payload.insert("face".to_string(), faces);

        Writer::new().write_ply(&mut writer, &mut ply)?;
        writer.flush()?;
        Ok(())
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        _ => Err(poissurf_core::Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => indices
            .iter()
            .map(|&idx| {
                usize::try_from(idx).map_err(|_| {
                    poissurf_core::Error::InvalidData(format!("negative face index {}", idx))
                })
            })
            .collect(),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(poissurf_core::Error::InvalidData("Face indices not found".to_string())),
    }
}
