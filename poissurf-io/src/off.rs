//! OFF format support
//!
//! Reads `OFF` and `NOFF` (per-vertex normals) ASCII files. Polygonal faces
//! are fan-triangulated, trailing face colors are ignored and `#` starts a
//! comment anywhere on a line.

use crate::error::IoError;
use crate::{MeshReader, MeshWriter};
use poissurf_core::{Point3f, Result, TriangleMesh, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Upper bound on storage reserved up front from header counts
const MAX_RESERVED_ELEMENTS: usize = 1 << 20;

pub struct OffReader;
pub struct OffWriter;

impl MeshReader for OffReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        Ok(parse_off(BufReader::new(file))?)
    }
}

impl MeshWriter for OffWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_off(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Parse an OFF stream into a triangle mesh
pub fn parse_off<R: BufRead>(reader: R) -> std::result::Result<TriangleMesh, IoError> {
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.split('#').next().unwrap_or("").trim();
        if !content.is_empty() {
            lines.push((i + 1, content.to_string()));
        }
    }
    let mut lines = lines.into_iter();

    let (header_line, header) = lines.next().ok_or_else(|| IoError::ParseError {
        line: 0,
        message: "file is empty".to_string(),
    })?;
    let mut header_tokens = header.split_whitespace();
    let with_normals = match header_tokens.next().unwrap_or_default() {
        "OFF" => false,
        "NOFF" => true,
        other => {
            return Err(IoError::InvalidFormat {
                format: format!("expected OFF or NOFF header, found '{}'", other),
            })
        }
    };

    // Counts may follow the keyword on the header line
    let inline_counts: Vec<&str> = header_tokens.collect();
    let (counts_line, counts) = if inline_counts.is_empty() {
        let (n, l) = lines.next().ok_or_else(|| IoError::ParseError {
            line: header_line,
            message: "missing element counts".to_string(),
        })?;
        (n, parse_values::<usize>(n, &l)?)
    } else {
        (header_line, parse_values::<usize>(header_line, &inline_counts.join(" "))?)
    };
    if counts.len() < 2 {
        return Err(IoError::ParseError {
            line: counts_line,
            message: "expected vertex and face counts".to_string(),
        });
    }
    let (vertex_count, face_count) = (counts[0], counts[1]);

    // Header counts are untrusted; the loops below fail on missing lines
    let reserve = |count: usize| count.min(MAX_RESERVED_ELEMENTS);
    let coords_per_vertex = if with_normals { 6 } else { 3 };
    let mut vertices = Vec::with_capacity(reserve(vertex_count));
    let mut normals = Vec::with_capacity(if with_normals { reserve(vertex_count) } else { 0 });
    for _ in 0..vertex_count {
        let (n, l) = lines.next().ok_or_else(|| IoError::ParseError {
            line: counts_line,
            message: format!("expected {} vertices", vertex_count),
        })?;
        let values = parse_values::<f32>(n, &l)?;
        if values.len() < coords_per_vertex {
            return Err(IoError::ParseError {
                line: n,
                message: format!("expected {} values per vertex, found {}", coords_per_vertex, values.len()),
            });
        }
        vertices.push(Point3f::new(values[0], values[1], values[2]));
        if with_normals {
            normals.push(Vector3f::new(values[3], values[4], values[5]));
        }
    }

    let mut faces = Vec::with_capacity(reserve(face_count));
    for _ in 0..face_count {
        let (n, l) = lines.next().ok_or_else(|| IoError::ParseError {
            line: counts_line,
            message: format!("expected {} faces", face_count),
        })?;
        let tokens: Vec<&str> = l.split_whitespace().collect();
        let arity = parse_token::<usize>(n, tokens[0])?;
        if arity < 3 || tokens.len() < arity + 1 {
            return Err(IoError::ParseError {
                line: n,
                message: format!("malformed face with {} vertices", arity),
            });
        }
        let mut polygon = Vec::with_capacity(arity);
        for token in &tokens[1..=arity] {
            let index = parse_token::<usize>(n, token)?;
            if index >= vertex_count {
                return Err(IoError::IndexOutOfRange { index, count: vertex_count });
            }
            polygon.push(index);
        }
        for k in 1..arity - 1 {
            faces.push([polygon[0], polygon[k], polygon[k + 1]]);
        }
    }

    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
    if with_normals {
        mesh.set_normals(normals);
    }
    Ok(mesh)
}

/// Write a mesh as ASCII OFF, or NOFF when it carries vertex normals
pub fn write_off<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> std::io::Result<()> {
    let normals = mesh.normals.as_ref().filter(|n| n.len() == mesh.vertices.len());
    writeln!(writer, "{}", if normals.is_some() { "NOFF" } else { "OFF" })?;
    writeln!(writer, "{} {} 0", mesh.vertex_count(), mesh.face_count())?;
    for (i, v) in mesh.vertices.iter().enumerate() {
        match normals {
            Some(normals) => {
                let n = normals[i];
                writeln!(writer, "{} {} {} {} {} {}", v.x, v.y, v.z, n.x, n.y, n.z)?
            }
            None => writeln!(writer, "{} {} {}", v.x, v.y, v.z)?,
        }
    }
    for face in &mesh.faces {
        writeln!(writer, "3 {} {} {}", face[0], face[1], face[2])?;
    }
    Ok(())
}

fn parse_token<T: FromStr>(line: usize, token: &str) -> std::result::Result<T, IoError> {
    token.parse::<T>().map_err(|_| IoError::ParseError {
        line,
        message: format!("invalid number '{}'", token),
    })
}

fn parse_values<T: FromStr>(line: usize, text: &str) -> std::result::Result<Vec<T>, IoError> {
    text.split_whitespace().map(|t| parse_token(line, t)).collect()
}
