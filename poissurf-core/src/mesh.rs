//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An undirected mesh edge, stored with the smaller index first
pub type Edge = (usize, usize);

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Calculate face normals
    ///
    /// Degenerate faces yield a zero vector instead of NaN.
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let n = self.face_area_vector(face);
                let len = n.norm();
                if len > 0.0 { n / len } else { Vector3f::zeros() }
            })
            .collect()
    }

    /// Area-weighted vertex normals following the face winding.
    ///
    /// Vertices touched by no face, or only by degenerate faces, get a zero normal.
    pub fn compute_vertex_normals(&self) -> Vec<Vector3f> {
        let mut accum = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            // The unnormalized cross product carries twice the area.
            let n = self.face_area_vector(face);
            for &v in face {
                accum[v] += n;
            }
        }
        for n in &mut accum {
            let len = n.norm();
            if len > 0.0 {
                *n /= len;
            }
        }
        accum
    }

    fn face_area_vector(&self, face: &[usize; 3]) -> Vector3f {
        let v0 = self.vertices[face[0]];
        let v1 = self.vertices[face[1]];
        let v2 = self.vertices[face[2]];
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Number of faces incident to every undirected edge
    pub fn edge_incidence(&self) -> HashMap<Edge, usize> {
        let mut counts = HashMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                let key = if a < b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Edges used by exactly one face
    pub fn boundary_edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .edge_incidence()
            .into_iter()
            .filter(|&(_, c)| c == 1)
            .map(|(e, _)| e)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Edges shared by more than two faces
    pub fn non_manifold_edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .edge_incidence()
            .into_iter()
            .filter(|&(_, c)| c > 2)
            .map(|(e, _)| e)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// True when every face references an existing vertex
    pub fn has_valid_indices(&self) -> bool {
        let n = self.vertices.len();
        self.faces.iter().all(|f| f.iter().all(|&v| v < n))
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
