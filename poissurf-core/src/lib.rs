//! Core data structures and traits for poissurf
//!
//! This crate provides fundamental types for oriented point cloud and mesh processing,
//! including points with normals, point clouds, triangle meshes, sample generators
//! and essential traits.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod sampling;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use sampling::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3};

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = TriangleMesh;
