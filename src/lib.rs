//! # poissurf
//!
//! Surface reconstruction from oriented point clouds.
//!
//! This is the umbrella crate that provides convenient access to all poissurf functionality.
//! You can use this crate to get everything in one place, or use individual crates for
//! more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Basic 3D data structures (points with normals, point clouds, triangle meshes)
//! - **I/O**: OFF and PLY mesh formats, oriented samples from meshes
//! - **Reconstruction**: Delaunay triangulation, Poisson implicit function, surface meshing
//!   and the batch pipeline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use poissurf::prelude::*;
//!
//! let cloud = sphere_samples(1.0, 800);
//! let pipeline = ReconstructionPipeline::new(MeshingCriteria::default()).unwrap();
//! let result = pipeline.reconstruct(&cloud).unwrap();
//! println!("{} triangles", result.mesh.face_count());
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core, io and reconstruction
//! - `io`: File format support
//! - `reconstruction`: Surface reconstruction
//! - `all`: Enables all features

// Re-export core functionality
pub use poissurf_core::*;

// Re-export sub-crates
#[cfg(feature = "io")]
pub use poissurf_io as io;

#[cfg(feature = "reconstruction")]
pub use poissurf_reconstruction as reconstruction;

/// Convenient imports for common use cases
pub mod prelude {
    pub use poissurf_core::*;

    #[cfg(feature = "io")]
    pub use poissurf_io::*;

    #[cfg(feature = "reconstruction")]
    pub use poissurf_reconstruction::*;
}
