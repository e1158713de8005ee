//! # poissurf reconstruction
//!
//! Surface reconstruction from oriented point clouds.
//!
//! The samples are tetrahedralized with an incremental Delaunay
//! triangulation, a Poisson problem over that triangulation turns the
//! normals into an indicator function, and Delaunay refinement meshes the
//! function's zero level set into triangles with bounded angles and sizes.
//! [`ReconstructionPipeline`] chains the stages and runs batches of inputs.

pub mod criteria;
pub mod error;
pub mod geometry;
pub mod implicit;
pub mod parallel;
pub mod pipeline;
pub mod point_set;
pub mod poisson;
pub mod report;
pub mod sparse;
pub mod surface_mesher;
pub mod triangulation;

// Re-export commonly used items
pub use criteria::{FacetCriteria, MeshingCriteria, SurfaceDomain};
pub use error::ReconstructionError;
pub use implicit::{ImplicitFunction, ImplicitFunctionSolver, SolveReport};
pub use parallel::{init_thread_pool, ParallelConfig};
pub use pipeline::{QualityMetrics, ReconstructionPipeline, ReconstructionResult};
pub use point_set::{PointSet, Sample};
pub use poisson::{PoissonConfig, PoissonImplicitFunction, PoissonSolver};
pub use report::{
    BatchReport, InputReport, InputSource, InputStatus, NullReporter, ProgressReporter, Stage, TracingReporter,
    WarningFlags,
};
pub use surface_mesher::{DelaunayRefinementExtractor, ExtractedSurface, MesherState, SurfaceExtractor, Termination};
pub use triangulation::{DelaunayTriangulation, Insertion, VertexKind, INVALID};
